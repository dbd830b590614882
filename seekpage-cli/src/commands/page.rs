use anyhow::{Context, Result};
use seekpage::PageRequest;

use super::PageArgs;

pub async fn execute(args: PageArgs) -> Result<()> {
    let session = args.dataset.open()?;

    let mut request = match (args.page, args.cursor) {
        (Some(page), _) => PageRequest::offset(session.sort, page),
        (None, Some(cursor)) => PageRequest::after(session.sort, cursor),
        (None, None) => PageRequest::keyset(session.sort),
    }
    .with_filters(session.filters);

    if let Some(limit) = args.dataset.limit {
        request = request.with_limit(limit);
    }
    if args.dataset.count {
        request = request.with_count();
    }

    let result = session.pager.paginate(request).await?;

    let output = if args.compact {
        serde_json::to_string(&result)
    } else {
        serde_json::to_string_pretty(&result)
    }
    .context("Failed to serialize page")?;

    println!("{}", output);
    Ok(())
}
