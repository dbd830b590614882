use anyhow::{Context, Result};
use colored::Colorize;
use seekpage::{PageRequest, PageResult};
use serde_json::Value;

use super::{StrategyArg, WalkArgs};

pub async fn execute(args: WalkArgs) -> Result<()> {
    let session = args.dataset.open()?;
    let limit = args.dataset.limit;
    let count = args.dataset.count;

    let build = |request: PageRequest| {
        let mut request = request.with_filters(session.filters.clone());
        if let Some(limit) = limit {
            request = request.with_limit(limit);
        }
        if count {
            request = request.with_count();
        }
        request
    };

    println!(
        "{} {} ({})",
        "Walking".bold(),
        args.dataset.data.display(),
        session.sort
    );
    println!();

    let mut request = build(match args.strategy {
        StrategyArg::Keyset => PageRequest::keyset(session.sort.clone()),
        StrategyArg::Offset => PageRequest::offset(session.sort.clone(), 1),
    });
    let mut number = 1_u64;
    let mut rows = 0_usize;

    loop {
        let page = session.pager.paginate(request).await?;
        rows += page.len();
        print_page(number, &page, args.verbose)?;

        let next = match args.strategy {
            StrategyArg::Keyset => page
                .next_cursor()
                .map(|cursor| PageRequest::after(session.sort.clone(), cursor.as_str())),
            StrategyArg::Offset => page
                .next_page()
                .and_then(|next| i64::try_from(next).ok())
                .map(|next| PageRequest::offset(session.sort.clone(), next)),
        };

        match next {
            Some(next) => request = build(next),
            None => break,
        }
        number += 1;
    }

    println!();
    let summary = format!("Done: {} rows in {} pages", rows, number);
    println!("{}", summary.green().bold());
    Ok(())
}

fn print_page(number: u64, page: &PageResult<Value>, verbose: bool) -> Result<()> {
    let total = page
        .total_count
        .map(|total| {
            let marker = if total.exact { "" } else { "~" };
            format!(" of {}{}", marker, total.value)
        })
        .unwrap_or_default();

    let heading = format!("Page {}:", number);
    println!(
        "{} {} rows{}{}",
        heading.cyan().bold(),
        page.len(),
        total,
        if page.has_more { "" } else { " (last)" }
    );

    if verbose {
        for item in &page.items {
            let line = serde_json::to_string(item).context("Failed to serialize row")?;
            println!("  {}", line);
        }
    }

    if let Some(cursor) = page.next_cursor() {
        println!("  {} {}", "next cursor:".dimmed(), cursor);
    }
    Ok(())
}
