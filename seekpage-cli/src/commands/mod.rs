use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use seekpage::{CountMode, MemorySource, Pager, PagerConfig, SortSpec};
use serde_json::Value;

use crate::utils;

pub mod page;
pub mod walk;

/// Options shared by every command
#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// JSON file holding an array of objects
    #[arg(value_name = "DATA_FILE")]
    pub data: PathBuf,

    /// Sort fields, e.g. "created_at:desc,name"
    #[arg(long, short, default_value = "")]
    pub sort: String,

    /// Unique key appended as the final tiebreaker
    #[arg(long, default_value = "id")]
    pub key: String,

    /// Page size (defaults to the configured default_limit)
    #[arg(long, short)]
    pub limit: Option<i64>,

    /// Filter such as "status=active" or "age>=18" (repeatable)
    #[arg(long = "filter", short = 'f', value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Include a total count
    #[arg(long)]
    pub count: bool,

    /// Configuration file (defaults to the standard search path)
    #[arg(long, value_name = "PATH", env = "SEEKPAGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    #[default]
    Keyset,
    Offset,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Page number (offset pagination)
    #[arg(long, conflicts_with = "cursor")]
    pub page: Option<i64>,

    /// Continuation cursor from a previous page (keyset pagination)
    #[arg(long)]
    pub cursor: Option<String>,

    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Args, Debug)]
pub struct WalkArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Pagination strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Keyset)]
    pub strategy: StrategyArg,

    /// Print the rows of every page, not just a summary
    #[arg(long, short)]
    pub verbose: bool,
}

/// A pager over the dataset plus the request pieces derived from the arguments
pub struct Session {
    pub pager: Pager<MemorySource<Value>, Value>,
    pub sort: SortSpec,
    pub filters: Vec<seekpage::FilterCondition>,
}

impl DatasetArgs {
    pub fn open(&self) -> Result<Session> {
        let mut config = match &self.config {
            Some(path) => PagerConfig::load_from(path),
            None => PagerConfig::load_for_service("seekpage"),
        }
        .context("Failed to load configuration")?;

        // A one-shot command has no time to wait for a refresher.
        if self.count && config.count_mode != CountMode::Exact {
            config.count_mode = CountMode::Exact;
        }

        let rows = utils::load_dataset(&self.data)?;
        let sort = SortSpec::parse(&self.sort, self.key.as_str())
            .with_context(|| format!("Invalid sort '{}'", self.sort))?;
        let filters = self
            .filters
            .iter()
            .map(|expr| utils::parse_filter(expr))
            .collect::<Result<Vec<_>>>()?;

        let pager = Pager::new(Arc::new(MemorySource::new(rows)), config)
            .context("Failed to build pager")?;

        Ok(Session {
            pager,
            sort,
            filters,
        })
    }
}
