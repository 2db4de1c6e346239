use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use serde_json::Value;

use credit_risk_core::config::PipelineConfig;
use credit_risk_core::pipeline::run_gold_build;
use credit_risk_core::storage::LocalTableStore;

/// Arguments for the silver -> gold build
#[derive(Args)]
pub struct BuildArgs {
    /// Table store root directory (holds silver/ and gold/)
    #[arg(long)]
    pub root: String,

    /// Pipeline configuration file (YAML or JSON)
    #[arg(long)]
    pub config: Option<String>,

    /// Build date, YYYY-MM-DD (defaults to now, UTC)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

fn build_timestamp(as_of: Option<NaiveDate>) -> DateTime<Utc> {
    as_of
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

pub fn run_build(args: BuildArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = match args.config {
        Some(ref path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut store = LocalTableStore::new(&args.root);
    let now = build_timestamp(args.as_of);
    tracing::info!(root = %store.root().display(), as_of = %now, "starting gold build");

    let output = run_gold_build(&config, &mut store, now)?;
    Ok(serde_json::to_value(output)?)
}
