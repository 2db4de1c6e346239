use clap::Args;
use serde_json::Value;

use credit_risk_core::kpi::region_from_address;

/// Arguments for region derivation
#[derive(Args)]
pub struct RegionArgs {
    /// Postal address, e.g. "12 Elm St, Springfield, IL 62701"
    #[arg(long)]
    pub address: String,
}

pub fn run_region(args: RegionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let region = region_from_address(Some(&args.address));
    Ok(serde_json::json!({
        "address": args.address,
        "region": region,
    }))
}
