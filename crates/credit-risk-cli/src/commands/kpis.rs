use clap::{Args, ValueEnum};
use serde_json::Value;

use credit_risk_core::api::{self, KpiInput};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KpiTable {
    All,
    Portfolio,
    Regional,
    Customer,
}

/// Arguments for KPI calculation
#[derive(Args)]
pub struct KpisArgs {
    /// Path to JSON input file with `facts`, `dim_customers`, `dim_loans`, `as_of`
    #[arg(long)]
    pub input: Option<String>,

    /// Which KPI table to compute
    #[arg(long, value_enum, default_value = "all")]
    pub table: KpiTable,
}

pub fn run_kpis(args: KpisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let kpi_input: KpiInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(request) = input::stdin::read_stdin()? {
        request
    } else {
        return Err("--input is required (or pipe JSON on stdin)".into());
    };

    let value = match args.table {
        KpiTable::All => serde_json::to_value(api::all_kpis(&kpi_input)?)?,
        KpiTable::Portfolio => serde_json::to_value(api::portfolio_kpis(&kpi_input)?)?,
        KpiTable::Regional => serde_json::to_value(api::regional_delinquency_kpis(&kpi_input)?)?,
        KpiTable::Customer => serde_json::to_value(api::customer_drilldown_kpis(&kpi_input)?)?,
    };
    Ok(value)
}
