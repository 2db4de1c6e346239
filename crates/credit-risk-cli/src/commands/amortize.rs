use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use credit_risk_core::api::{self, AmortizationInput, ScheduleInput};

use crate::input;

/// Arguments for repayment amortization
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON input file with `repayments` and `dim_loans`
    #[arg(long)]
    pub input: Option<String>,

    /// Principal of a single loan (used with --rate and --payments)
    #[arg(long, allow_hyphen_values = true)]
    pub loan_amount: Option<Decimal>,

    /// Annual interest rate in percent (12 = 12%)
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,

    /// Payments in chronological order (comma-separated, e.g. "100,100,100")
    #[arg(long, value_delimiter = ',')]
    pub payments: Option<Vec<Decimal>>,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        let batch: AmortizationInput = input::file::read_json(path)?;
        return Ok(serde_json::to_value(api::amortize(&batch)?)?);
    }
    if let Some(batch) = input::stdin::read_stdin::<AmortizationInput>()? {
        return Ok(serde_json::to_value(api::amortize(&batch)?)?);
    }

    let schedule = ScheduleInput {
        loan_amount: args.loan_amount,
        interest_rate: args.rate,
        payments: args
            .payments
            .ok_or("--payments is required (or provide --input)")?,
    };
    Ok(serde_json::to_value(api::amortize_schedule(&schedule)?)?)
}
