//! Request/response entry points for callers outside the batch pipeline
//! (CLI, Node bindings). Each takes a serde input struct and returns the
//! standard [`ComputationOutput`] envelope.

use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::{amortize_loan, calculate_amortization, AmortizationSplit, AmortizedRepayment};
use crate::dimensions::{DimCustomer, DimLoan, LoanTerms};
use crate::error::CreditRiskError;
use crate::facts::{build_fact_loan_performance, FactLoanPerformance};
use crate::kpi::{
    calculate_all_kpis, calculate_customer_drilldown_kpis, calculate_portfolio_kpis,
    calculate_regional_delinquency_kpis, CustomerDrilldownKpi, KpiSnapshot, PortfolioKpis,
    RegionalDelinquencyKpi,
};
use crate::records::RepaymentEvent;
use crate::silver::normalize_repayments;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::CreditRiskResult;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationInput {
    pub repayments: Vec<RepaymentEvent>,
    #[serde(default)]
    pub dim_loans: Vec<DimLoan>,
}

/// A single loan's payments in chronological order. Without both an amount
/// and a rate every payment is treated as principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    #[serde(default)]
    pub loan_amount: Option<Money>,
    /// Annual rate in percent.
    #[serde(default)]
    pub interest_rate: Option<Rate>,
    pub payments: Vec<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactInput {
    pub repayments: Vec<RepaymentEvent>,
    #[serde(default)]
    pub dim_loans: Vec<DimLoan>,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiInput {
    pub facts: Vec<FactLoanPerformance>,
    #[serde(default)]
    pub dim_customers: Vec<DimCustomer>,
    #[serde(default)]
    pub dim_loans: Vec<DimLoan>,
    pub as_of: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_loan_terms(dim_loans: &[DimLoan]) -> CreditRiskResult<()> {
    for loan in dim_loans {
        if loan.loan_amount.is_some_and(|a| a < Decimal::ZERO) {
            return Err(CreditRiskError::InvalidInput {
                field: "loan_amount".into(),
                reason: format!("loan {} has a negative principal", loan.loan_id),
            });
        }
        if loan.interest_rate.is_some_and(|r| r < Decimal::ZERO) {
            return Err(CreditRiskError::InvalidInput {
                field: "interest_rate".into(),
                reason: format!("loan {} has a negative rate", loan.loan_id),
            });
        }
    }
    Ok(())
}

fn schedule_terms(input: &ScheduleInput) -> CreditRiskResult<Option<LoanTerms>> {
    match (input.loan_amount, input.interest_rate) {
        (Some(a), _) if a < Decimal::ZERO => Err(CreditRiskError::InvalidInput {
            field: "loan_amount".into(),
            reason: "loan amount cannot be negative".into(),
        }),
        (_, Some(r)) if r < Decimal::ZERO => Err(CreditRiskError::InvalidInput {
            field: "interest_rate".into(),
            reason: "interest rate cannot be negative".into(),
        }),
        (Some(loan_amount), Some(interest_rate)) => Ok(Some(LoanTerms {
            loan_amount,
            interest_rate,
        })),
        (None, None) => Ok(None),
        _ => Err(CreditRiskError::InvalidInput {
            field: "loan_amount".into(),
            reason: "loan amount and interest rate must be given together".into(),
        }),
    }
}

fn validate_repayments(repayments: &[RepaymentEvent]) -> CreditRiskResult<()> {
    if let Some(r) = repayments.iter().find(|r| r.repayment_id.trim().is_empty()) {
        return Err(CreditRiskError::InvalidInput {
            field: "repayment_id".into(),
            reason: format!("empty repayment_id on loan {}", r.loan_id),
        });
    }
    Ok(())
}

fn kpi_assumptions(as_of: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "as_of": as_of.to_rfc3339(),
        "active_loans": "DimLoan.approval_status == APPROVED",
        "loss_given_default": crate::kpi::LOSS_GIVEN_DEFAULT.to_string(),
        "npl_days_past_due": crate::kpi::NPL_DAYS_PAST_DUE,
    })
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Amortize a batch of repayments against their loan terms.
pub fn amortize(
    input: &AmortizationInput,
) -> CreditRiskResult<ComputationOutput<Vec<AmortizedRepayment>>> {
    let start = Instant::now();
    validate_repayments(&input.repayments)?;
    validate_loan_terms(&input.dim_loans)?;

    let repayments = normalize_repayments(input.repayments.clone());
    let rows = calculate_amortization(&repayments, &input.dim_loans);

    let mut warnings = Vec::new();
    let missing_terms = input.dim_loans.iter().filter(|l| l.terms().is_none()).count();
    if missing_terms > 0 {
        warnings.push(format!(
            "{missing_terms} loan(s) lack an amount or rate; payments treated as principal"
        ));
    }

    let assumptions = serde_json::json!({
        "monthly_rate": "annual_rate / 100 / 12",
        "interest_paid": "min(amount_paid, balance * monthly_rate)",
        "ordering": "loan_id, payment_date (missing last), repayment_id",
    });
    Ok(with_metadata(
        "Declining-balance amortization (interest first, remainder to principal)",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        rows,
    ))
}

/// Amortization schedule of one loan.
pub fn amortize_schedule(
    input: &ScheduleInput,
) -> CreditRiskResult<ComputationOutput<Vec<AmortizationSplit>>> {
    let start = Instant::now();
    let terms = schedule_terms(input)?;
    let schedule = amortize_loan(terms, &input.payments);

    let assumptions = serde_json::json!({
        "loan_amount": input.loan_amount,
        "annual_rate_pct": input.interest_rate,
        "monthly_rate": "annual_rate / 100 / 12",
    });
    Ok(with_metadata(
        "Declining-balance amortization of a single loan",
        &assumptions,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        schedule,
    ))
}

/// Build fact rows from repayments and the loan dimension.
pub fn fact_loan_performance(
    input: &FactInput,
) -> CreditRiskResult<ComputationOutput<Vec<FactLoanPerformance>>> {
    let start = Instant::now();
    validate_repayments(&input.repayments)?;
    validate_loan_terms(&input.dim_loans)?;

    let repayments = normalize_repayments(input.repayments.clone());
    let facts = build_fact_loan_performance(&repayments, &input.dim_loans, input.as_of);

    let assumptions = serde_json::json!({
        "as_of": input.as_of.to_rfc3339(),
        "is_defaulted": "status == MISSED",
    });
    Ok(with_metadata(
        "Loan performance facts with amortization split",
        &assumptions,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        facts,
    ))
}

pub fn portfolio_kpis(input: &KpiInput) -> CreditRiskResult<ComputationOutput<PortfolioKpis>> {
    let start = Instant::now();
    let kpis = calculate_portfolio_kpis(
        &input.facts,
        &input.dim_customers,
        &input.dim_loans,
        input.as_of,
    );
    Ok(with_metadata(
        "Portfolio KPIs over active loans",
        &kpi_assumptions(input.as_of),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        kpis,
    ))
}

pub fn regional_delinquency_kpis(
    input: &KpiInput,
) -> CreditRiskResult<ComputationOutput<Vec<RegionalDelinquencyKpi>>> {
    let start = Instant::now();
    let kpis = calculate_regional_delinquency_kpis(
        &input.facts,
        &input.dim_customers,
        &input.dim_loans,
        input.as_of,
    );
    Ok(with_metadata(
        "Regional delinquency KPIs over latest repayment per active loan",
        &kpi_assumptions(input.as_of),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        kpis,
    ))
}

pub fn customer_drilldown_kpis(
    input: &KpiInput,
) -> CreditRiskResult<ComputationOutput<Vec<CustomerDrilldownKpi>>> {
    let start = Instant::now();
    let kpis = calculate_customer_drilldown_kpis(
        &input.facts,
        &input.dim_customers,
        &input.dim_loans,
        input.as_of,
    );
    Ok(with_metadata(
        "Customer drilldown KPIs over active loans",
        &kpi_assumptions(input.as_of),
        Vec::new(),
        start.elapsed().as_micros() as u64,
        kpis,
    ))
}

/// All three KPI tables in one envelope.
pub fn all_kpis(input: &KpiInput) -> CreditRiskResult<ComputationOutput<KpiSnapshot>> {
    let start = Instant::now();
    let snapshot = calculate_all_kpis(
        &input.facts,
        &input.dim_customers,
        &input.dim_loans,
        input.as_of,
    );

    let mut warnings = Vec::new();
    if snapshot.portfolio.total_active_loans == 0 {
        warnings.push("No active loans; portfolio ratios reported as zero".to_string());
    }

    Ok(with_metadata(
        "Portfolio, regional delinquency and customer drilldown KPIs",
        &kpi_assumptions(input.as_of),
        warnings,
        start.elapsed().as_micros() as u64,
        snapshot,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::fixtures;
    use crate::records::{ApprovalStatus, RepaymentStatus};
    use rust_decimal_macros::dec;

    fn kpi_input() -> KpiInput {
        KpiInput {
            facts: vec![
                fixtures::fact("R1", "L1", "C1", (2024, 1, 1), Some(0), dec!(100), RepaymentStatus::Paid),
                fixtures::fact("R2", "L2", "C2", (2024, 1, 1), None, dec!(0), RepaymentStatus::Missed),
            ],
            dim_customers: vec![
                fixtures::customer("C1", Some("1 A St, Springfield, IL 62701"), Some(700)),
                fixtures::customer("C2", Some("2 B St, Austin, TX 73301"), Some(600)),
            ],
            dim_loans: vec![
                fixtures::loan("L1", "C1", dec!(1000), dec!(12), ApprovalStatus::Approved),
                fixtures::loan("L2", "C2", dec!(1000), dec!(12), ApprovalStatus::Approved),
            ],
            as_of: fixtures::now(),
        }
    }

    fn repayment(id: &str, loan: &str, amount: Decimal) -> RepaymentEvent {
        RepaymentEvent {
            repayment_id: id.into(),
            loan_id: loan.into(),
            customer_id: "C1".into(),
            due_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1),
            payment_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 5),
            amount_paid: amount,
            status: RepaymentStatus::Paid,
            days_past_due: None,
            delinquency_bucket: None,
            source_file: None,
        }
    }

    #[test]
    fn test_amortize_envelope() {
        let mut no_rate = fixtures::loan("L2", "C1", dec!(500), dec!(12), ApprovalStatus::Approved);
        no_rate.interest_rate = None;
        let input = AmortizationInput {
            repayments: vec![repayment("R1", "L1", dec!(100)), repayment("R2", "L2", dec!(40))],
            dim_loans: vec![
                fixtures::loan("L1", "C1", dec!(1200), dec!(12), ApprovalStatus::Approved),
                no_rate,
            ],
        };
        let output = amortize(&input).unwrap();
        assert_eq!(output.result.len(), 2);
        assert_eq!(output.result[0].split.interest_paid, dec!(12));
        assert_eq!(output.result[0].repayment.days_past_due, Some(4));
        assert_eq!(output.result[1].split.principal_paid, dec!(40));
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_blank_repayment_id_rejected() {
        let input = FactInput {
            repayments: vec![repayment(" ", "L1", dec!(10))],
            dim_loans: Vec::new(),
            as_of: fixtures::now(),
        };
        assert!(matches!(
            fact_loan_performance(&input),
            Err(CreditRiskError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_negative_loan_amount_rejected() {
        let mut loan = fixtures::loan("L1", "C1", dec!(1000), dec!(12), ApprovalStatus::Approved);
        loan.loan_amount = Some(dec!(-1));
        let input = AmortizationInput {
            repayments: Vec::new(),
            dim_loans: vec![loan],
        };
        match amortize(&input).unwrap_err() {
            CreditRiskError::InvalidInput { field, .. } => assert_eq!(field, "loan_amount"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_all_kpis_matches_individual_calls() {
        let input = kpi_input();
        let all = all_kpis(&input).unwrap().result;
        assert_eq!(all.portfolio, portfolio_kpis(&input).unwrap().result);
        assert_eq!(
            all.regional_delinquency,
            regional_delinquency_kpis(&input).unwrap().result
        );
        assert_eq!(
            all.customer_drilldown,
            customer_drilldown_kpis(&input).unwrap().result
        );
        assert_eq!(all.portfolio.total_defaulted_loans, 1);
    }

    #[test]
    fn test_no_active_loans_warns() {
        let mut input = kpi_input();
        input.dim_loans.clear();
        let output = all_kpis(&input).unwrap();
        assert_eq!(output.result.portfolio.default_rate_pct, Decimal::ZERO);
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_schedule_rejects_negative_terms() {
        let negative_rate = ScheduleInput {
            loan_amount: Some(dec!(1200)),
            interest_rate: Some(dec!(-12)),
            payments: vec![dec!(100)],
        };
        match amortize_schedule(&negative_rate).unwrap_err() {
            CreditRiskError::InvalidInput { field, .. } => assert_eq!(field, "interest_rate"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }

        let negative_amount = ScheduleInput {
            loan_amount: Some(dec!(-1)),
            interest_rate: Some(dec!(12)),
            payments: vec![dec!(100)],
        };
        assert!(matches!(
            amortize_schedule(&negative_amount),
            Err(CreditRiskError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_schedule_requires_amount_and_rate_together() {
        let input = ScheduleInput {
            loan_amount: Some(dec!(1200)),
            interest_rate: None,
            payments: vec![dec!(100)],
        };
        assert!(amortize_schedule(&input).is_err());
    }

    #[test]
    fn test_schedule_splits_payments() {
        let input = ScheduleInput {
            loan_amount: Some(dec!(1200)),
            interest_rate: Some(dec!(12)),
            payments: vec![dec!(100), dec!(100)],
        };
        let output = amortize_schedule(&input).unwrap();
        assert_eq!(output.result[0].interest_paid, dec!(12));
        assert_eq!(output.result[1].outstanding_balance, dec!(1023.12));

        let principal_only = ScheduleInput {
            loan_amount: None,
            interest_rate: None,
            payments: vec![dec!(40)],
        };
        let output = amortize_schedule(&principal_only).unwrap();
        assert_eq!(output.result[0].principal_paid, dec!(40));
    }
}
