//! Portfolio-level KPIs: one row per run.
//!
//! Loan-level aggregates are built first (total paid, last status, first due
//! date, max days past due) and the portfolio ratios derived from the active
//! subset:
//!
//! - default rate = loans whose last status is MISSED / active loans
//! - portfolio yield = accrued interest / outstanding balance
//! - early delinquency = loans whose latest repayment is 1-90 days late /
//!   active loans
//! - EAD = outstanding balance of defaulted loans
//! - NPL ratio = balance of loans more than 90 days late / outstanding
//! - expected loss = EAD x PD x LGD

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    customer_risk_score, group_by_loan, is_early_delinquent, is_non_performing, join_facts,
    latest_per_loan, loan_outstanding, mean, transaction_score, JoinedFact, LOSS_GIVEN_DEFAULT,
};
use crate::dimensions::{DimCustomer, DimLoan};
use crate::facts::FactLoanPerformance;
use crate::records::RepaymentStatus;
use crate::types::{pct_or_zero, Money, Rate, Score};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioKpis {
    pub calculation_date: NaiveDate,
    pub default_rate_pct: Rate,
    pub portfolio_yield_pct: Rate,
    pub early_delinquency_ratio_pct: Rate,
    pub exposure_at_default: Money,
    pub customer_risk_score: Score,
    pub npl_ratio_pct: Rate,
    pub expected_loss: Money,
    pub total_active_loans: u64,
    pub total_defaulted_loans: u64,
    pub total_outstanding_balance: Money,
    pub total_interest_earned: Money,
    pub avg_repayment_history_score: Score,
    pub processing_timestamp: DateTime<Utc>,
}

/// Per-loan aggregate over the fact rows of one loan.
#[derive(Debug, Clone)]
struct LoanSummary<'a> {
    customer_id: &'a str,
    last_status: RepaymentStatus,
    max_days_past_due: Option<i64>,
    outstanding_balance: Option<Money>,
    interest_earned: Option<Money>,
}

/// Whole months from `start` to `now`, floored at zero.
pub fn elapsed_months(start: NaiveDate, now: NaiveDate) -> i64 {
    let months = (now.year() as i64 - start.year() as i64) * 12
        + (now.month() as i64 - start.month() as i64);
    months.max(0)
}

/// Simple interest accrued since the first due date:
/// `loan_amount * rate/100 * elapsed_months/12`.
pub fn interest_earned(loan_amount: Money, annual_rate_pct: Rate, elapsed_months: i64) -> Money {
    loan_amount * (annual_rate_pct / Decimal::ONE_HUNDRED) * Decimal::from(elapsed_months)
        / Decimal::from(12)
}

fn summarize_loan<'a>(rows: &[JoinedFact<'a>], today: NaiveDate) -> LoanSummary<'a> {
    let first = rows[0];
    let last = rows[rows.len() - 1];
    let first_due = rows.iter().filter_map(|r| r.fact.due_date).min();
    let months = first_due.map_or(0, |d| elapsed_months(d, today));

    let interest = first
        .loan
        .and_then(|l| Some(interest_earned(l.loan_amount?, l.interest_rate?, months)));

    LoanSummary {
        customer_id: first.fact.customer_id.as_str(),
        last_status: last.fact.status,
        max_days_past_due: rows.iter().filter_map(|r| r.fact.days_past_due).max(),
        outstanding_balance: loan_outstanding(rows),
        interest_earned: interest,
    }
}

/// Compute the portfolio KPI row as of `now`.
pub fn calculate_portfolio_kpis(
    facts: &[FactLoanPerformance],
    dim_customer: &[DimCustomer],
    dim_loan: &[DimLoan],
    now: DateTime<Utc>,
) -> PortfolioKpis {
    let today = now.date_naive();
    let joined = join_facts(facts, dim_customer, dim_loan);

    let active: Vec<LoanSummary<'_>> = group_by_loan(&joined)
        .values()
        .filter(|rows| rows[0].is_active())
        .map(|rows| summarize_loan(rows, today))
        .collect();
    let total_active_loans = active.len() as u64;
    let active_count = Decimal::from(total_active_loans);

    // Default rate
    let defaulted: Vec<&LoanSummary<'_>> = active
        .iter()
        .filter(|l| l.last_status == RepaymentStatus::Missed)
        .collect();
    let total_defaulted_loans = defaulted.len() as u64;
    let default_rate_pct = pct_or_zero(Decimal::from(total_defaulted_loans), active_count);

    // Portfolio yield
    let total_interest_earned: Money = active.iter().filter_map(|l| l.interest_earned).sum();
    let total_outstanding_balance: Money =
        active.iter().filter_map(|l| l.outstanding_balance).sum();
    let portfolio_yield_pct = pct_or_zero(total_interest_earned, total_outstanding_balance);

    // Early delinquency: latest repayment of each loan in the fact table
    let early_delinquent = latest_per_loan(&joined)
        .values()
        .filter(|r| is_early_delinquent(r.fact.days_past_due))
        .count();
    let early_delinquency_ratio_pct = pct_or_zero(Decimal::from(early_delinquent as u64), active_count);

    // Exposure at default
    let exposure_at_default: Money = defaulted.iter().filter_map(|l| l.outstanding_balance).sum();

    // Customer risk score
    let customer_risk = portfolio_customer_risk(&joined, &active);

    // NPL ratio
    let npl_balance: Money = active
        .iter()
        .filter(|l| is_non_performing(l.max_days_past_due))
        .filter_map(|l| l.outstanding_balance)
        .sum();
    let npl_ratio_pct = pct_or_zero(npl_balance, total_outstanding_balance);

    // Expected loss = EAD x PD x LGD
    let expected_loss =
        exposure_at_default * (default_rate_pct / Decimal::ONE_HUNDRED) * LOSS_GIVEN_DEFAULT;

    tracing::info!(
        active_loans = total_active_loans,
        defaulted_loans = total_defaulted_loans,
        %default_rate_pct,
        %portfolio_yield_pct,
        %npl_ratio_pct,
        "calculated portfolio KPIs"
    );

    PortfolioKpis {
        calculation_date: today,
        default_rate_pct,
        portfolio_yield_pct,
        early_delinquency_ratio_pct,
        exposure_at_default,
        customer_risk_score: customer_risk.score,
        npl_ratio_pct,
        expected_loss,
        total_active_loans,
        total_defaulted_loans,
        total_outstanding_balance,
        total_interest_earned,
        avg_repayment_history_score: customer_risk.avg_repayment_history,
        processing_timestamp: now,
    }
}

struct PortfolioRisk {
    score: Score,
    avg_repayment_history: Score,
}

/// Population-average risk score over active loans. Each active loan
/// contributes its customer's credit score and repayment history (share of
/// PAID repayments across the whole fact table); the transaction score uses
/// the mean of per-loan max days past due.
fn portfolio_customer_risk(joined: &[JoinedFact<'_>], active: &[LoanSummary<'_>]) -> PortfolioRisk {
    let mut history: HashMap<&str, (u64, u64)> = HashMap::new();
    for row in joined {
        let entry = history.entry(row.fact.customer_id.as_str()).or_default();
        entry.1 += 1;
        if row.fact.status == RepaymentStatus::Paid {
            entry.0 += 1;
        }
    }
    let credit_scores: HashMap<&str, Decimal> = joined
        .iter()
        .filter_map(|r| Some((r.fact.customer_id.as_str(), r.credit_score()?)))
        .collect();

    let scores: Vec<Decimal> = active
        .iter()
        .filter_map(|l| credit_scores.get(l.customer_id).copied())
        .collect();
    let histories: Vec<Decimal> = active
        .iter()
        .filter_map(|l| history.get(l.customer_id))
        .map(|&(paid, total)| pct_or_zero(Decimal::from(paid), Decimal::from(total)))
        .collect();
    let days_past_due: Vec<Decimal> = active
        .iter()
        .map(|l| Decimal::from(l.max_days_past_due.unwrap_or(0)))
        .collect();

    let avg_repayment_history = mean(&histories).unwrap_or(Decimal::ZERO);
    let avg_transaction = mean(&days_past_due).map_or(Decimal::ZERO, transaction_score);

    PortfolioRisk {
        score: customer_risk_score(mean(&scores), avg_transaction, avg_repayment_history),
        avg_repayment_history,
    }
}
