//! Portfolio, regional and customer risk KPIs.
//!
//! All three aggregations read the post-upsert `FactLoanPerformance`,
//! `DimCustomer` and `DimLoan` tables and produce full replacement snapshots.
//! "Active" loans are those whose DimLoan approval status is APPROVED.
//!
//! Ratios are percentages and fall back to zero when their denominator is
//! zero.

pub mod customer;
pub mod portfolio;
pub mod regional;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::dimensions::{DimCustomer, DimLoan};
use crate::facts::FactLoanPerformance;
use crate::records::nulls_last;
use crate::types::{Money, Score};

pub use customer::{calculate_customer_drilldown_kpis, CustomerDrilldownKpi};
pub use portfolio::{calculate_portfolio_kpis, PortfolioKpis};
pub use regional::{calculate_regional_delinquency_kpis, RegionalDelinquencyKpi};

/// Loss given default applied to EAD.
pub const LOSS_GIVEN_DEFAULT: Decimal = dec!(0.45);

pub const CREDIT_SCORE_FLOOR: Decimal = dec!(300);
pub const CREDIT_SCORE_CEILING: Decimal = dec!(850);

pub const CREDIT_SCORE_WEIGHT: Decimal = dec!(0.5);
pub const TRANSACTION_SCORE_WEIGHT: Decimal = dec!(0.3);
pub const REPAYMENT_HISTORY_WEIGHT: Decimal = dec!(0.2);

/// Days past due beyond which a loan is non-performing. Also the point at
/// which the transaction score reaches zero.
pub const NPL_DAYS_PAST_DUE: i64 = 90;

pub const UNKNOWN_REGION: &str = "Unknown";

/// All three KPI tables from one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub portfolio: PortfolioKpis,
    pub regional_delinquency: Vec<RegionalDelinquencyKpi>,
    pub customer_drilldown: Vec<CustomerDrilldownKpi>,
}

/// Compute every KPI table as of `now`.
pub fn calculate_all_kpis(
    facts: &[FactLoanPerformance],
    dim_customer: &[DimCustomer],
    dim_loan: &[DimLoan],
    now: DateTime<Utc>,
) -> KpiSnapshot {
    KpiSnapshot {
        portfolio: calculate_portfolio_kpis(facts, dim_customer, dim_loan, now),
        regional_delinquency: calculate_regional_delinquency_kpis(facts, dim_customer, dim_loan, now),
        customer_drilldown: calculate_customer_drilldown_kpis(facts, dim_customer, dim_loan, now),
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Rescale a credit score from 300-850 onto 0-100, clamped.
pub fn normalize_credit_score(score: Decimal) -> Score {
    let scaled = (score - CREDIT_SCORE_FLOOR) / (CREDIT_SCORE_CEILING - CREDIT_SCORE_FLOOR)
        * Decimal::ONE_HUNDRED;
    scaled.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// 100 at zero days past due, falling linearly to 0 at 90 days.
pub fn transaction_score(days_past_due: Decimal) -> Score {
    let score =
        Decimal::ONE_HUNDRED - days_past_due / Decimal::from(NPL_DAYS_PAST_DUE) * Decimal::ONE_HUNDRED;
    score.max(Decimal::ZERO)
}

/// Weighted composite: 0.5 credit + 0.3 transaction + 0.2 repayment history.
/// Zero when the credit score is unknown.
pub fn customer_risk_score(
    credit_score: Option<Decimal>,
    transaction_score: Score,
    repayment_history_score: Score,
) -> Score {
    match credit_score {
        Some(cs) => {
            CREDIT_SCORE_WEIGHT * normalize_credit_score(cs)
                + TRANSACTION_SCORE_WEIGHT * transaction_score
                + REPAYMENT_HISTORY_WEIGHT * repayment_history_score
        }
        None => Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

fn is_postal_code(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn is_state_code(word: &str) -> bool {
    word.len() == 2 && word.chars().all(|c| c.is_ascii_uppercase())
}

/// Derive a region from a `"street, city, STATE ZIP"` style address.
///
/// Addresses with fewer than two comma-separated parts (or none at all) map
/// to `"Unknown"`. The region is the state when the final part names one:
/// a two-letter code with or without a postal code
/// (`"12 Elm St, Springfield, IL 62701"` and `"9 Oak Ave, Denver, CO"` give
/// `"IL"` and `"CO"`), or `"<state name> <postal code>"`. Otherwise the
/// second-to-last comma-separated part is used.
pub fn region_from_address(address: Option<&str>) -> String {
    let Some(address) = address else {
        return UNKNOWN_REGION.to_string();
    };
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    if parts.len() < 2 {
        return UNKNOWN_REGION.to_string();
    }

    let last_words: Vec<&str> = parts[parts.len() - 1].split_whitespace().collect();
    let region = match (last_words.first(), last_words.split_last()) {
        (Some(code), _) if is_state_code(code) => code.to_string(),
        (_, Some((postal, state))) if !state.is_empty() && is_postal_code(postal) => {
            state.join(" ")
        }
        _ => parts[parts.len() - 2].to_string(),
    };

    if region.is_empty() {
        UNKNOWN_REGION.to_string()
    } else {
        region
    }
}

// ---------------------------------------------------------------------------
// Joined view
// ---------------------------------------------------------------------------

/// A fact row with its loan and customer dimension rows attached.
#[derive(Debug, Clone, Copy)]
pub(crate) struct JoinedFact<'a> {
    pub fact: &'a FactLoanPerformance,
    pub loan: Option<&'a DimLoan>,
    pub customer: Option<&'a DimCustomer>,
}

impl<'a> JoinedFact<'a> {
    pub fn is_active(&self) -> bool {
        self.loan.is_some_and(|l| l.is_active())
    }

    pub fn loan_amount(&self) -> Option<Money> {
        self.loan.and_then(|l| l.loan_amount)
    }

    pub fn credit_score(&self) -> Option<Decimal> {
        self.customer.and_then(|c| c.credit_score).map(Decimal::from)
    }

    pub fn region(&self) -> String {
        region_from_address(self.customer.and_then(|c| c.address.as_deref()))
    }
}

/// Left-join facts with DimLoan on `loan_id` and DimCustomer on the fact's
/// `customer_id`, preserving fact order.
pub(crate) fn join_facts<'a>(
    facts: &'a [FactLoanPerformance],
    dim_customer: &'a [DimCustomer],
    dim_loan: &'a [DimLoan],
) -> Vec<JoinedFact<'a>> {
    let loans: HashMap<&str, &DimLoan> = dim_loan.iter().map(|l| (l.loan_id.as_str(), l)).collect();
    let customers: HashMap<&str, &DimCustomer> = dim_customer
        .iter()
        .map(|c| (c.customer_id.as_str(), c))
        .collect();

    facts
        .iter()
        .map(|fact| JoinedFact {
            fact,
            loan: loans.get(fact.loan_id.as_str()).copied(),
            customer: customers.get(fact.customer_id.as_str()).copied(),
        })
        .collect()
}

/// Within-loan chronological order: `payment_date` with missing dates last,
/// then `repayment_id`.
fn chronological(a: &JoinedFact<'_>, b: &JoinedFact<'_>) -> Ordering {
    nulls_last(a.fact.payment_date)
        .cmp(&nulls_last(b.fact.payment_date))
        .then_with(|| a.fact.repayment_id.cmp(&b.fact.repayment_id))
}

/// Most recent row per loan by `payment_date` (missing dates rank latest,
/// the larger `repayment_id` wins ties), keyed and ordered by `loan_id`.
pub(crate) fn latest_per_loan<'a>(rows: &[JoinedFact<'a>]) -> BTreeMap<&'a str, JoinedFact<'a>> {
    let mut ordered: Vec<JoinedFact<'a>> = rows.to_vec();
    ordered.sort_by(chronological);

    let mut latest = BTreeMap::new();
    for row in ordered {
        latest.insert(row.fact.loan_id.as_str(), row);
    }
    latest
}

/// Rows grouped by `loan_id`, ordered by `loan_id`, each group in
/// chronological order.
pub(crate) fn group_by_loan<'a>(rows: &[JoinedFact<'a>]) -> BTreeMap<&'a str, Vec<JoinedFact<'a>>> {
    let mut groups: BTreeMap<&'a str, Vec<JoinedFact<'a>>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.fact.loan_id.as_str()).or_default().push(*row);
    }
    for group in groups.values_mut() {
        group.sort_by(chronological);
    }
    groups
}

/// `max(0, loan_amount - sum(amount_paid))` over one loan's rows; `None`
/// when the loan amount is unknown.
pub(crate) fn loan_outstanding(rows: &[JoinedFact<'_>]) -> Option<Money> {
    let loan_amount = rows.first().and_then(|r| r.loan_amount())?;
    let total_paid: Money = rows.iter().map(|r| r.fact.amount_paid).sum();
    Some((loan_amount - total_paid).max(Decimal::ZERO))
}

/// Arithmetic mean, `None` for an empty input.
pub(crate) fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().copied().sum::<Decimal>() / Decimal::from(values.len() as u64))
    }
}

pub(crate) fn is_early_delinquent(days_past_due: Option<i64>) -> bool {
    days_past_due.is_some_and(|d| (1..=NPL_DAYS_PAST_DUE).contains(&d))
}

pub(crate) fn is_non_performing(days_past_due: Option<i64>) -> bool {
    days_past_due.is_some_and(|d| d > NPL_DAYS_PAST_DUE)
}
