//! Delinquency KPIs by region, for dashboard drilldown.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    group_by_loan, is_early_delinquent, is_non_performing, join_facts, latest_per_loan,
    loan_outstanding, JoinedFact,
};
use crate::dimensions::{DimCustomer, DimLoan};
use crate::facts::FactLoanPerformance;
use crate::records::RepaymentStatus;
use crate::types::{pct_or_zero, Money, Rate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalDelinquencyKpi {
    pub region: String,
    pub total_loans: u64,
    pub early_delinquent_loans: u64,
    pub early_delinquency_rate_pct: Rate,
    pub npl_loans: u64,
    pub npl_rate_pct: Rate,
    pub defaulted_loans: u64,
    pub default_rate_pct: Rate,
    pub total_outstanding_balance: Money,
    pub calculation_date: NaiveDate,
    pub processing_timestamp: DateTime<Utc>,
}

/// One row per region over active loans.
///
/// Loan counts and rates use each loan's latest repayment. The outstanding
/// balance is `loan_amount - sum(amount_paid)` over every repayment of the
/// loan, floored at zero per loan. Regions appear in `loan_id` order of
/// their first loan.
pub fn calculate_regional_delinquency_kpis(
    facts: &[FactLoanPerformance],
    dim_customer: &[DimCustomer],
    dim_loan: &[DimLoan],
    now: DateTime<Utc>,
) -> Vec<RegionalDelinquencyKpi> {
    let active: Vec<JoinedFact<'_>> = join_facts(facts, dim_customer, dim_loan)
        .into_iter()
        .filter(|r| r.is_active())
        .collect();

    let mut regions: Vec<String> = Vec::new();
    let mut latest_by_region: HashMap<String, Vec<JoinedFact<'_>>> = HashMap::new();
    for row in latest_per_loan(&active).into_values() {
        let region = row.region();
        if !latest_by_region.contains_key(&region) {
            regions.push(region.clone());
        }
        latest_by_region.entry(region).or_default().push(row);
    }

    let mut outstanding_by_region: HashMap<String, Money> = HashMap::new();
    for rows in group_by_loan(&active).values() {
        if let Some(balance) = loan_outstanding(rows) {
            *outstanding_by_region.entry(rows[0].region()).or_default() += balance;
        }
    }

    let stats: Vec<RegionalDelinquencyKpi> = regions
        .into_iter()
        .map(|region| {
            let latest = &latest_by_region[&region];
            let total_loans = latest.len() as u64;
            let total = Decimal::from(total_loans);

            let early_delinquent_loans = latest
                .iter()
                .filter(|r| is_early_delinquent(r.fact.days_past_due))
                .count() as u64;
            let npl_loans = latest
                .iter()
                .filter(|r| is_non_performing(r.fact.days_past_due))
                .count() as u64;
            let defaulted_loans = latest
                .iter()
                .filter(|r| r.fact.status == RepaymentStatus::Missed)
                .count() as u64;

            RegionalDelinquencyKpi {
                total_outstanding_balance: outstanding_by_region
                    .get(&region)
                    .copied()
                    .unwrap_or(Decimal::ZERO),
                region,
                total_loans,
                early_delinquent_loans,
                early_delinquency_rate_pct: pct_or_zero(Decimal::from(early_delinquent_loans), total),
                npl_loans,
                npl_rate_pct: pct_or_zero(Decimal::from(npl_loans), total),
                defaulted_loans,
                default_rate_pct: pct_or_zero(Decimal::from(defaulted_loans), total),
                calculation_date: now.date_naive(),
                processing_timestamp: now,
            }
        })
        .collect();

    tracing::info!(regions = stats.len(), "calculated regional delinquency KPIs");
    stats
}
