//! Customer-level risk drilldown: one row per customer holding an active
//! loan.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    customer_risk_score, group_by_loan, join_facts, latest_per_loan, transaction_score, JoinedFact,
    NPL_DAYS_PAST_DUE,
};
use crate::dimensions::{DimCustomer, DimLoan};
use crate::facts::FactLoanPerformance;
use crate::records::RepaymentStatus;
use crate::types::{pct_or_zero, Money, Score};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDrilldownKpi {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub region: String,
    pub credit_score: Option<u32>,
    pub total_loans: u64,
    pub total_loan_amount: Money,
    pub total_amount_paid: Money,
    pub outstanding_balance: Money,
    pub max_days_past_due: i64,
    pub is_delinquent: bool,
    pub is_npl: bool,
    pub is_defaulted: bool,
    pub repayment_history_score: Score,
    pub transaction_score: Score,
    pub customer_risk_score: Score,
    pub calculation_date: NaiveDate,
    pub processing_timestamp: DateTime<Utc>,
}

/// One row per customer over active loans, in order of first appearance in
/// the fact table.
pub fn calculate_customer_drilldown_kpis(
    facts: &[FactLoanPerformance],
    dim_customer: &[DimCustomer],
    dim_loan: &[DimLoan],
    now: DateTime<Utc>,
) -> Vec<CustomerDrilldownKpi> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_customer: HashMap<&str, Vec<JoinedFact<'_>>> = HashMap::new();
    for row in join_facts(facts, dim_customer, dim_loan) {
        if !row.is_active() {
            continue;
        }
        let id = row.fact.customer_id.as_str();
        by_customer
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(row);
    }

    let stats: Vec<CustomerDrilldownKpi> = order
        .into_iter()
        .map(|id| summarize_customer(id, &by_customer[id], now))
        .collect();

    tracing::info!(customers = stats.len(), "calculated customer drilldown KPIs");
    stats
}

fn summarize_customer(
    customer_id: &str,
    rows: &[JoinedFact<'_>],
    now: DateTime<Utc>,
) -> CustomerDrilldownKpi {
    let first = rows[0];
    let latest = latest_per_loan(rows);
    let loans = group_by_loan(rows);

    let total_loan_amount: Money = loans.values().filter_map(|r| r[0].loan_amount()).sum();
    let total_amount_paid: Money = rows.iter().map(|r| r.fact.amount_paid).sum();
    let outstanding_balance = (total_loan_amount - total_amount_paid).max(Decimal::ZERO);

    let max_days_past_due = latest.values().filter_map(|r| r.fact.days_past_due).max();
    let is_defaulted = latest
        .values()
        .any(|r| r.fact.status == RepaymentStatus::Missed);

    let paid = rows
        .iter()
        .filter(|r| r.fact.status == RepaymentStatus::Paid)
        .count();
    let repayment_history_score =
        pct_or_zero(Decimal::from(paid as u64), Decimal::from(rows.len() as u64));
    let txn_score = max_days_past_due
        .map_or(Decimal::ONE_HUNDRED, |d| transaction_score(Decimal::from(d)));

    let credit_score = first.customer.and_then(|c| c.credit_score);

    CustomerDrilldownKpi {
        customer_id: customer_id.to_string(),
        customer_name: first.customer.and_then(|c| c.full_name.clone()),
        region: first.region(),
        credit_score,
        total_loans: latest.len() as u64,
        total_loan_amount,
        total_amount_paid,
        outstanding_balance,
        max_days_past_due: max_days_past_due.unwrap_or(0),
        is_delinquent: max_days_past_due.is_some_and(|d| d > 0),
        is_npl: max_days_past_due.is_some_and(|d| d > NPL_DAYS_PAST_DUE),
        is_defaulted,
        repayment_history_score,
        transaction_score: txn_score,
        customer_risk_score: customer_risk_score(
            credit_score.map(Decimal::from),
            txn_score,
            repayment_history_score,
        ),
        calculation_date: now.date_naive(),
        processing_timestamp: now,
    }
}
