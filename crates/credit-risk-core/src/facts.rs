//! `FactLoanPerformance`: one row per repayment event, enriched with the
//! amortization split and a per-event default flag.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::amortization::{calculate_amortization, AmortizedRepayment};
use crate::dimensions::DimLoan;
use crate::records::{nulls_last, DelinquencyBucket, RepaymentEvent, RepaymentStatus};
use crate::storage::TableStore;
use crate::types::Money;
use crate::upsert::{upsert, Upsertable};
use crate::CreditRiskResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactLoanPerformance {
    pub repayment_id: String,
    pub loan_id: String,
    pub customer_id: String,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub amount_paid: Money,
    pub status: RepaymentStatus,
    pub days_past_due: Option<i64>,
    pub delinquency_bucket: Option<DelinquencyBucket>,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub outstanding_balance: Money,
    /// Set when this repayment was missed. A per-event flag, distinct from
    /// the per-loan default classification used by the portfolio KPIs.
    pub is_defaulted: bool,
    pub processing_date: DateTime<Utc>,
    pub source_file: Option<String>,
}

impl Upsertable for FactLoanPerformance {
    type Recency = Option<NaiveDate>;

    fn key(&self) -> &str {
        &self.repayment_id
    }

    /// Missing payment dates rank as least recent.
    fn recency(&self) -> Option<NaiveDate> {
        self.payment_date
    }
}

impl FactLoanPerformance {
    fn from_amortized(row: AmortizedRepayment, processing_date: DateTime<Utc>) -> Self {
        let AmortizedRepayment { repayment, split } = row;
        Self {
            is_defaulted: repayment.status == RepaymentStatus::Missed,
            repayment_id: repayment.repayment_id,
            loan_id: repayment.loan_id,
            customer_id: repayment.customer_id,
            due_date: repayment.due_date,
            payment_date: repayment.payment_date,
            amount_paid: repayment.amount_paid,
            status: repayment.status,
            days_past_due: repayment.days_past_due,
            delinquency_bucket: repayment.delinquency_bucket,
            principal_paid: split.principal_paid,
            interest_paid: split.interest_paid,
            outstanding_balance: split.outstanding_balance,
            processing_date,
            source_file: repayment.source_file,
        }
    }
}

/// Amortize the repayments against `dim_loan` and project to the fact
/// column set. Output is ordered by `(loan_id, payment_date)`.
pub fn build_fact_loan_performance(
    repayments: &[RepaymentEvent],
    dim_loan: &[DimLoan],
    now: DateTime<Utc>,
) -> Vec<FactLoanPerformance> {
    let facts: Vec<FactLoanPerformance> = calculate_amortization(repayments, dim_loan)
        .into_iter()
        .map(|row| FactLoanPerformance::from_amortized(row, now))
        .collect();
    tracing::info!(records = facts.len(), "built FactLoanPerformance");
    facts
}

/// Order facts by `(loan_id, payment_date, repayment_id)`, missing dates
/// last. Matches the amortization order, so same-day repayments keep their
/// position whatever the upsert history.
pub fn sort_facts_chronologically(facts: &mut [FactLoanPerformance]) {
    facts.sort_by(|a, b| {
        a.loan_id
            .cmp(&b.loan_id)
            .then_with(|| nulls_last(a.payment_date).cmp(&nulls_last(b.payment_date)))
            .then_with(|| a.repayment_id.cmp(&b.repayment_id))
    });
}

/// Upsert facts by `repayment_id` (latest `payment_date` wins), then restore
/// chronological order for downstream consumers.
pub fn upsert_facts<S: TableStore>(
    store: &S,
    location: &str,
    incoming: Vec<FactLoanPerformance>,
) -> CreditRiskResult<Vec<FactLoanPerformance>> {
    let mut merged = upsert(store, location, incoming)?;
    sort_facts_chronologically(&mut merged);
    Ok(merged)
}
