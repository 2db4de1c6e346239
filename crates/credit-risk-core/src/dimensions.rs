//! Dimension tables: `DimCustomer` and `DimLoan`.
//!
//! - **DimCustomer** -- applicant demographics left-joined with the latest
//!   credit bureau profile, one row per `customer_id`.
//! - **DimLoan** -- every loan seen in the repayment feed left-joined with the
//!   customer's approved application, one row per `loan_id`.
//!
//! Both are upserted by natural key, keeping the row with the latest
//! `updated_date`.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{ApprovalStatus, CreditProfile, LoanApplication, RepaymentEvent};
use crate::types::{Money, Rate};
use crate::upsert::Upsertable;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimCustomer {
    pub customer_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub ssn: Option<String>,
    pub credit_score: Option<u32>,
    pub total_open_loans: Option<u32>,
    pub total_defaults: Option<u32>,
    pub inquiries_last_6m: Option<u32>,
    pub effective_date: Option<NaiveDate>,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimLoan {
    pub loan_id: String,
    pub customer_id: String,
    pub application_id: Option<String>,
    pub loan_amount: Option<Money>,
    pub loan_type: Option<String>,
    pub term_months: Option<u32>,
    pub interest_rate: Option<Rate>,
    pub approval_status: Option<ApprovalStatus>,
    pub application_date: Option<NaiveDate>,
    pub approval_date: Option<NaiveDate>,
    pub has_approved_application: bool,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

/// Principal and annual rate (percent) of a loan with complete terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    pub loan_amount: Money,
    pub interest_rate: Rate,
}

impl DimLoan {
    /// Loan terms, or `None` when either amount or rate is missing.
    pub fn terms(&self) -> Option<LoanTerms> {
        match (self.loan_amount, self.interest_rate) {
            (Some(loan_amount), Some(interest_rate)) => Some(LoanTerms {
                loan_amount,
                interest_rate,
            }),
            _ => None,
        }
    }

    /// Active loans are those whose application was approved.
    pub fn is_active(&self) -> bool {
        self.approval_status == Some(ApprovalStatus::Approved)
    }
}

impl Upsertable for DimCustomer {
    type Recency = DateTime<Utc>;

    fn key(&self) -> &str {
        &self.customer_id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.updated_date
    }
}

impl Upsertable for DimLoan {
    type Recency = DateTime<Utc>;

    fn key(&self) -> &str {
        &self.loan_id
    }

    fn recency(&self) -> DateTime<Utc> {
        self.updated_date
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Keep the last occurrence of each key, in the order those occurrences
/// appear in the input.
pub(crate) fn dedup_keep_last<'a, T, K, F>(rows: &'a [T], key: F) -> Vec<&'a T>
where
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let last: HashMap<K, usize> = rows.iter().enumerate().map(|(i, r)| (key(r), i)).collect();
    rows.iter()
        .enumerate()
        .filter(|(i, r)| last.get(&key(*r)) == Some(i))
        .map(|(_, r)| r)
        .collect()
}

/// Build DimCustomer: demographics from the applications, left-joined with
/// the credit bureau on `customer_id`. Customers without a bureau record get
/// null credit fields.
pub fn build_dim_customer(
    applications: &[LoanApplication],
    credit_bureau: &[CreditProfile],
    now: DateTime<Utc>,
) -> Vec<DimCustomer> {
    let demographics = dedup_keep_last(applications, |a| a.customer_id.as_str());
    let profiles: HashMap<&str, &CreditProfile> =
        dedup_keep_last(credit_bureau, |p| p.customer_id.as_str())
            .into_iter()
            .map(|p| (p.customer_id.as_str(), p))
            .collect();

    tracing::info!(
        customers = demographics.len(),
        credit_profiles = profiles.len(),
        "building DimCustomer"
    );

    demographics
        .into_iter()
        .map(|app| {
            let credit = profiles.get(app.customer_id.as_str()).copied();
            DimCustomer {
                customer_id: app.customer_id.clone(),
                full_name: app.full_name.clone(),
                email: app.email.clone(),
                phone_number: app.phone_number.clone(),
                address: app.address.clone(),
                date_of_birth: app.date_of_birth,
                ssn: credit.and_then(|c| c.ssn.clone()),
                credit_score: credit.and_then(|c| c.credit_score),
                total_open_loans: credit.and_then(|c| c.total_open_loans),
                total_defaults: credit.and_then(|c| c.total_defaults),
                inquiries_last_6m: credit.and_then(|c| c.inquiries_last_6m),
                effective_date: credit.and_then(|c| c.effective_date),
                created_date: now,
                updated_date: now,
            }
        })
        .collect()
}

/// Build DimLoan: distinct loans from the repayment feed (regardless of
/// approval), left-joined on `customer_id` with that customer's approved
/// application.
///
/// Approved applications are deduplicated per customer (last wins), so a
/// customer holding several approved loans has every one of their loan_ids
/// mapped to the same set of characteristics.
pub fn build_dim_loan(
    repayments: &[RepaymentEvent],
    applications: &[LoanApplication],
    now: DateTime<Utc>,
) -> Vec<DimLoan> {
    let loans = dedup_keep_last(repayments, |r| r.loan_id.as_str());

    let approved: Vec<LoanApplication> = applications
        .iter()
        .filter(|a| a.approval_status == ApprovalStatus::Approved)
        .cloned()
        .collect();
    let characteristics: HashMap<&str, &LoanApplication> =
        dedup_keep_last(&approved, |a| a.customer_id.as_str())
            .into_iter()
            .map(|a| (a.customer_id.as_str(), a))
            .collect();

    let dim_loan: Vec<DimLoan> = loans
        .into_iter()
        .map(|loan| {
            let app = characteristics.get(loan.customer_id.as_str()).copied();
            DimLoan {
                loan_id: loan.loan_id.clone(),
                customer_id: loan.customer_id.clone(),
                application_id: app.map(|a| a.application_id.clone()),
                loan_amount: app.and_then(|a| a.loan_amount),
                loan_type: app.and_then(|a| a.loan_type.clone()),
                term_months: app.and_then(|a| a.term_months),
                interest_rate: app.and_then(|a| a.interest_rate),
                approval_status: app.map(|a| a.approval_status),
                application_date: app.and_then(|a| a.application_date),
                approval_date: app.and_then(|a| a.approval_date),
                has_approved_application: app.is_some(),
                created_date: now,
                updated_date: now,
            }
        })
        .collect();

    let matched = dim_loan.iter().filter(|l| l.has_approved_application).count();
    tracing::info!(
        loans = dim_loan.len(),
        with_application = matched,
        without_application = dim_loan.len() - matched,
        "built DimLoan"
    );
    dim_loan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RepaymentStatus;
    use crate::upsert::merge_latest;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn application(id: &str, customer: &str, status: ApprovalStatus, amount: Money) -> LoanApplication {
        LoanApplication {
            application_id: id.into(),
            customer_id: customer.into(),
            full_name: Some(format!("Customer {customer}")),
            email: None,
            phone_number: None,
            address: Some("12 Elm St, Springfield, IL 62701".into()),
            date_of_birth: None,
            loan_amount: Some(amount),
            loan_type: Some("Personal".into()),
            term_months: Some(12),
            interest_rate: Some(dec!(12)),
            approval_status: status,
            application_date: None,
            approval_date: None,
        }
    }

    fn profile(customer: &str, score: u32) -> CreditProfile {
        CreditProfile {
            customer_id: customer.into(),
            ssn: Some("XXX-XX-1234".into()),
            credit_score: Some(score),
            total_open_loans: Some(1),
            total_defaults: Some(0),
            inquiries_last_6m: Some(2),
            effective_date: None,
        }
    }

    fn repayment(id: &str, loan: &str, customer: &str) -> RepaymentEvent {
        RepaymentEvent {
            repayment_id: id.into(),
            loan_id: loan.into(),
            customer_id: customer.into(),
            due_date: None,
            payment_date: None,
            amount_paid: dec!(100),
            status: RepaymentStatus::Paid,
            days_past_due: None,
            delinquency_bucket: None,
            source_file: None,
        }
    }

    #[test]
    fn test_dedup_keep_last_preserves_position_of_last() {
        let rows = vec![("a", 1), ("b", 2), ("a", 3)];
        let kept = dedup_keep_last(&rows, |r| r.0);
        assert_eq!(kept, vec![&("b", 2), &("a", 3)]);
    }

    #[test]
    fn test_dim_customer_left_join() {
        let apps = vec![
            application("A1", "C1", ApprovalStatus::Approved, dec!(1000)),
            application("A2", "C2", ApprovalStatus::Rejected, dec!(500)),
        ];
        let bureau = vec![profile("C1", 600), profile("C1", 700)];
        let dim = build_dim_customer(&apps, &bureau, now());

        assert_eq!(dim.len(), 2);
        assert_eq!(dim[0].customer_id, "C1");
        assert_eq!(dim[0].credit_score, Some(700));
        assert_eq!(dim[1].customer_id, "C2");
        assert_eq!(dim[1].credit_score, None);
        assert_eq!(dim[1].ssn, None);
        assert_eq!(dim[1].updated_date, now());
    }

    #[test]
    fn test_dim_loan_keeps_loans_without_approved_application() {
        let repayments = vec![
            repayment("R1", "L1", "C1"),
            repayment("R2", "L2", "C2"),
            repayment("R3", "L1", "C1"),
        ];
        let apps = vec![
            application("A1", "C1", ApprovalStatus::Approved, dec!(1000)),
            application("A2", "C2", ApprovalStatus::Pending, dec!(500)),
        ];
        let dim = build_dim_loan(&repayments, &apps, now());

        assert_eq!(dim.len(), 2);
        let l1 = dim.iter().find(|l| l.loan_id == "L1").unwrap();
        assert!(l1.has_approved_application);
        assert_eq!(l1.loan_amount, Some(dec!(1000)));
        assert!(l1.is_active());

        let l2 = dim.iter().find(|l| l.loan_id == "L2").unwrap();
        assert!(!l2.has_approved_application);
        assert_eq!(l2.loan_amount, None);
        assert_eq!(l2.approval_status, None);
        assert!(l2.terms().is_none());
        assert!(!l2.is_active());
    }

    #[test]
    fn test_dim_loan_collapses_multiple_approved_per_customer() {
        let repayments = vec![repayment("R1", "L1", "C1"), repayment("R2", "L2", "C1")];
        let apps = vec![
            application("A1", "C1", ApprovalStatus::Approved, dec!(1000)),
            application("A2", "C1", ApprovalStatus::Approved, dec!(5000)),
        ];
        let dim = build_dim_loan(&repayments, &apps, now());
        assert!(dim.iter().all(|l| l.loan_amount == Some(dec!(5000))));
        assert!(dim.iter().all(|l| l.application_id.as_deref() == Some("A2")));
    }

    #[test]
    fn test_dim_loan_upsert_latest_updated_date_wins() {
        let apps = vec![application("A1", "C1", ApprovalStatus::Approved, dec!(1000))];
        let t1 = now();
        let t2 = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let existing = build_dim_loan(&[repayment("R1", "L1", "C1")], &apps, t1);

        let new_apps = vec![application("A9", "C1", ApprovalStatus::Approved, dec!(2500))];
        let incoming = build_dim_loan(&[repayment("R1", "L1", "C1")], &new_apps, t2);

        let merged = merge_latest(existing, incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].updated_date, t2);
        assert_eq!(merged[0].loan_amount, Some(dec!(2500)));
        assert_eq!(merged[0].application_id.as_deref(), Some("A9"));
    }
}
