//! Silver-layer input records.
//!
//! These are the cleansed rows produced by the bronze → silver transforms:
//! loan applications (which also carry customer demographics), credit bureau
//! profiles and loan repayment events. Status columns are normalised on
//! deserialisation so that the aliases emitted by upstream feeds
//! (`COMPLETE`, `LATE PAYMENT`, `APPROVE`, ...) collapse onto one variant.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Outcome of a single scheduled repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RepaymentStatus {
    Paid,
    Late,
    Missed,
    Unknown,
}

impl From<String> for RepaymentStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "PAID" | "COMPLETE" | "COMPLETED" => RepaymentStatus::Paid,
            "LATE" | "LATE PAYMENT" => RepaymentStatus::Late,
            "MISSED" | "MISS" => RepaymentStatus::Missed,
            _ => RepaymentStatus::Unknown,
        }
    }
}

impl From<RepaymentStatus> for String {
    fn from(status: RepaymentStatus) -> Self {
        match status {
            RepaymentStatus::Paid => "PAID",
            RepaymentStatus::Late => "LATE",
            RepaymentStatus::Missed => "MISSED",
            RepaymentStatus::Unknown => "UNKNOWN",
        }
        .to_string()
    }
}

/// Credit decision on a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApprovalStatus {
    Approved,
    Rejected,
    Pending,
    Unknown,
}

impl From<String> for ApprovalStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "APPROVED" | "APPROVE" => ApprovalStatus::Approved,
            "REJECTED" | "REJECT" => ApprovalStatus::Rejected,
            "PENDING" | "PEND" => ApprovalStatus::Pending,
            _ => ApprovalStatus::Unknown,
        }
    }
}

impl From<ApprovalStatus> for String {
    fn from(status: ApprovalStatus) -> Self {
        match status {
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Unknown => "UNKNOWN",
        }
        .to_string()
    }
}

/// Days-past-due bucket attached to every repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelinquencyBucket {
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "CURRENT")]
    Current,
    #[serde(rename = "1-30_DAYS")]
    Days1To30,
    #[serde(rename = "31-60_DAYS")]
    Days31To60,
    #[serde(rename = "61-90_DAYS")]
    Days61To90,
    #[serde(rename = "90+_DAYS")]
    Over90Days,
}

// ---------------------------------------------------------------------------
// Silver records
// ---------------------------------------------------------------------------

/// A loan application, including the applicant's demographics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub application_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub loan_amount: Option<Money>,
    #[serde(default)]
    pub loan_type: Option<String>,
    #[serde(default)]
    pub term_months: Option<u32>,
    /// Annual rate in percent.
    #[serde(default)]
    pub interest_rate: Option<Rate>,
    pub approval_status: ApprovalStatus,
    #[serde(default)]
    pub application_date: Option<NaiveDate>,
    #[serde(default)]
    pub approval_date: Option<NaiveDate>,
}

/// A credit bureau profile. The SSN arrives already masked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditProfile {
    pub customer_id: String,
    #[serde(default)]
    pub ssn: Option<String>,
    #[serde(default)]
    pub credit_score: Option<u32>,
    #[serde(default)]
    pub total_open_loans: Option<u32>,
    #[serde(default)]
    pub total_defaults: Option<u32>,
    #[serde(default)]
    pub inquiries_last_6m: Option<u32>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

/// One scheduled repayment of a loan. `payment_date` may precede `due_date`
/// (early payment) and is absent for some missed payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentEvent {
    pub repayment_id: String,
    pub loan_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub amount_paid: Money,
    pub status: RepaymentStatus,
    #[serde(default)]
    pub days_past_due: Option<i64>,
    #[serde(default)]
    pub delinquency_bucket: Option<DelinquencyBucket>,
    #[serde(default)]
    pub source_file: Option<String>,
}

/// Sort key placing missing dates after every present date.
pub(crate) fn nulls_last(date: Option<NaiveDate>) -> (bool, Option<NaiveDate>) {
    (date.is_none(), date)
}
