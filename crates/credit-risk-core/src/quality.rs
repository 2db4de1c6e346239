//! Data-quality checks on the gold build inputs and outputs.
//!
//! Anomalies are reported as warnings and logged; values pass through
//! unmodified.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::dimensions::{DimCustomer, DimLoan};
use crate::records::RepaymentEvent;

/// Warnings about the repayment feed relative to the loan dimension.
pub fn check_repayments(repayments: &[RepaymentEvent], dim_loan: &[DimLoan]) -> Vec<String> {
    let mut warnings = Vec::new();

    let negative = repayments
        .iter()
        .filter(|r| r.amount_paid < Decimal::ZERO)
        .count();
    if negative > 0 {
        warnings.push(format!("{negative} repayment(s) have a negative amount_paid"));
    }

    let undated = repayments.iter().filter(|r| r.payment_date.is_none()).count();
    if undated > 0 {
        warnings.push(format!("{undated} repayment(s) have no payment_date"));
    }

    let known: HashSet<&str> = dim_loan.iter().map(|l| l.loan_id.as_str()).collect();
    let orphaned: HashSet<&str> = repayments
        .iter()
        .map(|r| r.loan_id.as_str())
        .filter(|id| !known.contains(id))
        .collect();
    if !orphaned.is_empty() {
        warnings.push(format!(
            "{} loan(s) in repayments are missing from DimLoan",
            orphaned.len()
        ));
    }

    emit(&warnings);
    warnings
}

/// Warnings about nulls introduced by the dimension left joins.
pub fn check_dimensions(dim_customer: &[DimCustomer], dim_loan: &[DimLoan]) -> Vec<String> {
    let mut warnings = Vec::new();

    let without_credit = dim_customer
        .iter()
        .filter(|c| c.credit_score.is_none())
        .count();
    if without_credit > 0 {
        warnings.push(format!(
            "{without_credit} customer(s) in DimCustomer have no credit profile"
        ));
    }

    let unmatched = dim_loan
        .iter()
        .filter(|l| !l.has_approved_application)
        .count();
    if unmatched > 0 {
        warnings.push(format!(
            "{unmatched} loan(s) in DimLoan have no approved application"
        ));
    }

    let negative_terms = dim_loan
        .iter()
        .filter(|l| {
            l.loan_amount.is_some_and(|a| a < Decimal::ZERO)
                || l.interest_rate.is_some_and(|r| r < Decimal::ZERO)
        })
        .count();
    if negative_terms > 0 {
        warnings.push(format!(
            "{negative_terms} loan(s) in DimLoan have a negative loan_amount or interest_rate"
        ));
    }

    emit(&warnings);
    warnings
}

fn emit(warnings: &[String]) {
    for w in warnings {
        tracing::warn!("{}", w);
    }
}
