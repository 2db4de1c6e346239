//! Loan amortization engine.
//!
//! Splits every repayment into interest and principal against a running
//! balance. Each loan is folded independently over its repayments in
//! chronological order:
//!
//! 1. `monthly_rate = annual_rate / 100 / 12`, balance starts at `loan_amount`.
//! 2. `interest_paid = min(amount_paid, balance * monthly_rate)`.
//! 3. `principal_paid = amount_paid - interest_paid`.
//! 4. `balance = max(0, balance - principal_paid)`.
//!
//! Overpayments are absorbed as principal down to a zero balance; there is no
//! carry-forward credit. Loans without an amount or rate fall back to treating
//! each payment as pure principal with a zero balance.
//!
//! All arithmetic uses `rust_decimal::Decimal`, so the interest/principal
//! split of a payment always sums back to the amount paid.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::dimensions::{DimLoan, LoanTerms};
use crate::records::{nulls_last, RepaymentEvent};
use crate::types::{Money, Rate};

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Interest/principal split for a single repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSplit {
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub outstanding_balance: Money,
}

/// A repayment event carrying its amortization split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizedRepayment {
    #[serde(flatten)]
    pub repayment: RepaymentEvent,
    #[serde(flatten)]
    pub split: AmortizationSplit,
}

/// Monthly rate from an annual percentage rate.
pub fn monthly_rate(annual_rate_pct: Rate) -> Rate {
    annual_rate_pct / Decimal::ONE_HUNDRED / MONTHS_PER_YEAR
}

/// Fold one loan's payments, already in chronological order, into splits.
pub fn amortize_loan(terms: Option<LoanTerms>, amounts_paid: &[Money]) -> Vec<AmortizationSplit> {
    let Some(terms) = terms else {
        return amounts_paid
            .iter()
            .map(|&amount_paid| AmortizationSplit {
                principal_paid: amount_paid,
                interest_paid: Decimal::ZERO,
                outstanding_balance: Decimal::ZERO,
            })
            .collect();
    };

    let rate = monthly_rate(terms.interest_rate);
    amounts_paid
        .iter()
        .scan(terms.loan_amount, |balance, &amount_paid| {
            let interest_due = *balance * rate;
            let interest_paid = amount_paid.min(interest_due);
            let principal_paid = amount_paid - interest_paid;
            *balance = (*balance - principal_paid).max(Decimal::ZERO);
            Some(AmortizationSplit {
                principal_paid,
                interest_paid,
                outstanding_balance: *balance,
            })
        })
        .collect()
}

/// Order repayments by `(loan_id, payment_date)`, missing dates last, with
/// `repayment_id` as the final tie-break so the fold is independent of input
/// order.
pub fn sort_chronologically(repayments: &mut [RepaymentEvent]) {
    repayments.sort_by(|a, b| {
        a.loan_id
            .cmp(&b.loan_id)
            .then_with(|| nulls_last(a.payment_date).cmp(&nulls_last(b.payment_date)))
            .then_with(|| a.repayment_id.cmp(&b.repayment_id))
    });
}

/// Amortize every repayment against the loan terms in `dim_loan`.
///
/// Output is ordered by `(loan_id, payment_date)`.
pub fn calculate_amortization(
    repayments: &[RepaymentEvent],
    dim_loan: &[DimLoan],
) -> Vec<AmortizedRepayment> {
    let terms: HashMap<&str, Option<LoanTerms>> = dim_loan
        .iter()
        .map(|l| (l.loan_id.as_str(), l.terms()))
        .collect();

    let mut ordered = repayments.to_vec();
    sort_chronologically(&mut ordered);

    let mut out = Vec::with_capacity(ordered.len());
    for group in ordered.chunk_by(|a, b| a.loan_id == b.loan_id) {
        let loan_id = group[0].loan_id.as_str();
        let loan_terms = terms.get(loan_id).copied().flatten();
        if loan_terms.is_none() {
            tracing::debug!(loan_id, "missing loan amount or rate, treating payments as principal");
        }

        let amounts: Vec<Money> = group.iter().map(|r| r.amount_paid).collect();
        let splits = amortize_loan(loan_terms, &amounts);
        out.extend(
            group
                .iter()
                .cloned()
                .zip(splits)
                .map(|(repayment, split)| AmortizedRepayment { repayment, split }),
        );
    }
    out
}
