//! Normalisation applied to silver repayment and bureau data before the gold
//! build: days-past-due derivation, delinquency bucketing, chronological
//! ordering and duplicate removal.

use std::collections::HashMap;

use crate::records::{nulls_last, CreditProfile, DelinquencyBucket, RepaymentEvent};

/// Bureau scores outside this range are treated as unusable.
pub const MIN_VALID_CREDIT_SCORE: u32 = 100;
pub const MAX_VALID_CREDIT_SCORE: u32 = 2000;

/// Map days past due onto its delinquency bucket.
pub fn classify_delinquency(days_past_due: Option<i64>) -> DelinquencyBucket {
    match days_past_due {
        None => DelinquencyBucket::Unknown,
        Some(d) if d <= 0 => DelinquencyBucket::Current,
        Some(d) if d <= 30 => DelinquencyBucket::Days1To30,
        Some(d) if d <= 60 => DelinquencyBucket::Days31To60,
        Some(d) if d <= 90 => DelinquencyBucket::Days61To90,
        Some(_) => DelinquencyBucket::Over90Days,
    }
}

/// Fill derived delinquency columns, order by `(loan_id, payment_date)` and
/// drop duplicate `repayment_id`s keeping the last occurrence.
pub fn normalize_repayments(events: Vec<RepaymentEvent>) -> Vec<RepaymentEvent> {
    let mut events: Vec<RepaymentEvent> = events
        .into_iter()
        .map(|mut e| {
            if e.days_past_due.is_none() {
                if let (Some(due), Some(paid)) = (e.due_date, e.payment_date) {
                    e.days_past_due = Some((paid - due).num_days());
                }
            }
            if e.delinquency_bucket.is_none() {
                e.delinquency_bucket = Some(classify_delinquency(e.days_past_due));
            }
            e
        })
        .collect();

    events.sort_by(|a, b| {
        a.loan_id
            .cmp(&b.loan_id)
            .then_with(|| nulls_last(a.payment_date).cmp(&nulls_last(b.payment_date)))
    });

    let last_index: HashMap<&str, usize> = events
        .iter()
        .enumerate()
        .map(|(i, e)| (e.repayment_id.as_str(), i))
        .collect();
    let keep: Vec<bool> = events
        .iter()
        .enumerate()
        .map(|(i, e)| last_index.get(e.repayment_id.as_str()) == Some(&i))
        .collect();

    events
        .into_iter()
        .zip(keep)
        .filter_map(|(e, k)| k.then_some(e))
        .collect()
}

/// Drop bureau scores outside the valid range.
pub fn validate_credit_score(score: Option<u32>) -> Option<u32> {
    match score {
        Some(s) if (MIN_VALID_CREDIT_SCORE..=MAX_VALID_CREDIT_SCORE).contains(&s) => Some(s),
        Some(s) => {
            tracing::warn!(score = s, "invalid credit score, treating as missing");
            None
        }
        None => None,
    }
}

/// Apply [`validate_credit_score`] to every bureau profile.
pub fn normalize_credit_profiles(profiles: Vec<CreditProfile>) -> Vec<CreditProfile> {
    profiles
        .into_iter()
        .map(|mut p| {
            p.credit_score = validate_credit_score(p.credit_score);
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RepaymentStatus;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn event(id: &str, loan: &str, paid: Option<NaiveDate>) -> RepaymentEvent {
        RepaymentEvent {
            repayment_id: id.into(),
            loan_id: loan.into(),
            customer_id: "C1".into(),
            due_date: date(2024, 1, 1),
            payment_date: paid,
            amount_paid: dec!(100),
            status: RepaymentStatus::Paid,
            days_past_due: None,
            delinquency_bucket: None,
            source_file: None,
        }
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify_delinquency(None), DelinquencyBucket::Unknown);
        assert_eq!(classify_delinquency(Some(-3)), DelinquencyBucket::Current);
        assert_eq!(classify_delinquency(Some(0)), DelinquencyBucket::Current);
        assert_eq!(classify_delinquency(Some(30)), DelinquencyBucket::Days1To30);
        assert_eq!(classify_delinquency(Some(31)), DelinquencyBucket::Days31To60);
        assert_eq!(classify_delinquency(Some(90)), DelinquencyBucket::Days61To90);
        assert_eq!(classify_delinquency(Some(91)), DelinquencyBucket::Over90Days);
    }

    #[test]
    fn test_normalize_derives_days_past_due() {
        let out = normalize_repayments(vec![event("R1", "L1", date(2024, 1, 15))]);
        assert_eq!(out[0].days_past_due, Some(14));
        assert_eq!(out[0].delinquency_bucket, Some(DelinquencyBucket::Days1To30));
    }

    #[test]
    fn test_normalize_missing_payment_date_is_unknown_bucket() {
        let out = normalize_repayments(vec![event("R1", "L1", None)]);
        assert_eq!(out[0].days_past_due, None);
        assert_eq!(out[0].delinquency_bucket, Some(DelinquencyBucket::Unknown));
    }

    #[test]
    fn test_normalize_sorts_and_dedups_keep_last() {
        let mut dup = event("R1", "L1", date(2024, 3, 1));
        dup.amount_paid = dec!(250);
        let out = normalize_repayments(vec![
            event("R2", "L2", date(2024, 1, 1)),
            event("R1", "L1", date(2024, 2, 1)),
            dup,
            event("R3", "L1", date(2024, 1, 10)),
        ]);
        let ids: Vec<&str> = out.iter().map(|e| e.repayment_id.as_str()).collect();
        assert_eq!(ids, vec!["R3", "R1", "R2"]);
        assert_eq!(out[1].amount_paid, dec!(250));
    }

    #[test]
    fn test_validate_credit_score_range() {
        assert_eq!(validate_credit_score(Some(720)), Some(720));
        assert_eq!(validate_credit_score(Some(50)), None);
        assert_eq!(validate_credit_score(Some(2500)), None);
        assert_eq!(validate_credit_score(None), None);
    }
}
