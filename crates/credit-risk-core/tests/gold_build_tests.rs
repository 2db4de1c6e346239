use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use credit_risk_core::config::PipelineConfig;
use credit_risk_core::dimensions::{DimCustomer, DimLoan};
use credit_risk_core::facts::FactLoanPerformance;
use credit_risk_core::kpi::{CustomerDrilldownKpi, PortfolioKpis, RegionalDelinquencyKpi};
use credit_risk_core::pipeline::run_gold_build;
use credit_risk_core::records::{
    ApprovalStatus, CreditProfile, DelinquencyBucket, LoanApplication, RepaymentEvent,
    RepaymentStatus,
};
use credit_risk_core::storage::{MemoryTableStore, TableStore};
use credit_risk_core::CreditRiskError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, month, day, 6, 0, 0).unwrap()
}

fn date(month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, month, day)
}

fn application(
    id: &str,
    customer: &str,
    address: &str,
    amount: Decimal,
    status: ApprovalStatus,
) -> LoanApplication {
    LoanApplication {
        application_id: id.into(),
        customer_id: customer.into(),
        full_name: Some(format!("Name {customer}")),
        email: Some(format!("{customer}@example.com")),
        phone_number: None,
        address: Some(address.into()),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 4, 2),
        loan_amount: Some(amount),
        loan_type: Some("Personal".into()),
        term_months: Some(12),
        interest_rate: Some(dec!(12)),
        approval_status: status,
        application_date: date(1, 1),
        approval_date: date(1, 3),
    }
}

fn bureau(customer: &str, score: u32) -> CreditProfile {
    CreditProfile {
        customer_id: customer.into(),
        ssn: Some("XXX-XX-6789".into()),
        credit_score: Some(score),
        total_open_loans: Some(1),
        total_defaults: Some(0),
        inquiries_last_6m: Some(1),
        effective_date: date(1, 2),
    }
}

fn repayment(
    id: &str,
    loan: &str,
    customer: &str,
    due: Option<NaiveDate>,
    paid: Option<NaiveDate>,
    amount: Decimal,
    status: RepaymentStatus,
) -> RepaymentEvent {
    RepaymentEvent {
        repayment_id: id.into(),
        loan_id: loan.into(),
        customer_id: customer.into(),
        due_date: due,
        payment_date: paid,
        amount_paid: amount,
        status,
        days_past_due: None,
        delinquency_bucket: None,
        source_file: Some("loan_repayments_20240301.csv".into()),
    }
}

fn seeded_store() -> MemoryTableStore {
    let config = PipelineConfig::default();
    let mut store = MemoryTableStore::new();
    let seeded = at(3, 1);

    store
        .insert(
            &config.silver.loan_applications,
            &[
                application("A1", "C1", "12 Elm St, Springfield, IL 62701", dec!(1200), ApprovalStatus::Approved),
                application("A2", "C2", "4 Main St, Austin, TX 73301", dec!(600), ApprovalStatus::Approved),
                application("A3", "C3", "nowhere", dec!(900), ApprovalStatus::Rejected),
            ],
            seeded,
        )
        .unwrap();
    store
        .insert(
            &config.silver.credit_bureau,
            &[bureau("C1", 720), bureau("C2", 580), bureau("C2", 5000)],
            seeded,
        )
        .unwrap();
    store
        .insert(
            &config.silver.loan_repayments,
            &[
                // deliberately out of order
                repayment("R2", "L1", "C1", date(2, 1), date(2, 1), dec!(100), RepaymentStatus::Paid),
                repayment("R1", "L1", "C1", date(1, 1), date(1, 1), dec!(100), RepaymentStatus::Paid),
                repayment("R3", "L2", "C2", date(1, 1), date(1, 21), dec!(50), RepaymentStatus::Late),
                repayment("R4", "L2", "C2", date(2, 1), None, dec!(0), RepaymentStatus::Missed),
                repayment("R5", "L3", "C3", date(1, 1), date(1, 1), dec!(75), RepaymentStatus::Paid),
            ],
            seeded,
        )
        .unwrap();
    store
}

// ===========================================================================
// End-to-end build
// ===========================================================================

#[test]
fn test_gold_build_writes_all_tables() {
    let config = PipelineConfig::default();
    let mut store = seeded_store();

    let output = run_gold_build(&config, &mut store, at(3, 15)).unwrap();
    let summary = &output.result;

    assert_eq!(summary.dim_customer_records, 3);
    assert_eq!(summary.dim_loan_records, 3);
    assert_eq!(summary.fact_loan_performance_records, 5);
    assert_eq!(summary.written.len(), 6);
    assert!(summary.written[0].ends_with("year=2024/month=03/day=15/data.jsonl"));

    // C3 has no bureau record; L3's customer has no approved application
    assert!(output.warnings.iter().any(|w| w.contains("no credit profile")));
    assert!(output.warnings.iter().any(|w| w.contains("no approved application")));
}

#[test]
fn test_gold_build_dimensions() {
    let config = PipelineConfig::default();
    let mut store = seeded_store();
    run_gold_build(&config, &mut store, at(3, 15)).unwrap();

    let customers: Vec<DimCustomer> = store.read_table(&config.dimensions.dim_customer).unwrap();
    let c2 = customers.iter().find(|c| c.customer_id == "C2").unwrap();
    // last bureau row wins, and its out-of-range score is dropped
    assert_eq!(c2.credit_score, None);
    let c1 = customers.iter().find(|c| c.customer_id == "C1").unwrap();
    assert_eq!(c1.credit_score, Some(720));

    let loans: Vec<DimLoan> = store.read_table(&config.dimensions.dim_loan).unwrap();
    let l3 = loans.iter().find(|l| l.loan_id == "L3").unwrap();
    assert!(!l3.has_approved_application);
    assert_eq!(l3.loan_amount, None);
}

#[test]
fn test_gold_build_facts_are_amortized_in_order() {
    let config = PipelineConfig::default();
    let mut store = seeded_store();
    run_gold_build(&config, &mut store, at(3, 15)).unwrap();

    let facts: Vec<FactLoanPerformance> =
        store.read_table(&config.facts.fact_loan_performance).unwrap();
    let ids: Vec<&str> = facts.iter().map(|f| f.repayment_id.as_str()).collect();
    assert_eq!(ids, vec!["R1", "R2", "R3", "R4", "R5"]);

    // L1: 1200 @ 12% -> 12 interest, 88 principal, then 11.12 / 88.88
    assert_eq!(facts[0].interest_paid, dec!(12));
    assert_eq!(facts[0].outstanding_balance, dec!(1112));
    assert_eq!(facts[1].interest_paid, dec!(11.12));
    assert_eq!(facts[1].principal_paid, dec!(88.88));
    assert_eq!(facts[1].outstanding_balance, dec!(1023.12));

    // R3 paid 20 days late
    assert_eq!(facts[2].days_past_due, Some(20));
    assert_eq!(facts[2].delinquency_bucket, Some(DelinquencyBucket::Days1To30));
    assert!(facts[3].is_defaulted);
    assert_eq!(facts[3].delinquency_bucket, Some(DelinquencyBucket::Unknown));

    // L3 has no loan terms: whole payment is principal
    assert_eq!(facts[4].principal_paid, dec!(75));
    assert_eq!(facts[4].outstanding_balance, Decimal::ZERO);
}

#[test]
fn test_gold_build_kpis() {
    let config = PipelineConfig::default();
    let mut store = seeded_store();
    let output = run_gold_build(&config, &mut store, at(3, 15)).unwrap();

    let portfolio: Vec<PortfolioKpis> = store.read_table(&config.kpis.portfolio).unwrap();
    assert_eq!(portfolio.len(), 1);
    assert_eq!(portfolio[0], output.result.portfolio);
    assert_eq!(portfolio[0].total_active_loans, 2);
    assert_eq!(portfolio[0].total_defaulted_loans, 1);
    assert_eq!(portfolio[0].default_rate_pct, dec!(50));
    // L1: 1200 - 200, L2: 600 - 50
    assert_eq!(portfolio[0].total_outstanding_balance, dec!(1550));
    assert_eq!(portfolio[0].exposure_at_default, dec!(550));

    let regional: Vec<RegionalDelinquencyKpi> =
        store.read_table(&config.kpis.regional_delinquency).unwrap();
    let regions: Vec<&str> = regional.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(regions, vec!["IL", "TX"]);

    let drilldown: Vec<CustomerDrilldownKpi> =
        store.read_table(&config.kpis.customer_drilldown).unwrap();
    let customers: Vec<&str> = drilldown.iter().map(|c| c.customer_id.as_str()).collect();
    assert_eq!(customers, vec!["C1", "C2"]);
    assert!(drilldown[1].is_defaulted);
}

#[test]
fn test_rerun_is_idempotent() {
    let config = PipelineConfig::default();
    let mut store = seeded_store();
    run_gold_build(&config, &mut store, at(3, 15)).unwrap();
    let second = run_gold_build(&config, &mut store, at(3, 16)).unwrap();

    assert_eq!(second.result.dim_customer_records, 3);
    assert_eq!(second.result.dim_loan_records, 3);
    assert_eq!(second.result.fact_loan_performance_records, 5);

    // day 15 and day 16 partitions both exist; day 16 holds the merged view
    let loans: Vec<DimLoan> = store
        .read_table(&format!("{}/year=2024/month=03/day=16", config.dimensions.dim_loan))
        .unwrap();
    assert_eq!(loans.len(), 3);
    assert!(loans.iter().all(|l| l.updated_date == at(3, 16)));
}

#[test]
fn test_missing_silver_dataset_is_fatal() {
    let config = PipelineConfig::default();
    let mut store = MemoryTableStore::new();
    store
        .insert(
            &config.silver.loan_applications,
            &[application("A1", "C1", "x, y", dec!(1), ApprovalStatus::Approved)],
            at(3, 1),
        )
        .unwrap();

    let err = run_gold_build(&config, &mut store, at(3, 15)).unwrap_err();
    match err {
        CreditRiskError::MissingInput { dataset } => assert_eq!(dataset, "loan_repayments"),
        other => panic!("expected MissingInput, got {other:?}"),
    }
    assert!(store.paths().all(|p| p.starts_with("silver/transformed")));
}
