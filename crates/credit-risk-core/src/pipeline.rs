//! Silver → gold build: dimensions, facts and KPI snapshots.
//!
//! Runs to completion in a fixed order. Any read or write failure aborts the
//! run; tables already written are left in place.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::dimensions::{build_dim_customer, build_dim_loan, DimCustomer, DimLoan};
use crate::facts::{build_fact_loan_performance, upsert_facts};
use crate::kpi::{calculate_all_kpis, PortfolioKpis};
use crate::quality;
use crate::records::{CreditProfile, LoanApplication, RepaymentEvent};
use crate::silver::{normalize_credit_profiles, normalize_repayments};
use crate::storage::{read_dataset, TableStore};
use crate::types::{with_metadata, ComputationOutput};
use crate::upsert::upsert;
use crate::CreditRiskResult;

/// Record counts and output locations of a completed build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldBuildSummary {
    pub dim_customer_records: usize,
    pub dim_loan_records: usize,
    pub fact_loan_performance_records: usize,
    pub regional_delinquency_records: usize,
    pub customer_drilldown_records: usize,
    pub portfolio: PortfolioKpis,
    pub written: Vec<String>,
}

/// Run the full gold build against `store` as of `now`.
pub fn run_gold_build<S: TableStore>(
    config: &PipelineConfig,
    store: &mut S,
    now: DateTime<Utc>,
) -> CreditRiskResult<ComputationOutput<GoldBuildSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // 1. Silver inputs
    tracing::info!("[1/5] loading silver datasets");
    let applications: Vec<LoanApplication> =
        read_dataset(store, &config.silver.loan_applications, "loan_applications")?;
    let repayments: Vec<RepaymentEvent> =
        read_dataset(store, &config.silver.loan_repayments, "loan_repayments")?;
    let credit_bureau: Vec<CreditProfile> =
        read_dataset(store, &config.silver.credit_bureau, "credit_bureau")?;

    let repayments = normalize_repayments(repayments);
    let credit_bureau = normalize_credit_profiles(credit_bureau);

    // 2. Dimensions
    tracing::info!("[2/5] building dimensions");
    let dim_customer: Vec<DimCustomer> = upsert(
        store,
        &config.dimensions.dim_customer,
        build_dim_customer(&applications, &credit_bureau, now),
    )?;
    let dim_loan: Vec<DimLoan> = upsert(
        store,
        &config.dimensions.dim_loan,
        build_dim_loan(&repayments, &applications, now),
    )?;
    warnings.extend(quality::check_dimensions(&dim_customer, &dim_loan));

    // 3. Facts
    tracing::info!("[3/5] building fact table");
    warnings.extend(quality::check_repayments(&repayments, &dim_loan));
    let facts = upsert_facts(
        store,
        &config.facts.fact_loan_performance,
        build_fact_loan_performance(&repayments, &dim_loan, now),
    )?;

    // 4. KPIs
    tracing::info!("[4/5] calculating KPIs");
    let kpis = calculate_all_kpis(&facts, &dim_customer, &dim_loan, now);

    // 5. Writes
    tracing::info!("[5/5] writing tables");
    let partitioned = config.partitioned;
    let written = vec![
        store.write_table(&config.dimensions.dim_customer, &dim_customer, partitioned, now)?,
        store.write_table(&config.dimensions.dim_loan, &dim_loan, partitioned, now)?,
        store.write_table(&config.facts.fact_loan_performance, &facts, partitioned, now)?,
        store.write_table(
            &config.kpis.portfolio,
            std::slice::from_ref(&kpis.portfolio),
            partitioned,
            now,
        )?,
        store.write_table(
            &config.kpis.regional_delinquency,
            &kpis.regional_delinquency,
            partitioned,
            now,
        )?,
        store.write_table(
            &config.kpis.customer_drilldown,
            &kpis.customer_drilldown,
            partitioned,
            now,
        )?,
    ];

    let summary = GoldBuildSummary {
        dim_customer_records: dim_customer.len(),
        dim_loan_records: dim_loan.len(),
        fact_loan_performance_records: facts.len(),
        regional_delinquency_records: kpis.regional_delinquency.len(),
        customer_drilldown_records: kpis.customer_drilldown.len(),
        portfolio: kpis.portfolio,
        written,
    };
    tracing::info!(
        dim_customer = summary.dim_customer_records,
        dim_loan = summary.dim_loan_records,
        facts = summary.fact_loan_performance_records,
        "gold build completed"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "as_of": now.to_rfc3339(),
        "active_loans": "DimLoan.approval_status == APPROVED",
        "loss_given_default": crate::kpi::LOSS_GIVEN_DEFAULT.to_string(),
        "npl_days_past_due": crate::kpi::NPL_DAYS_PAST_DUE,
        "partitioned": partitioned,
    });

    Ok(with_metadata(
        "Silver to Gold Credit Risk Build (dimensions, amortized facts, portfolio KPIs)",
        &assumptions,
        warnings,
        elapsed,
        summary,
    ))
}
