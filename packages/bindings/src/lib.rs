use napi::Result as NapiResult;
use napi_derive::napi;

use credit_risk_core::api::{self, AmortizationInput, FactInput, KpiInput, ScheduleInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Amortization and facts
// ---------------------------------------------------------------------------

#[napi]
pub fn amortize(input_json: String) -> NapiResult<String> {
    let input: AmortizationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::amortize(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortize_schedule(input_json: String) -> NapiResult<String> {
    let input: ScheduleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::amortize_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_fact_loan_performance(input_json: String) -> NapiResult<String> {
    let input: FactInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::fact_loan_performance(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

#[napi]
pub fn portfolio_kpis(input_json: String) -> NapiResult<String> {
    let input: KpiInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::portfolio_kpis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn regional_delinquency_kpis(input_json: String) -> NapiResult<String> {
    let input: KpiInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::regional_delinquency_kpis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn customer_drilldown_kpis(input_json: String) -> NapiResult<String> {
    let input: KpiInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::customer_drilldown_kpis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn all_kpis(input_json: String) -> NapiResult<String> {
    let input: KpiInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::all_kpis(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn region_from_address(address: String) -> String {
    credit_risk_core::kpi::region_from_address(Some(&address))
}
