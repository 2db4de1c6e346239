//! Pipeline configuration.
//!
//! Built once per run (from YAML/JSON or defaults) and passed by reference
//! into the pipeline. Locations are relative to the table store root.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CreditRiskError;
use crate::CreditRiskResult;

/// Top-level configuration for a gold build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub silver: SilverInputs,
    pub dimensions: DimensionOutputs,
    pub facts: FactOutputs,
    pub kpis: KpiOutputs,
    /// Write outputs under `year=/month=/day=` partitions.
    pub partitioned: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            silver: SilverInputs::default(),
            dimensions: DimensionOutputs::default(),
            facts: FactOutputs::default(),
            kpis: KpiOutputs::default(),
            partitioned: true,
        }
    }
}

/// Transformed silver datasets read by the build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilverInputs {
    pub loan_applications: String,
    pub loan_repayments: String,
    pub credit_bureau: String,
}

impl Default for SilverInputs {
    fn default() -> Self {
        Self {
            loan_applications: "silver/transformed/loan_applications".to_string(),
            loan_repayments: "silver/transformed/loan_repayments".to_string(),
            credit_bureau: "silver/transformed/credit_bureau".to_string(),
        }
    }
}

/// Upserted dimension tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionOutputs {
    pub dim_customer: String,
    pub dim_loan: String,
}

impl Default for DimensionOutputs {
    fn default() -> Self {
        Self {
            dim_customer: "silver/dimensions/dim_customer".to_string(),
            dim_loan: "silver/dimensions/dim_loan".to_string(),
        }
    }
}

/// Upserted fact tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactOutputs {
    pub fact_loan_performance: String,
}

impl Default for FactOutputs {
    fn default() -> Self {
        Self {
            fact_loan_performance: "silver/facts/fact_loan_performance".to_string(),
        }
    }
}

/// KPI snapshot tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiOutputs {
    pub portfolio: String,
    pub regional_delinquency: String,
    pub customer_drilldown: String,
}

impl Default for KpiOutputs {
    fn default() -> Self {
        Self {
            portfolio: "gold/kpis/kpi_portfolio".to_string(),
            regional_delinquency: "gold/kpis/kpi_regional_delinquency".to_string(),
            customer_drilldown: "gold/kpis/kpi_customer_drilldown".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML (or JSON, which is valid YAML) document.
    pub fn from_yaml_str(contents: &str) -> CreditRiskResult<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> CreditRiskResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CreditRiskError::ConfigError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bucket_layout() {
        let config = PipelineConfig::default();
        assert!(config.partitioned);
        assert_eq!(config.dimensions.dim_loan, "silver/dimensions/dim_loan");
        assert_eq!(config.kpis.portfolio, "gold/kpis/kpi_portfolio");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "silver:\n  credit_bureau: bureau/latest\npartitioned: false\n";
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.silver.credit_bureau, "bureau/latest");
        assert_eq!(
            config.silver.loan_repayments,
            "silver/transformed/loan_repayments"
        );
        assert!(!config.partitioned);
    }

    #[test]
    fn test_json_config_accepted() {
        let config =
            PipelineConfig::from_yaml_str(r#"{"kpis": {"portfolio": "out/portfolio"}}"#).unwrap();
        assert_eq!(config.kpis.portfolio, "out/portfolio");
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let err = PipelineConfig::from_yaml_str("partitioned: [1, 2").unwrap_err();
        assert!(matches!(err, CreditRiskError::ConfigError(_)));
    }
}
