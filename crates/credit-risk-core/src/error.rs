use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreditRiskError {
    #[error("Missing input: dataset '{dataset}' is absent or empty")]
    MissingInput { dataset: String },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Storage error at '{location}': {reason}")]
    Storage { location: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for CreditRiskError {
    fn from(e: serde_json::Error) -> Self {
        CreditRiskError::SerializationError(e.to_string())
    }
}

impl From<serde_yaml::Error> for CreditRiskError {
    fn from(e: serde_yaml::Error) -> Self {
        CreditRiskError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for CreditRiskError {
    fn from(e: std::io::Error) -> Self {
        CreditRiskError::Storage {
            location: String::new(),
            reason: e.to_string(),
        }
    }
}
