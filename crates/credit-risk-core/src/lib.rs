pub mod amortization;
pub mod api;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod facts;
pub mod kpi;
pub mod pipeline;
pub mod quality;
pub mod records;
pub mod silver;
pub mod storage;
pub mod types;
pub mod upsert;

pub use error::CreditRiskError;
pub use types::*;

/// Standard result type for all credit-risk operations
pub type CreditRiskResult<T> = Result<T, CreditRiskError>;
