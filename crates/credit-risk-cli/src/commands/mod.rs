pub mod amortize;
pub mod build;
pub mod kpis;
pub mod region;
