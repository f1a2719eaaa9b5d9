//! Structural failures of the engine.
//!
//! Only faults that make a table unreadable live here. Missing columns and
//! empty tables are reported as data by `schema::validate`, and malformed
//! numeric text is defaulted by `numeric`, so neither ever becomes an
//! `EngineError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read CSV header row: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no sheets")]
    EmptyWorkbook,

    #[error("unsupported file format '{0}' (expected .csv, .xls, .xlsx, .xlsm, .xlsb or .ods)")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
