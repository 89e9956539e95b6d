use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetEngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount {cents} cents exceeds the maximum of {max} cents")]
    AmountExceedsMaximum { cents: i128, max: i64 },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Invalid configuration for {field}: {details}")]
    InvalidConfig { field: String, details: String },

    #[error("Snapshot rejected: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Import sink failed during {phase}: {details}")]
    Sink { phase: String, details: String },
}

pub type Result<T> = std::result::Result<T, BudgetEngineError>;
