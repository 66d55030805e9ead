use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlannerError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PlannerError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
