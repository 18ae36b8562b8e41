use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevFlowError {
    #[error("Invalid parameter: {field} — {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Numerical failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    NumericalFailure {
        function: String,
        iterations: u32,
        last_delta: f64,
    },

    #[error("Simulation failure: {discarded} of {attempted} draws discarded (limit {max_failure_rate})")]
    SimulationFailure {
        discarded: usize,
        attempted: usize,
        max_failure_rate: f64,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DevFlowError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DevFlowError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DevFlowError {
    fn from(e: serde_json::Error) -> Self {
        DevFlowError::SerializationError(e.to_string())
    }
}
