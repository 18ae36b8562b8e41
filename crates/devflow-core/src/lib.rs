pub mod cashflow;
pub mod curves;
pub mod error;
pub mod metrics;
pub mod project;
pub mod time_value;
pub mod types;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "sensitivity")]
pub mod scenarios;

pub use error::DevFlowError;
pub use types::*;

/// Standard result type for all devflow operations
pub type DevFlowResult<T> = Result<T, DevFlowError>;
