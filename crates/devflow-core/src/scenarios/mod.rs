pub mod sensitivity;

pub use sensitivity::{run_price_cost_sensitivity, SensitivityOutput, SensitivityRequest};
