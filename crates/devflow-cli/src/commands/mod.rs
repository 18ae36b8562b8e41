pub mod cashflow;
pub mod curve;
pub mod monte_carlo;
pub mod presets;
pub mod sensitivity;
