pub mod financial;

pub use financial::{
    break_even_month, compute_metrics, drawdown_month, irr, max_drawdown, npv, FinancialMetrics,
};
