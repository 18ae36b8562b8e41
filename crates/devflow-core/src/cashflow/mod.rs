pub mod land;
pub mod ledger;

pub use land::{LandInstallment, LandPaymentPlan};
pub use ledger::{build_from_params, build_monthly_cashflow, CashflowLedger, LedgerRow};
