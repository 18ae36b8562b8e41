pub mod perturbation;
pub mod simulation;
pub mod summary;

pub use perturbation::Perturbation;
pub use simulation::{
    DiscardedDraw, DrawInputs, MonteCarloEngine, PerturbationConfig, ScenarioDraw, SimulationResult,
};
pub use summary::{fan_chart, summarize, DistributionStats, FanChartBand, SimulationSummary};
