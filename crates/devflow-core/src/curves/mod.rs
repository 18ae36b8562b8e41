pub mod factory;
pub mod presets;
pub mod skew_normal;

pub use factory::{generate_cumulative, generate_incremental, Curve, CurveKind, CurveParams, CurvePoint};
pub use presets::{catalog, CostProfile, LandPreset, PresetEntry, SalesProfile, ShapeParams, ShapePreset};
