//! Per-transition decision pipeline: cheap gates first, geometry last.

pub mod difference;
pub mod features;
pub mod geometry;
pub mod traits;

pub use difference::DifferenceStage;
pub use features::FeatureStage;
pub use geometry::GeometryStage;
pub use traits::{PairContext, PairStage, StageOutcome};
