use tracing::debug;

use super::traits::{PairContext, PairStage, StageOutcome};
use crate::decision::{Decision, StillReason};
use crate::error::Result;

/// Settles the transition as still when either frame has no keypoints,
/// since nothing can be matched.
pub struct FeatureStage;

impl PairStage for FeatureStage {
    fn evaluate(&self, pair: &PairContext<'_, '_>) -> Result<StageOutcome> {
        let prev = pair.prev_features().len();
        let curr = pair.curr_features().len();
        debug!(pair = pair.index, prev, curr, "features extracted");

        if prev == 0 || curr == 0 {
            return Ok(StageOutcome::Decided(Decision::Still(
                StillReason::NoFeatures { prev, curr },
            )));
        }
        Ok(StageOutcome::Defer)
    }

    fn name(&self) -> &str {
        "features"
    }
}
