use tracing::debug;

use super::traits::{PairContext, PairStage, StageOutcome};
use crate::decision::{Decision, MovementCause};
use crate::error::{DetectError, Result};
use crate::gate::{mean_abs_diff, DifferenceGate};

/// Flags a transition outright when the mean absolute grayscale difference
/// exceeds the threshold. Cheap, so it runs before any feature work.
pub struct DifferenceStage {
    gate: DifferenceGate,
}

impl DifferenceStage {
    pub fn new(threshold: f64) -> Self {
        Self {
            gate: DifferenceGate::new(threshold),
        }
    }
}

impl PairStage for DifferenceStage {
    fn evaluate(&self, pair: &PairContext<'_, '_>) -> Result<StageOutcome> {
        let Some(mean_diff) = mean_abs_diff(pair.prev.gray(), pair.curr.gray()) else {
            return Err(DetectError::FrameMismatch {
                pair: pair.index,
                prev: pair.prev.frame().dimensions(),
                curr: pair.curr.frame().dimensions(),
            });
        };

        debug!(
            pair = pair.index,
            mean_diff = format!("{:.2}", mean_diff),
            threshold = self.gate.threshold(),
            "pixel difference"
        );

        if self.gate.exceeds(mean_diff) {
            return Ok(StageOutcome::Decided(Decision::Movement(
                MovementCause::PixelDifference { mean_diff },
            )));
        }
        Ok(StageOutcome::Defer)
    }

    fn name(&self) -> &str {
        "difference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FrameCache;
    use crate::features::OrbExtractor;
    use crate::params::FeatureParams;
    use crate::testing::flat_frame;

    fn run(stage: &DifferenceStage, a: u8, b: u8) -> Result<StageOutcome> {
        let frames = vec![flat_frame(0, 32, 24, a), flat_frame(1, 32, 24, b)];
        let cache = FrameCache::new(&frames);
        let extractor = OrbExtractor::new(FeatureParams::default());
        let ctx = PairContext::new(
            1,
            cache.entry(0).unwrap(),
            cache.entry(1).unwrap(),
            &extractor,
        );
        stage.evaluate(&ctx)
    }

    #[test]
    fn large_change_is_movement() {
        let stage = DifferenceStage::new(30.0);
        match run(&stage, 10, 210).unwrap() {
            StageOutcome::Decided(Decision::Movement(MovementCause::PixelDifference {
                mean_diff,
            })) => assert_eq!(mean_diff, 200.0),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn threshold_is_strict() {
        let stage = DifferenceStage::new(30.0);
        assert!(matches!(run(&stage, 100, 130).unwrap(), StageOutcome::Defer));
        assert!(matches!(
            run(&stage, 100, 131).unwrap(),
            StageOutcome::Decided(_)
        ));
    }

    #[test]
    fn size_change_is_an_error() {
        let frames = vec![flat_frame(0, 32, 24, 0), flat_frame(1, 16, 24, 0)];
        let cache = FrameCache::new(&frames);
        let extractor = OrbExtractor::new(FeatureParams::default());
        let ctx = PairContext::new(
            1,
            cache.entry(0).unwrap(),
            cache.entry(1).unwrap(),
            &extractor,
        );
        let err = DifferenceStage::new(30.0).evaluate(&ctx).unwrap_err();
        assert!(matches!(
            err,
            DetectError::FrameMismatch {
                pair: 1,
                prev: (32, 24),
                curr: (16, 24)
            }
        ));
    }
}
