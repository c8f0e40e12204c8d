use nalgebra::Point2;
use tracing::debug;

use super::traits::PairContext;
use crate::decision::{Decision, MotionEstimate, MovementCause, StillReason};
use crate::homography::RansacEstimator;
use crate::matcher::RatioMatcher;

/// Final stage: match descriptors, fit a homography and read camera motion
/// off it. Always reaches a decision.
pub struct GeometryStage {
    matcher: RatioMatcher,
    estimator: RansacEstimator,
    min_matches: usize,
}

impl GeometryStage {
    pub fn new(matcher: RatioMatcher, estimator: RansacEstimator, min_matches: usize) -> Self {
        Self {
            matcher,
            estimator,
            min_matches,
        }
    }

    pub fn decide(&self, pair: &PairContext<'_, '_>) -> Decision {
        let prev = pair.prev_features();
        let curr = pair.curr_features();
        let matches = self
            .matcher
            .match_descriptors(&prev.descriptors, &curr.descriptors);
        let count = matches.len();

        // A fit needs strictly more than `min_matches` correspondences.
        if count <= self.min_matches {
            debug!(
                pair = pair.index,
                matches = count,
                min_matches = self.min_matches,
                "too few matches"
            );
            return Decision::Still(StillReason::TooFewMatches { matches: count });
        }

        let (src, dst): (Vec<_>, Vec<_>) = matches
            .iter()
            .map(|m| {
                let p = prev.keypoints[m.query_idx];
                let c = curr.keypoints[m.train_idx];
                (
                    Point2::new(p.x as f64, p.y as f64),
                    Point2::new(c.x as f64, c.y as f64),
                )
            })
            .unzip();

        let mut rng = self.estimator.rng_for(pair.index);
        let Some(fit) = self.estimator.estimate(&src, &dst, &mut rng) else {
            debug!(pair = pair.index, matches = count, "homography fit failed");
            return Decision::Still(StillReason::FitFailed { matches: count });
        };

        let estimate = MotionEstimate::from_homography(&fit.homography);
        debug!(
            pair = pair.index,
            matches = count,
            inliers = fit.inliers,
            iterations = fit.iterations,
            dx = format!("{:.2}", estimate.dx),
            dy = format!("{:.2}", estimate.dy),
            angle_deg = format!("{:.2}", estimate.angle_deg),
            "homography fitted"
        );

        if estimate.is_significant() {
            Decision::Movement(MovementCause::Geometry {
                estimate,
                matches: count,
                inliers: fit.inliers,
            })
        } else {
            Decision::Still(StillReason::BelowMotionThreshold {
                estimate,
                matches: count,
                inliers: fit.inliers,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FrameCache;
    use crate::features::OrbExtractor;
    use crate::params::{FeatureParams, RansacParams};
    use crate::testing::{crop, gray_frame, textured};

    fn stage(min_matches: usize) -> GeometryStage {
        GeometryStage::new(
            RatioMatcher::new(0.7),
            RansacEstimator::new(RansacParams::default()),
            min_matches,
        )
    }

    fn decide(stage: &GeometryStage, prev: &image::GrayImage, curr: &image::GrayImage) -> Decision {
        let frames = vec![gray_frame(0, prev), gray_frame(1, curr)];
        let cache = FrameCache::new(&frames);
        let extractor = OrbExtractor::new(FeatureParams::default());
        let ctx = PairContext::new(
            1,
            cache.entry(0).unwrap(),
            cache.entry(1).unwrap(),
            &extractor,
        );
        stage.decide(&ctx)
    }

    #[test]
    fn identical_frames_fit_identity() {
        let img = textured(240, 180, 11);
        match decide(&stage(10), &img, &img) {
            Decision::Still(StillReason::BelowMotionThreshold { estimate, .. }) => {
                assert!(estimate.dx.abs() < 0.5, "dx {}", estimate.dx);
                assert!(estimate.dy.abs() < 0.5, "dy {}", estimate.dy);
                assert!(estimate.angle_deg.abs() < 0.5);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn shifted_view_is_movement() {
        let base = textured(300, 220, 21);
        let prev = crop(&base, 20, 20, 240, 180);
        let curr = crop(&base, 32, 20, 240, 180);
        match decide(&stage(10), &prev, &curr) {
            Decision::Movement(MovementCause::Geometry { estimate, .. }) => {
                approx::assert_abs_diff_eq!(estimate.dx, -12.0, epsilon = 1.5);
                approx::assert_abs_diff_eq!(estimate.dy, 0.0, epsilon = 1.5);
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn match_count_must_exceed_minimum() {
        let img = textured(240, 180, 11);
        let features = OrbExtractor::new(FeatureParams::default()).extract(&img);
        let n = RatioMatcher::new(0.7)
            .match_descriptors(&features.descriptors, &features.descriptors)
            .len();
        assert!(n > 10, "only {n} matches");
        assert_eq!(
            decide(&stage(n), &img, &img),
            Decision::Still(StillReason::TooFewMatches { matches: n })
        );
        assert!(matches!(
            decide(&stage(n - 1), &img, &img),
            Decision::Still(StillReason::BelowMotionThreshold { .. })
        ));
    }
}
