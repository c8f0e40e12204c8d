use std::time::Instant;

use camera_motion_common::config::Config;
use camera_motion_common::frame::Frame;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cache::{FrameCache, FrameEntry};
use crate::cancel::CancelFlag;
use crate::decision::Decision;
use crate::error::{DetectError, Result};
use crate::features::OrbExtractor;
use crate::filter::{
    DifferenceStage, FeatureStage, GeometryStage, PairContext, PairStage, StageOutcome,
};
use crate::homography::RansacEstimator;
use crate::matcher::RatioMatcher;
use crate::params::DetectionParams;
use crate::report::{DetectionReport, TransitionReport};

/// Classifies each transition of a frame sequence as camera movement or not.
///
/// Holds no per-sequence state, so one classifier can serve any number of
/// sequences, including concurrently.
pub struct MovementClassifier {
    params: DetectionParams,
    extractor: OrbExtractor,
    gates: Vec<Box<dyn PairStage>>,
    geometry: GeometryStage,
}

impl MovementClassifier {
    pub fn new(params: DetectionParams) -> Result<Self> {
        params.validate()?;
        let gates: Vec<Box<dyn PairStage>> = vec![
            Box::new(DifferenceStage::new(params.diff_threshold)),
            Box::new(FeatureStage),
        ];
        let geometry = GeometryStage::new(
            RatioMatcher::new(params.match_threshold),
            RansacEstimator::new(params.ransac.clone()),
            params.min_matches,
        );
        Ok(Self {
            extractor: OrbExtractor::new(params.features.clone()),
            params,
            gates,
            geometry,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(DetectionParams::from_config(config))
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Positions of frames that differ from their predecessor by camera
    /// movement, ascending.
    pub fn detect(&self, frames: &[Frame]) -> Result<Vec<usize>> {
        Ok(self.analyze(frames)?.movement_indices())
    }

    pub fn analyze(&self, frames: &[Frame]) -> Result<DetectionReport> {
        self.analyze_with_cancel(frames, &CancelFlag::new())
    }

    /// Evaluate every transition, checking `cancel` before each one.
    pub fn analyze_with_cancel(
        &self,
        frames: &[Frame],
        cancel: &CancelFlag,
    ) -> Result<DetectionReport> {
        if frames.len() < 2 {
            debug!(frames = frames.len(), "nothing to compare");
            return Ok(DetectionReport::new(frames.len(), Vec::new()));
        }

        let started = Instant::now();
        let cache = FrameCache::new(frames);
        let evaluate = |index: usize| -> Result<TransitionReport> {
            if cancel.is_cancelled() {
                return Err(DetectError::Cancelled { pair: index });
            }
            let decision = self.evaluate_pair(&cache, index)?;
            Ok(TransitionReport { index, decision })
        };

        let transitions = match self.params.workers {
            1 => (1..frames.len())
                .map(evaluate)
                .collect::<Result<Vec<_>>>()?,
            workers => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()?;
                pool.install(|| {
                    (1..frames.len())
                        .into_par_iter()
                        .map(evaluate)
                        .collect::<Result<Vec<_>>>()
                })?
            }
        };

        let report = DetectionReport::new(frames.len(), transitions);
        info!(
            frames = report.total_frames,
            movements = report.movement_count(),
            rate = format!("{:.1}%", report.movement_rate()),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sequence analyzed"
        );
        Ok(report)
    }

    /// Decide a single transition. `index` is the position of `curr` and only
    /// labels the result and seeds the sampler.
    pub fn classify_pair(&self, index: usize, prev: &Frame, curr: &Frame) -> Result<Decision> {
        let prev = FrameEntry::new(prev);
        let curr = FrameEntry::new(curr);
        self.run_stages(&PairContext::new(index, &prev, &curr, &self.extractor))
    }

    fn evaluate_pair(&self, cache: &FrameCache<'_>, index: usize) -> Result<Decision> {
        match (cache.entry(index - 1), cache.entry(index)) {
            (Some(prev), Some(curr)) => {
                self.run_stages(&PairContext::new(index, prev, curr, &self.extractor))
            }
            _ => Err(DetectError::InvalidParameter(format!(
                "transition {index} is outside a sequence of {} frames",
                cache.len()
            ))),
        }
    }

    fn run_stages(&self, pair: &PairContext<'_, '_>) -> Result<Decision> {
        for gate in &self.gates {
            if let StageOutcome::Decided(decision) = gate.evaluate(pair)? {
                debug!(pair = pair.index, stage = gate.name(), ?decision, "decided");
                return Ok(decision);
            }
        }
        let decision = self.geometry.decide(pair);
        debug!(pair = pair.index, stage = "geometry", ?decision, "decided");
        Ok(decision)
    }
}
