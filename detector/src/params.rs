use camera_motion_common::config::Config;

use crate::error::{DetectError, Result};

/// How RANSAC seeds its sampler for each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Seed from this value mixed with the transition index. Results are
    /// reproducible and independent of evaluation order.
    Fixed(u64),
    /// Seed from OS entropy on every fit.
    Entropy,
}

#[derive(Debug, Clone)]
pub struct FeatureParams {
    /// Upper bound on keypoints per frame, split across pyramid levels.
    pub max_features: usize,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    pub levels: usize,
    pub scale_factor: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_features: 500,
            fast_threshold: 20,
            levels: 4,
            scale_factor: 1.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RansacParams {
    pub reproj_threshold: f64,
    pub max_iterations: usize,
    pub confidence: f64,
    pub seed: SeedPolicy,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reproj_threshold: 5.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: SeedPolicy::Fixed(1234),
        }
    }
}

/// Everything the classifier needs to evaluate a sequence.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    pub diff_threshold: f64,
    pub match_threshold: f32,
    pub min_matches: usize,
    pub features: FeatureParams,
    pub ransac: RansacParams,
    /// Worker threads. 0 = one per CPU, 1 = run on the calling thread.
    pub workers: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            diff_threshold: 30.0,
            match_threshold: 0.7,
            min_matches: 10,
            features: FeatureParams::default(),
            ransac: RansacParams::default(),
            workers: 1,
        }
    }
}

impl DetectionParams {
    /// Defaults with the three user-facing thresholds overridden.
    pub fn with_thresholds(diff_threshold: f64, match_threshold: f32, min_matches: usize) -> Self {
        Self {
            diff_threshold,
            match_threshold,
            min_matches,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let seed = if config.ransac.reproducible {
            SeedPolicy::Fixed(config.ransac.seed)
        } else {
            SeedPolicy::Entropy
        };
        Self {
            diff_threshold: config.detection.diff_threshold,
            match_threshold: config.detection.match_threshold,
            min_matches: config.detection.min_matches,
            features: FeatureParams {
                max_features: config.features.max_features,
                fast_threshold: config.features.fast_threshold,
                levels: config.features.levels,
                scale_factor: config.features.scale_factor,
            },
            ransac: RansacParams {
                reproj_threshold: config.ransac.reproj_threshold,
                max_iterations: config.ransac.max_iterations,
                confidence: config.ransac.confidence,
                seed,
            },
            workers: config.runtime.workers,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.diff_threshold.is_finite() && self.diff_threshold > 0.0) {
            return Err(DetectError::InvalidParameter(format!(
                "diff_threshold must be a positive number, got {}",
                self.diff_threshold
            )));
        }
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return Err(DetectError::InvalidParameter(format!(
                "match_threshold must be in (0, 1], got {}",
                self.match_threshold
            )));
        }
        if self.min_matches == 0 {
            return Err(DetectError::InvalidParameter(
                "min_matches must be at least 1".into(),
            ));
        }
        if self.features.levels == 0 {
            return Err(DetectError::InvalidParameter(
                "feature pyramid needs at least one level".into(),
            ));
        }
        if !(self.features.scale_factor.is_finite() && self.features.scale_factor > 1.0) {
            return Err(DetectError::InvalidParameter(format!(
                "pyramid scale_factor must be > 1, got {}",
                self.features.scale_factor
            )));
        }
        if !(self.ransac.reproj_threshold.is_finite() && self.ransac.reproj_threshold > 0.0) {
            return Err(DetectError::InvalidParameter(format!(
                "reproj_threshold must be > 0, got {}",
                self.ransac.reproj_threshold
            )));
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence < 1.0) {
            return Err(DetectError::InvalidParameter(format!(
                "ransac confidence must be in (0, 1), got {}",
                self.ransac.confidence
            )));
        }
        if self.ransac.max_iterations == 0 {
            return Err(DetectError::InvalidParameter(
                "ransac max_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DetectionParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_diff_threshold() {
        let params = DetectionParams::with_thresholds(0.0, 0.7, 10);
        assert!(matches!(
            params.validate(),
            Err(DetectError::InvalidParameter(_))
        ));
        let params = DetectionParams::with_thresholds(f64::NAN, 0.7, 10);
        assert!(params.validate().is_err());
    }

    #[test]
    fn match_threshold_bounds() {
        assert!(DetectionParams::with_thresholds(30.0, 1.0, 10)
            .validate()
            .is_ok());
        assert!(DetectionParams::with_thresholds(30.0, 0.0, 10)
            .validate()
            .is_err());
        assert!(DetectionParams::with_thresholds(30.0, 1.01, 10)
            .validate()
            .is_err());
    }

    #[test]
    fn rejects_zero_min_matches() {
        assert!(DetectionParams::with_thresholds(30.0, 0.7, 0)
            .validate()
            .is_err());
    }

    #[test]
    fn config_seed_policy() {
        let mut config = Config::default();
        assert_eq!(
            DetectionParams::from_config(&config).ransac.seed,
            SeedPolicy::Fixed(1234)
        );
        config.ransac.reproducible = false;
        assert_eq!(
            DetectionParams::from_config(&config).ransac.seed,
            SeedPolicy::Entropy
        );
    }
}
