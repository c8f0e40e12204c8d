use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Top-level configuration. Every section is optional; an empty file yields
/// the same values as `Config::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionConfig,
    pub features: FeatureConfig,
    pub ransac: RansacConfig,
    pub runtime: RuntimeConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Mean absolute grayscale difference above which a pair is movement.
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f64,
    /// Lowe ratio for accepting the nearest descriptor match.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// A homography is only fitted when more matches than this survive.
    #[serde(default = "default_min_matches")]
    pub min_matches: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_fast_threshold")]
    pub fast_threshold: u8,
    #[serde(default = "default_levels")]
    pub levels: usize,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RansacConfig {
    /// Maximum reprojection error (pixels) for a correspondence to count as an inlier.
    #[serde(default = "default_reproj_threshold")]
    pub reproj_threshold: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Seed sampling from `seed` (true) or from OS entropy (false).
    #[serde(default = "default_reproducible")]
    pub reproducible: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads for evaluating transitions. 0 = one per CPU.
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
    /// Stop decoding after this many frames. 0 = unlimited.
    #[serde(default)]
    pub max_frames: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            diff_threshold: default_diff_threshold(),
            match_threshold: default_match_threshold(),
            min_matches: default_min_matches(),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            fast_threshold: default_fast_threshold(),
            levels: default_levels(),
            scale_factor: default_scale_factor(),
        }
    }
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reproj_threshold: default_reproj_threshold(),
            max_iterations: default_max_iterations(),
            confidence: default_confidence(),
            reproducible: default_reproducible(),
            seed: default_seed(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            max_frames: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.detection;
        if !(d.diff_threshold.is_finite() && d.diff_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "detection.diff_threshold must be > 0, got {}",
                d.diff_threshold
            )));
        }
        if !(d.match_threshold > 0.0 && d.match_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "detection.match_threshold must be in (0, 1], got {}",
                d.match_threshold
            )));
        }
        if d.min_matches == 0 {
            return Err(ConfigError::Invalid(
                "detection.min_matches must be >= 1".into(),
            ));
        }

        let f = &self.features;
        if f.levels == 0 {
            return Err(ConfigError::Invalid("features.levels must be >= 1".into()));
        }
        if !(f.scale_factor > 1.0 && f.scale_factor.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "features.scale_factor must be > 1, got {}",
                f.scale_factor
            )));
        }

        let r = &self.ransac;
        if !(r.reproj_threshold.is_finite() && r.reproj_threshold > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "ransac.reproj_threshold must be > 0, got {}",
                r.reproj_threshold
            )));
        }
        if !(r.confidence > 0.0 && r.confidence < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "ransac.confidence must be in (0, 1), got {}",
                r.confidence
            )));
        }
        if r.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "ransac.max_iterations must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_diff_threshold() -> f64 {
    30.0
}
fn default_match_threshold() -> f32 {
    0.7
}
fn default_min_matches() -> usize {
    10
}
fn default_max_features() -> usize {
    500
}
fn default_fast_threshold() -> u8 {
    20
}
fn default_levels() -> usize {
    4
}
fn default_scale_factor() -> f32 {
    1.2
}
fn default_reproj_threshold() -> f64 {
    5.0
}
fn default_max_iterations() -> usize {
    2000
}
fn default_confidence() -> f64 {
    0.995
}
fn default_reproducible() -> bool {
    true
}
fn default_seed() -> u64 {
    1234
}
fn default_ffmpeg() -> String {
    "ffmpeg".into()
}
fn default_ffprobe() -> String {
    "ffprobe".into()
}
fn default_log_level() -> String {
    "info".into()
}
