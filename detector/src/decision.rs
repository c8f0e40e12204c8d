use serde::Serialize;

use crate::homography::Homography;

/// Translation (pixels) above which a fitted homography counts as movement.
pub const TRANSLATION_LIMIT_PX: f64 = 5.0;

/// Rotation (degrees) above which a fitted homography counts as movement.
pub const ROTATION_LIMIT_DEG: f64 = 2.0;

/// Camera motion read off a homography.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionEstimate {
    pub dx: f64,
    pub dy: f64,
    pub angle_deg: f64,
}

impl MotionEstimate {
    pub fn from_homography(h: &Homography) -> Self {
        let (dx, dy) = h.translation();
        Self {
            dx,
            dy,
            angle_deg: h.rotation_degrees(),
        }
    }

    pub fn is_significant(&self) -> bool {
        self.dx.abs() > TRANSLATION_LIMIT_PX
            || self.dy.abs() > TRANSLATION_LIMIT_PX
            || self.angle_deg.abs() > ROTATION_LIMIT_DEG
    }
}

/// Which signal flagged a transition as camera movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum MovementCause {
    PixelDifference {
        mean_diff: f64,
    },
    Geometry {
        estimate: MotionEstimate,
        matches: usize,
        inliers: usize,
    },
}

/// Why a transition was not flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StillReason {
    /// One of the frames produced no keypoints.
    NoFeatures { prev: usize, curr: usize },
    /// Not more than `min_matches` correspondences survived the ratio test.
    TooFewMatches { matches: usize },
    /// RANSAC found no usable homography.
    FitFailed { matches: usize },
    /// The fitted motion stayed inside the translation and rotation limits.
    BelowMotionThreshold {
        estimate: MotionEstimate,
        matches: usize,
        inliers: usize,
    },
}

/// Verdict for one transition between consecutive frames.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Decision {
    Movement(MovementCause),
    Still(StillReason),
}

impl Decision {
    pub fn is_movement(&self) -> bool {
        matches!(self, Decision::Movement(_))
    }
}
