//! Camera movement detection over ordered frame sequences.
//!
//! Each transition between consecutive frames passes through a pixel
//! difference gate and, when that is inconclusive, through ORB feature
//! matching and a RANSAC homography fit whose translation and rotation
//! decide whether the camera moved.

pub mod cache;
pub mod cancel;
pub mod classifier;
pub mod decision;
pub mod error;
pub mod features;
pub mod filter;
pub mod gate;
pub mod gray;
pub mod homography;
pub mod matcher;
pub mod params;
pub mod report;

#[cfg(test)]
mod testing;

pub use camera_motion_common::frame::Frame;
pub use cancel::CancelFlag;
pub use classifier::MovementClassifier;
pub use decision::{Decision, MotionEstimate, MovementCause, StillReason};
pub use error::{DetectError, Result};
pub use params::DetectionParams;
pub use report::{DetectionReport, DetectionSummary, TransitionReport};

/// Positions of frames reached through camera movement, ascending.
///
/// Runs sequentially with default feature and RANSAC settings. Sequences of
/// zero or one frame yield an empty list. Thresholds are checked before any
/// frame is looked at.
pub fn detect_movement(
    frames: &[Frame],
    diff_threshold: f64,
    match_threshold: f32,
    min_matches: usize,
) -> Result<Vec<usize>> {
    let params = DetectionParams::with_thresholds(diff_threshold, match_threshold, min_matches);
    MovementClassifier::new(params)?.detect(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::flat_frame;

    #[test]
    fn invalid_threshold_fails_before_frames_are_read() {
        assert!(matches!(
            detect_movement(&[], -1.0, 0.7, 10),
            Err(DetectError::InvalidParameter(_))
        ));
    }

    #[test]
    fn flags_the_frame_after_a_jump() {
        let frames: Vec<Frame> = [50, 50, 50, 250, 250]
            .iter()
            .enumerate()
            .map(|(i, &v)| flat_frame(i, 80, 60, v))
            .collect();
        assert_eq!(detect_movement(&frames, 30.0, 0.7, 10).unwrap(), vec![3]);
    }
}
