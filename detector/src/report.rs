use serde::Serialize;

use crate::decision::Decision;

/// Decision for the transition into frame `index` from frame `index - 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionReport {
    pub index: usize,
    pub decision: Decision,
}

/// Per-transition decisions for a whole sequence, in frame order.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub total_frames: usize,
    pub transitions: Vec<TransitionReport>,
}

impl DetectionReport {
    pub fn new(total_frames: usize, transitions: Vec<TransitionReport>) -> Self {
        Self {
            total_frames,
            transitions,
        }
    }

    pub fn movement_indices(&self) -> Vec<usize> {
        self.transitions
            .iter()
            .filter(|t| t.decision.is_movement())
            .map(|t| t.index)
            .collect()
    }

    pub fn movement_count(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.decision.is_movement())
            .count()
    }

    /// Flagged frames as a percentage of all frames; 0 for an empty sequence.
    pub fn movement_rate(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.movement_count() as f64 / self.total_frames as f64 * 100.0
    }

    pub fn summary(&self) -> DetectionSummary {
        DetectionSummary {
            total_frames: self.total_frames,
            movement_count: self.movement_count(),
            movement_rate: self.movement_rate(),
            movement_indices: self.movement_indices(),
        }
    }
}

/// Headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub total_frames: usize,
    pub movement_count: usize,
    pub movement_rate: f64,
    pub movement_indices: Vec<usize>,
}
