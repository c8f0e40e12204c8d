use crate::cache::FrameEntry;
use crate::decision::Decision;
use crate::error::Result;
use crate::features::{FeatureSet, OrbExtractor};

/// The two frames of one transition, with lazily computed per-frame data.
pub struct PairContext<'c, 'f> {
    /// Position of the current frame; the previous frame is `index - 1`.
    pub index: usize,
    pub prev: &'c FrameEntry<'f>,
    pub curr: &'c FrameEntry<'f>,
    extractor: &'c OrbExtractor,
}

impl<'c, 'f> PairContext<'c, 'f> {
    pub fn new(
        index: usize,
        prev: &'c FrameEntry<'f>,
        curr: &'c FrameEntry<'f>,
        extractor: &'c OrbExtractor,
    ) -> Self {
        Self {
            index,
            prev,
            curr,
            extractor,
        }
    }

    pub fn prev_features(&self) -> &'c FeatureSet {
        self.prev.features(self.extractor)
    }

    pub fn curr_features(&self) -> &'c FeatureSet {
        self.curr.features(self.extractor)
    }
}

/// Result of running one stage on a transition.
#[derive(Debug)]
pub enum StageOutcome {
    /// The stage settled the transition; later stages are skipped.
    Decided(Decision),
    /// Not enough evidence here, hand over to the next stage.
    Defer,
}

/// Early stage of the per-transition pipeline.
///
/// Stages run in order on each transition and may short-circuit it with a
/// final decision. Implementations are shared across worker threads.
pub trait PairStage: Send + Sync {
    fn evaluate(&self, pair: &PairContext<'_, '_>) -> Result<StageOutcome>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
