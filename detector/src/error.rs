/// Errors surfaced by the detector.
///
/// Insufficient signal (no features, too few matches, failed fit) is not an
/// error; it is reported as a `Decision::Still` outcome.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error(
        "frame size changed at transition {pair}: {}x{} -> {}x{}",
        .prev.0, .prev.1, .curr.0, .curr.1
    )]
    FrameMismatch {
        pair: usize,
        prev: (u32, u32),
        curr: (u32, u32),
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("detection cancelled before transition {pair}")]
    Cancelled { pair: usize },
}

pub type Result<T> = std::result::Result<T, DetectError>;
