/// Number of interleaved samples per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Single intensity sample.
    Gray,
    /// Interleaved R, G, B samples.
    Rgb,
}

impl Channels {
    pub fn count(self) -> usize {
        match self {
            Channels::Gray => 1,
            Channels::Rgb => 3,
        }
    }

    fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Channels::Gray),
            3 => Some(Channels::Rgb),
            _ => None,
        }
    }
}

/// A decoded video frame or still image.
///
/// Samples are 8-bit, row-major, with `channels` interleaved samples per
/// pixel. `index` is the frame's position in the decoded sequence and is only
/// used for diagnostics; the detector addresses frames by slice position.
///
/// Frames are validated on construction, so a `Frame` always has non-zero
/// dimensions and exactly `width * height * channels` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    index: usize,
    width: u32,
    height: u32,
    channels: Channels,
    data: Vec<u8>,
}

impl Frame {
    /// Build a frame from raw interleaved samples.
    pub fn new(
        index: usize,
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }
        let channels =
            Channels::from_count(channels).ok_or(FrameError::UnsupportedChannels(channels))?;
        let expected = width as usize * height as usize * channels.count();
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                got: data.len(),
                expected,
            });
        }
        Ok(Self {
            index,
            width,
            height,
            channels,
            data,
        })
    }

    /// Build an RGB frame (3 samples per pixel).
    pub fn rgb(index: usize, width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(index, width, height, 3, data)
    }

    /// Build a single-channel frame.
    pub fn gray(index: usize, width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        Self::new(index, width, height, 1, data)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Raw interleaved samples.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame has zero dimension ({width}x{height})")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),
    #[error("frame data length {got} does not match dimensions (expected {expected})")]
    LengthMismatch { got: usize, expected: usize },
}
