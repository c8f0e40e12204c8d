use std::sync::OnceLock;

use camera_motion_common::frame::Frame;
use image::GrayImage;

use crate::features::{FeatureSet, OrbExtractor};
use crate::gray::to_gray;

/// Lazily computed per-frame data. Each value is computed at most once,
/// even when two workers evaluate the transitions on both sides of a frame.
pub struct FrameEntry<'f> {
    frame: &'f Frame,
    gray: OnceLock<GrayImage>,
    features: OnceLock<FeatureSet>,
}

impl<'f> FrameEntry<'f> {
    pub fn new(frame: &'f Frame) -> Self {
        Self {
            frame,
            gray: OnceLock::new(),
            features: OnceLock::new(),
        }
    }

    pub fn frame(&self) -> &Frame {
        self.frame
    }

    pub fn gray(&self) -> &GrayImage {
        self.gray.get_or_init(|| to_gray(self.frame))
    }

    pub fn features(&self, extractor: &OrbExtractor) -> &FeatureSet {
        self.features.get_or_init(|| extractor.extract(self.gray()))
    }
}

/// Read-only cache over a frame sequence, indexed by position.
pub struct FrameCache<'f> {
    entries: Vec<FrameEntry<'f>>,
}

impl<'f> FrameCache<'f> {
    pub fn new(frames: &'f [Frame]) -> Self {
        Self {
            entries: frames.iter().map(FrameEntry::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, position: usize) -> Option<&FrameEntry<'f>> {
        self.entries.get(position)
    }
}
