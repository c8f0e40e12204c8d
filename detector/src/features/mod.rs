//! ORB-style keypoints and binary descriptors.
//!
//! FAST-9 corners are found on every level of a small image pyramid, ranked
//! by Harris response, oriented by intensity centroid and described with a
//! steered 256-bit BRIEF pattern.

pub mod brief;
pub mod fast;
pub mod pyramid;

use image::imageops;
use image::GrayImage;
use tracing::trace;

use crate::params::FeatureParams;

use self::brief::BriefPattern;
use self::pyramid::{level_quotas, Pyramid};

/// Keypoints closer than this to an edge cannot be oriented or described.
pub const EDGE: u32 = 20;

/// Diameter of the oriented patch at level 0.
const PATCH_SIZE: f32 = 31.0;

/// Gaussian sigma applied before BRIEF sampling.
const DESCRIPTOR_BLUR_SIGMA: f32 = 2.0;

/// 256-bit binary descriptor.
pub type Descriptor = [u8; 32];

/// A detected keypoint in level-0 pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Orientation in radians, image coordinates (y down).
    pub angle: f32,
    /// Pyramid level the keypoint was detected on.
    pub octave: u8,
    /// Patch diameter in level-0 pixels.
    pub size: f32,
    /// Harris response on its level.
    pub response: f32,
}

/// Keypoints and their descriptors, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    fn push(&mut self, keypoint: Keypoint, descriptor: Descriptor) {
        self.keypoints.push(keypoint);
        self.descriptors.push(descriptor);
    }
}

/// Reusable keypoint detector and descriptor extractor.
///
/// Holds no per-image state, so one instance can serve many threads.
#[derive(Debug, Clone)]
pub struct OrbExtractor {
    params: FeatureParams,
    pattern: BriefPattern,
}

impl OrbExtractor {
    pub fn new(params: FeatureParams) -> Self {
        Self {
            params,
            pattern: BriefPattern::new(),
        }
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Detect and describe features. A featureless image yields an empty set.
    pub fn extract(&self, image: &GrayImage) -> FeatureSet {
        let mut features = FeatureSet::default();
        if self.params.max_features == 0 {
            return features;
        }

        let pyramid = Pyramid::build(
            image,
            self.params.levels,
            self.params.scale_factor,
            2 * EDGE + 1,
        );
        let quotas = level_quotas(
            self.params.max_features,
            pyramid.len(),
            self.params.scale_factor,
        );

        for (octave, (level, &quota)) in pyramid.levels().iter().zip(&quotas).enumerate() {
            if quota == 0 {
                continue;
            }
            let corners = fast::detect(&level.image, self.params.fast_threshold, EDGE);
            if corners.is_empty() {
                continue;
            }
            let found = corners.len();

            let mut ranked: Vec<(fast::Corner, f32)> = corners
                .into_iter()
                .map(|c| (c, fast::harris_response(&level.image, c.x, c.y)))
                .collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
            ranked.truncate(quota);

            let smoothed = imageops::blur(&level.image, DESCRIPTOR_BLUR_SIGMA);
            for (corner, response) in ranked {
                let angle = brief::orientation(&level.image, corner.x, corner.y);
                let descriptor = self.pattern.describe(&smoothed, corner.x, corner.y, angle);
                features.push(
                    Keypoint {
                        x: corner.x as f32 * level.scale,
                        y: corner.y as f32 * level.scale,
                        angle,
                        octave: octave as u8,
                        size: PATCH_SIZE * level.scale,
                        response,
                    },
                    descriptor,
                );
            }
            trace!(octave, found, quota, "pyramid level processed");
        }
        features
    }
}
