use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Descriptor;

/// Radius of the circular patch used for the intensity centroid.
pub const ORIENTATION_RADIUS: i32 = 15;

/// Sample points lie in a (2 * PAIR_EXTENT + 1)^2 window before rotation.
const PAIR_EXTENT: i32 = 13;

const DESCRIPTOR_BITS: usize = 256;

/// Seed for the comparison layout; changing it invalidates stored descriptors.
const PATTERN_SEED: u64 = 0x0b5e_55ed_b12e_f000;

/// Patch orientation from the intensity centroid, in radians.
///
/// The caller must keep `(x, y)` at least `ORIENTATION_RADIUS` pixels from
/// every edge.
pub fn orientation(image: &GrayImage, x: u32, y: u32) -> f32 {
    let stride = image.width() as i64;
    let data = image.as_raw();
    let (cx, cy) = (x as i64, y as i64);

    let mut m10 = 0i64;
    let mut m01 = 0i64;
    for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
        let span = ((ORIENTATION_RADIUS * ORIENTATION_RADIUS - dy * dy) as f32).sqrt() as i32;
        let row = (cy + dy as i64) * stride;
        for dx in -span..=span {
            let v = data[(row + cx + dx as i64) as usize] as i64;
            m10 += dx as i64 * v;
            m01 += dy as i64 * v;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}

/// Fixed layout of intensity comparisons for steered BRIEF.
#[derive(Debug, Clone)]
pub struct BriefPattern {
    pairs: Vec<[i8; 4]>,
}

impl BriefPattern {
    pub fn new() -> Self {
        Self::from_seed(PATTERN_SEED)
    }

    pub fn from_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut pairs = Vec::with_capacity(DESCRIPTOR_BITS);
        while pairs.len() < DESCRIPTOR_BITS {
            let pair = [
                rng.gen_range(-PAIR_EXTENT..=PAIR_EXTENT) as i8,
                rng.gen_range(-PAIR_EXTENT..=PAIR_EXTENT) as i8,
                rng.gen_range(-PAIR_EXTENT..=PAIR_EXTENT) as i8,
                rng.gen_range(-PAIR_EXTENT..=PAIR_EXTENT) as i8,
            ];
            if pair[0] != pair[2] || pair[1] != pair[3] {
                pairs.push(pair);
            }
        }
        Self { pairs }
    }

    /// Largest distance from the keypoint any rotated sample can reach.
    pub fn reach() -> i32 {
        (PAIR_EXTENT as f32 * std::f32::consts::SQRT_2).ceil() as i32
    }

    /// Compute the descriptor of `(x, y)` on a pre-smoothed image, with the
    /// sampling layout rotated by `angle`.
    ///
    /// The caller must keep `(x, y)` at least `reach()` pixels from every edge.
    pub fn describe(&self, smoothed: &GrayImage, x: u32, y: u32, angle: f32) -> Descriptor {
        let stride = smoothed.width() as i32;
        let data = smoothed.as_raw();
        let (sin, cos) = angle.sin_cos();
        let sample = |px: i8, py: i8| {
            let (px, py) = (px as f32, py as f32);
            let rx = (cos * px - sin * py).round() as i32;
            let ry = (sin * px + cos * py).round() as i32;
            data[((y as i32 + ry) * stride + x as i32 + rx) as usize]
        };

        let mut descriptor = [0u8; 32];
        for (bit, pair) in self.pairs.iter().enumerate() {
            if sample(pair[0], pair[1]) < sample(pair[2], pair[3]) {
                descriptor[bit / 8] |= 1 << (bit % 8);
            }
        }
        descriptor
    }
}

impl Default for BriefPattern {
    fn default() -> Self {
        Self::new()
    }
}
