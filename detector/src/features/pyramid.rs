use image::imageops::{self, FilterType};
use image::GrayImage;

pub struct PyramidLevel {
    pub image: GrayImage,
    /// Multiply level coordinates by this to get level-0 coordinates.
    pub scale: f32,
}

/// Downscaled copies of an image, finest first.
pub struct Pyramid {
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    /// Build up to `levels` levels, each `scale_factor` smaller than the
    /// previous. Levels narrower or shorter than `min_size` are not built;
    /// level 0 is always present.
    pub fn build(base: &GrayImage, levels: usize, scale_factor: f32, min_size: u32) -> Self {
        let (w, h) = base.dimensions();
        let mut out = vec![PyramidLevel {
            image: base.clone(),
            scale: 1.0,
        }];

        let mut scale = 1.0f32;
        for _ in 1..levels {
            scale *= scale_factor;
            let lw = (w as f32 / scale).round() as u32;
            let lh = (h as f32 / scale).round() as u32;
            if lw < min_size || lh < min_size {
                break;
            }
            out.push(PyramidLevel {
                image: imageops::resize(base, lw, lh, FilterType::Triangle),
                scale,
            });
        }
        Self { levels: out }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }
}

/// Split `total` features over `levels` levels so each level gets
/// `1 / scale_factor` of the previous level's share.
pub fn level_quotas(total: usize, levels: usize, scale_factor: f32) -> Vec<usize> {
    if levels == 0 {
        return Vec::new();
    }
    let factor = 1.0 / scale_factor as f64;
    let first = if levels == 1 {
        total as f64
    } else {
        total as f64 * (1.0 - factor) / (1.0 - factor.powi(levels as i32))
    };

    let mut quotas = Vec::with_capacity(levels);
    let mut assigned = 0usize;
    let mut share = first;
    for _ in 0..levels - 1 {
        let q = (share.round() as usize).min(total - assigned);
        quotas.push(q);
        assigned += q;
        share *= factor;
    }
    quotas.push(total - assigned);
    quotas
}
