use image::GrayImage;

/// Mean absolute per-pixel difference between two equally sized images.
///
/// Returns `None` when the dimensions differ.
pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> Option<f64> {
    if a.dimensions() != b.dimensions() {
        return None;
    }
    let total: u64 = a
        .iter()
        .zip(b.iter())
        .map(|(&p, &q)| p.abs_diff(q) as u64)
        .sum();
    Some(total as f64 / a.len() as f64)
}

/// Coarse movement test on raw pixel change.
///
/// Catches whip pans, cuts and occlusions without touching features. A pair
/// is flagged when its mean absolute difference strictly exceeds `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct DifferenceGate {
    threshold: f64,
}

impl DifferenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn exceeds(&self, mean_diff: f64) -> bool {
        mean_diff > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn identical_images_have_zero_difference() {
        let img = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 16 + y) as u8]));
        assert_eq!(mean_abs_diff(&img, &img), Some(0.0));
    }

    #[test]
    fn difference_is_symmetric_and_averaged() {
        let a = GrayImage::from_pixel(4, 4, Luma([10]));
        let mut b = a.clone();
        // Half the pixels differ by 40.
        for y in 0..2 {
            for x in 0..4 {
                b.put_pixel(x, y, Luma([50]));
            }
        }
        assert_eq!(mean_abs_diff(&a, &b), Some(20.0));
        assert_eq!(mean_abs_diff(&b, &a), Some(20.0));
    }

    #[test]
    fn size_mismatch_is_none() {
        let a = GrayImage::new(4, 4);
        let b = GrayImage::new(4, 5);
        assert_eq!(mean_abs_diff(&a, &b), None);
    }

    #[test]
    fn gate_is_strict() {
        let gate = DifferenceGate::new(30.0);
        assert!(!gate.exceeds(30.0));
        assert!(gate.exceeds(30.0001));
        assert!(!gate.exceeds(0.0));
    }
}
