//! Robust planar homography estimation.
//!
//! Hypotheses come from the normalized direct linear transform on four
//! correspondences; RANSAC picks the hypothesis with the most inliers and the
//! final model is refitted on all of them.

use nalgebra::{Matrix3, Point2, SMatrix, SymmetricEigen, Vector3};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::params::{RansacParams, SeedPolicy};

const SAMPLE_SIZE: usize = 4;

/// Below this |sin| between two sample edges, three points count as collinear.
const COLLINEAR_SIN: f64 = 1e-3;

const EPS: f64 = 1e-12;

/// A 3x3 projective transform from previous-frame to current-frame pixels,
/// normalized so that `H[2][2] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    /// Normalize an arbitrary-scale matrix. Fails when `H[2][2]` vanishes or
    /// any entry is not finite.
    pub fn from_matrix(m: Matrix3<f64>) -> Option<Self> {
        let w = m[(2, 2)];
        if !w.is_finite() || w.abs() < EPS {
            return None;
        }
        let h = m / w;
        h.iter().all(|v| v.is_finite()).then_some(Self(h))
    }

    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.0[(row, col)]
    }

    pub fn project(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        let v = self.0 * Vector3::new(p.x, p.y, 1.0);
        if v.z.abs() < EPS {
            return None;
        }
        Some(Point2::new(v.x / v.z, v.y / v.z))
    }

    /// Translation terms `(H[0][2], H[1][2])`.
    pub fn translation(&self) -> (f64, f64) {
        (self.0[(0, 2)], self.0[(1, 2)])
    }

    /// In-plane rotation from the upper-left block, in degrees.
    pub fn rotation_degrees(&self) -> f64 {
        self.0[(1, 0)].atan2(self.0[(0, 0)]).to_degrees()
    }
}

/// Outcome of a successful robust fit.
#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub homography: Homography,
    pub inliers: usize,
    pub iterations: usize,
}

/// RANSAC homography estimator. Stateless apart from its configuration.
#[derive(Debug, Clone)]
pub struct RansacEstimator {
    params: RansacParams,
}

impl RansacEstimator {
    pub fn new(params: RansacParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RansacParams {
        &self.params
    }

    /// Sampler for one transition according to the seed policy.
    pub fn rng_for(&self, pair: usize) -> StdRng {
        match self.params.seed {
            SeedPolicy::Fixed(seed) => {
                StdRng::seed_from_u64(seed ^ (pair as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            }
            SeedPolicy::Entropy => StdRng::from_entropy(),
        }
    }

    /// Fit `dst ~ H * src`. Returns `None` for too few points, degenerate
    /// configurations, or fewer than four inliers.
    pub fn estimate(
        &self,
        src: &[Point2<f64>],
        dst: &[Point2<f64>],
        rng: &mut StdRng,
    ) -> Option<HomographyFit> {
        let n = src.len();
        if n != dst.len() || n < SAMPLE_SIZE {
            return None;
        }

        let threshold_sq = self.params.reproj_threshold * self.params.reproj_threshold;
        let mut best: Option<(Homography, Vec<bool>, usize)> = None;
        let mut max_iters = self.params.max_iterations;
        let mut iter = 0;

        while iter < max_iters {
            iter += 1;
            let sample = index::sample(rng, n, SAMPLE_SIZE).into_vec();
            let s_src: Vec<Point2<f64>> = sample.iter().map(|&i| src[i]).collect();
            let s_dst: Vec<Point2<f64>> = sample.iter().map(|&i| dst[i]).collect();
            if has_collinear_triple(&s_src) || has_collinear_triple(&s_dst) {
                continue;
            }
            let Some(h) = dlt(&s_src, &s_dst) else {
                continue;
            };

            let (mask, count) = inlier_mask(&h, src, dst, threshold_sq);
            if best.as_ref().map_or(true, |b| count > b.2) {
                max_iters = max_iters.min(required_iterations(
                    self.params.confidence,
                    (n - count) as f64 / n as f64,
                    self.params.max_iterations,
                ));
                best = Some((h, mask, count));
            }
        }

        let (model, mask, count) = best?;
        if count < SAMPLE_SIZE {
            return None;
        }

        let in_src: Vec<Point2<f64>> = src
            .iter()
            .zip(&mask)
            .filter_map(|(p, &m)| m.then_some(*p))
            .collect();
        let in_dst: Vec<Point2<f64>> = dst
            .iter()
            .zip(&mask)
            .filter_map(|(p, &m)| m.then_some(*p))
            .collect();

        let refined = dlt(&in_src, &in_dst)
            .filter(|h| inlier_mask(h, src, dst, threshold_sq).1 >= count)
            .unwrap_or(model);

        Some(HomographyFit {
            homography: refined,
            inliers: count,
            iterations: iter,
        })
    }
}

/// Iterations needed to draw an all-inlier sample with `confidence`, given
/// the current outlier ratio.
fn required_iterations(confidence: f64, outlier_ratio: f64, max_iters: usize) -> usize {
    let inlier_prob = (1.0 - outlier_ratio).powi(SAMPLE_SIZE as i32);
    if inlier_prob <= EPS {
        return max_iters;
    }
    if inlier_prob >= 1.0 - EPS {
        return 1;
    }
    let num = (1.0 - confidence).ln();
    let denom = (1.0 - inlier_prob).ln();
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        return max_iters;
    }
    ((num / denom).round() as usize).clamp(1, max_iters)
}

fn inlier_mask(
    h: &Homography,
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
    threshold_sq: f64,
) -> (Vec<bool>, usize) {
    let mut count = 0;
    let mask = src
        .iter()
        .zip(dst)
        .map(|(s, d)| {
            let inlier = h
                .project(s)
                .is_some_and(|p| (p - *d).norm_squared() <= threshold_sq);
            count += inlier as usize;
            inlier
        })
        .collect();
    (mask, count)
}

fn has_collinear_triple(pts: &[Point2<f64>]) -> bool {
    let n = pts.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let a = pts[j] - pts[i];
                let b = pts[k] - pts[i];
                let cross = a.x * b.y - a.y * b.x;
                if cross.abs() <= COLLINEAR_SIN * a.norm() * b.norm() {
                    return true;
                }
            }
        }
    }
    false
}

/// Similarity transform moving the centroid to the origin with mean distance sqrt(2).
fn normalizing_transform(pts: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= EPS {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Matrix3<f64>, p: &Point2<f64>) -> (f64, f64) {
    let v = t * Vector3::new(p.x, p.y, 1.0);
    (v.x, v.y)
}

/// Normalized DLT over four or more correspondences.
pub fn dlt(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < SAMPLE_SIZE {
        return None;
    }
    let t_src = normalizing_transform(src)?;
    let t_dst = normalizing_transform(dst)?;

    let mut ata = SMatrix::<f64, 9, 9>::zeros();
    for (s, d) in src.iter().zip(dst) {
        let (x, y) = apply(&t_src, s);
        let (u, v) = apply(&t_dst, d);
        let rows = [
            [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u],
            [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v],
        ];
        for row in &rows {
            for i in 0..9 {
                for j in 0..9 {
                    ata[(i, j)] += row[i] * row[j];
                }
            }
        }
    }

    let eigen = SymmetricEigen::new(ata);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = eigen.eigenvectors.column(min_idx);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    Homography::from_matrix(t_dst_inv * hn * t_src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn grid() -> Vec<Point2<f64>> {
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                pts.push(Point2::new(20.0 + i as f64 * 37.0, 15.0 + j as f64 * 29.0 + i as f64 * 3.0));
            }
        }
        pts
    }

    fn rotation_about(cx: f64, cy: f64, deg: f64, tx: f64, ty: f64) -> Matrix3<f64> {
        let (s, c) = deg.to_radians().sin_cos();
        Matrix3::new(
            c,
            -s,
            cx - c * cx + s * cy + tx,
            s,
            c,
            cy - s * cx - c * cy + ty,
            0.0,
            0.0,
            1.0,
        )
    }

    fn map(m: &Matrix3<f64>, pts: &[Point2<f64>]) -> Vec<Point2<f64>> {
        let h = Homography::from_matrix(*m).unwrap();
        pts.iter().map(|p| h.project(p).unwrap()).collect()
    }

    #[test]
    fn dlt_recovers_exact_projective_transform() {
        let truth = Matrix3::new(1.05, 0.02, 12.0, -0.03, 0.97, -7.0, 1e-4, -2e-4, 1.0);
        let src = grid();
        let dst = map(&truth, &src);
        let h = dlt(&src, &dst).unwrap();
        for r in 0..3 {
            for c in 0..3 {
                assert_relative_eq!(h.at(r, c), truth[(r, c)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn dlt_rejects_collapsed_points() {
        let src = vec![Point2::new(5.0, 5.0); 4];
        assert!(dlt(&src, &src).is_none());
    }

    #[test]
    fn decomposition_reads_translation_and_rotation() {
        let h = Homography::from_matrix(rotation_about(0.0, 0.0, 10.0, 7.0, -3.0)).unwrap();
        let (dx, dy) = h.translation();
        assert_relative_eq!(dx, 7.0, epsilon = 1e-9);
        assert_relative_eq!(dy, -3.0, epsilon = 1e-9);
        assert_relative_eq!(h.rotation_degrees(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn from_matrix_normalizes_scale() {
        let h = Homography::from_matrix(Matrix3::identity() * 4.0).unwrap();
        assert_eq!(h, Homography::identity());
        let mut singular = Matrix3::identity();
        singular[(2, 2)] = 0.0;
        assert!(Homography::from_matrix(singular).is_none());
    }

    #[test]
    fn ransac_ignores_outliers() {
        let truth = rotation_about(120.0, 90.0, 4.0, 9.0, -6.0);
        let src = grid();
        let mut dst = map(&truth, &src);
        let mut noise = StdRng::seed_from_u64(99);
        // Corrupt a third of the correspondences.
        for p in dst.iter_mut().step_by(3) {
            p.x += noise.gen_range(40.0..120.0);
            p.y -= noise.gen_range(40.0..120.0);
        }

        let estimator = RansacEstimator::new(RansacParams::default());
        let fit = estimator
            .estimate(&src, &dst, &mut estimator.rng_for(1))
            .unwrap();
        assert_eq!(fit.inliers, 20);
        assert_relative_eq!(fit.homography.rotation_degrees(), 4.0, epsilon = 1e-3);
        let (dx, dy) = fit.homography.translation();
        assert_relative_eq!(dx, truth[(0, 2)], epsilon = 1e-2);
        assert_relative_eq!(dy, truth[(1, 2)], epsilon = 1e-2);
    }

    #[test]
    fn ransac_declines_collinear_input() {
        let src: Vec<Point2<f64>> = (0..20).map(|i| Point2::new(i as f64 * 5.0, 10.0)).collect();
        let dst: Vec<Point2<f64>> = src.iter().map(|p| Point2::new(p.x + 3.0, p.y)).collect();
        let estimator = RansacEstimator::new(RansacParams::default());
        assert!(estimator
            .estimate(&src, &dst, &mut estimator.rng_for(0))
            .is_none());
    }

    #[test]
    fn ransac_declines_too_few_points() {
        let src = grid()[..3].to_vec();
        let estimator = RansacEstimator::new(RansacParams::default());
        assert!(estimator
            .estimate(&src, &src, &mut estimator.rng_for(0))
            .is_none());
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let truth = rotation_about(100.0, 80.0, -3.0, 2.0, 1.0);
        let src = grid();
        let mut dst = map(&truth, &src);
        dst[4].x += 60.0;
        dst[11].y += 45.0;
        let estimator = RansacEstimator::new(RansacParams::default());
        let a = estimator.estimate(&src, &dst, &mut estimator.rng_for(5)).unwrap();
        let b = estimator.estimate(&src, &dst, &mut estimator.rng_for(5)).unwrap();
        assert_eq!(a.homography, b.homography);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn iteration_bound_shrinks_with_inlier_ratio() {
        assert_eq!(required_iterations(0.995, 0.0, 2000), 1);
        assert_eq!(required_iterations(0.995, 1.0, 2000), 2000);
        let half = required_iterations(0.995, 0.5, 2000);
        let tenth = required_iterations(0.995, 0.1, 2000);
        assert!(tenth < half && half < 2000, "{tenth} {half}");
    }
}
