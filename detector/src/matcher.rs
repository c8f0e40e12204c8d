use crate::features::Descriptor;

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x ^ y).count_ones()).sum()
}

/// An accepted correspondence between two consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index into the previous frame's feature set.
    pub query_idx: usize,
    /// Index into the current frame's feature set.
    pub train_idx: usize,
    pub distance: u32,
}

/// Brute-force Hamming matcher with Lowe's ratio test.
#[derive(Debug, Clone, Copy)]
pub struct RatioMatcher {
    ratio: f32,
}

impl RatioMatcher {
    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Match every descriptor of `query` against `train`, keeping the nearest
    /// neighbour only when it is clearly closer than the second nearest.
    ///
    /// Queries with fewer than two candidates produce no match. Output is in
    /// query order.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if query.is_empty() || train.len() < 2 {
            return Vec::new();
        }

        query
            .iter()
            .enumerate()
            .filter_map(|(query_idx, q)| {
                let (best, second) = two_nearest(q, train);
                let accepted = (best.1 as f32) < self.ratio * second.1 as f32;
                accepted.then_some(Match {
                    query_idx,
                    train_idx: best.0,
                    distance: best.1,
                })
            })
            .collect()
    }
}

/// Nearest and second-nearest `(index, distance)`; equal distances keep the
/// lower index first. `train` must hold at least two descriptors.
fn two_nearest(q: &Descriptor, train: &[Descriptor]) -> ((usize, u32), (usize, u32)) {
    let mut best = (usize::MAX, u32::MAX);
    let mut second = (usize::MAX, u32::MAX);
    for (idx, t) in train.iter().enumerate() {
        let d = hamming(q, t);
        if d < best.1 {
            second = best;
            best = (idx, d);
        } else if d < second.1 {
            second = (idx, d);
        }
    }
    (best, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(fill: u8) -> Descriptor {
        [fill; 32]
    }

    fn with_bits(n: usize) -> Descriptor {
        let mut d = [0u8; 32];
        for bit in 0..n {
            d[bit / 8] |= 1 << (bit % 8);
        }
        d
    }

    #[test]
    fn hamming_counts_bits() {
        assert_eq!(hamming(&desc(0), &desc(0)), 0);
        assert_eq!(hamming(&desc(0), &desc(0xFF)), 256);
        assert_eq!(hamming(&with_bits(10), &desc(0)), 10);
    }

    #[test]
    fn unambiguous_match_is_kept() {
        let matcher = RatioMatcher::new(0.7);
        let query = [with_bits(0)];
        let train = [with_bits(100), with_bits(2), with_bits(50)];
        let matches = matcher.match_descriptors(&query, &train);
        assert_eq!(
            matches,
            vec![Match {
                query_idx: 0,
                train_idx: 1,
                distance: 2
            }]
        );
    }

    #[test]
    fn ambiguous_match_is_rejected() {
        let matcher = RatioMatcher::new(0.7);
        let query = [with_bits(0)];
        // 20 vs 24: 20 < 0.7 * 24 = 16.8 is false.
        let train = [with_bits(20), with_bits(24)];
        assert!(matcher.match_descriptors(&query, &train).is_empty());
    }

    #[test]
    fn ratio_test_is_strict() {
        let query = [with_bits(0)];
        let train = [with_bits(5), with_bits(10)];
        assert!(RatioMatcher::new(0.5)
            .match_descriptors(&query, &train)
            .is_empty());
        assert_eq!(RatioMatcher::new(0.51).match_descriptors(&query, &train).len(), 1);
    }

    #[test]
    fn exact_duplicates_in_train_are_ambiguous() {
        let matcher = RatioMatcher::new(1.0);
        let query = [desc(7)];
        let train = [desc(7), desc(7)];
        assert!(matcher.match_descriptors(&query, &train).is_empty());
    }

    #[test]
    fn fewer_than_two_candidates_yield_nothing() {
        let matcher = RatioMatcher::new(0.7);
        assert!(matcher
            .match_descriptors(&[desc(0)], &[desc(0)])
            .is_empty());
        assert!(matcher.match_descriptors(&[], &[desc(0), desc(1)]).is_empty());
        assert!(matcher.match_descriptors(&[desc(0)], &[]).is_empty());
    }

    #[test]
    fn output_follows_query_order() {
        let matcher = RatioMatcher::new(0.7);
        let query = [with_bits(200), with_bits(0)];
        let train = [with_bits(0), with_bits(200), with_bits(100)];
        let matches = matcher.match_descriptors(&query, &train);
        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].query_idx, matches[0].train_idx), (0, 1));
        assert_eq!((matches[1].query_idx, matches[1].train_idx), (1, 0));
    }
}
