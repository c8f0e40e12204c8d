use image::GrayImage;

/// Bresenham circle of radius 3, clockwise from 12 o'clock.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// FAST-9: nine contiguous circle pixels must all be brighter or all darker.
const ARC_LENGTH: u32 = 9;

const HARRIS_HALF_BLOCK: i32 = 3;
const HARRIS_K: f32 = 0.04;

/// A FAST corner at integer pixel coordinates of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub x: u32,
    pub y: u32,
    /// Summed contrast beyond the threshold over the corner's arc.
    pub score: f32,
}

/// Detect FAST-9 corners at least `border` pixels away from every edge,
/// keeping only 3x3 local maxima of the corner score. Output is in raster
/// order.
pub fn detect(image: &GrayImage, threshold: u8, border: u32) -> Vec<Corner> {
    let (w, h) = image.dimensions();
    let border = border.max(3);
    if w <= 2 * border || h <= 2 * border {
        return Vec::new();
    }

    let stride = w as usize;
    let data = image.as_raw();
    let offsets = CIRCLE.map(|(dx, dy)| dy as isize * stride as isize + dx as isize);

    let mut scores = vec![0.0f32; data.len()];
    for y in border..h - border {
        for x in border..w - border {
            let idx = y as usize * stride + x as usize;
            if let Some(score) = corner_score(data, idx, &offsets, threshold) {
                scores[idx] = score;
            }
        }
    }

    let mut corners = Vec::new();
    for y in border..h - border {
        for x in border..w - border {
            let idx = y as usize * stride + x as usize;
            let score = scores[idx];
            if score > 0.0 && is_local_max(&scores, idx, stride) {
                corners.push(Corner { x, y, score });
            }
        }
    }
    corners
}

fn corner_score(data: &[u8], idx: usize, offsets: &[isize; 16], threshold: u8) -> Option<f32> {
    let center = data[idx] as i32;
    let t = threshold as i32;

    let mut ring = [0i32; 16];
    let mut bright = 0u32;
    let mut dark = 0u32;
    for (i, off) in offsets.iter().enumerate() {
        let v = data[(idx as isize + off) as usize] as i32;
        ring[i] = v;
        if v > center + t {
            bright |= 1 << i;
        } else if v < center - t {
            dark |= 1 << i;
        }
    }

    let bright_score = has_arc(bright).then(|| {
        ring.iter()
            .filter(|&&v| v > center + t)
            .map(|&v| v - center - t)
            .sum::<i32>()
    });
    let dark_score = has_arc(dark).then(|| {
        ring.iter()
            .filter(|&&v| v < center - t)
            .map(|&v| center - t - v)
            .sum::<i32>()
    });

    match (bright_score, dark_score) {
        (None, None) => None,
        (b, d) => Some(b.unwrap_or(0).max(d.unwrap_or(0)) as f32),
    }
}

/// True when the 16-bit circular mask holds a run of at least `ARC_LENGTH` set bits.
fn has_arc(mask: u32) -> bool {
    if mask.count_ones() < ARC_LENGTH {
        return false;
    }
    let doubled = mask | (mask << 16);
    let mut run = 0;
    for i in 0..32 {
        if doubled & (1 << i) != 0 {
            run += 1;
            if run >= ARC_LENGTH {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// Plateaus keep their first pixel in raster order.
fn is_local_max(scores: &[f32], idx: usize, stride: usize) -> bool {
    let s = scores[idx];
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let n = scores[(idx as isize + dy * stride as isize + dx) as usize];
            let earlier = dy < 0 || (dy == 0 && dx < 0);
            if (earlier && n >= s) || (!earlier && n > s) {
                return false;
            }
        }
    }
    true
}

/// Harris corner response over a 7x7 block of central-difference gradients.
///
/// The caller must keep `(x, y)` at least four pixels from every edge.
pub fn harris_response(image: &GrayImage, x: u32, y: u32) -> f32 {
    let stride = image.width() as i32;
    let data = image.as_raw();
    let at = |px: i32, py: i32| data[(py * stride + px) as usize] as f32;

    let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
    for dy in -HARRIS_HALF_BLOCK..=HARRIS_HALF_BLOCK {
        for dx in -HARRIS_HALF_BLOCK..=HARRIS_HALF_BLOCK {
            let px = x as i32 + dx;
            let py = y as i32 + dy;
            let ix = at(px + 1, py) - at(px - 1, py);
            let iy = at(px, py + 1) - at(px, py - 1);
            sxx += ix * ix;
            syy += iy * iy;
            sxy += ix * iy;
        }
    }
    let trace = sxx + syy;
    sxx * syy - sxy * sxy - HARRIS_K * trace * trace
}
