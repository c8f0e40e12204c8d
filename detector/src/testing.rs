//! Synthetic scenes for unit tests.

use camera_motion_common::frame::Frame;
use image::{imageops, GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random rectangles of random intensity over mid-gray, lightly blurred.
/// Rich in corners, so feature extraction has plenty to work with.
pub fn textured(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImage::from_pixel(width, height, Luma([128]));
    let count = (width * height / 150).max(8);
    for _ in 0..count {
        let w: u32 = rng.gen_range(3..=14);
        let h: u32 = rng.gen_range(3..=14);
        let x0 = rng.gen_range(0..width);
        let y0 = rng.gen_range(0..height);
        let value: u8 = rng.gen();
        for y in y0..(y0 + h).min(height) {
            for x in x0..(x0 + w).min(width) {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }
    imageops::blur(&img, 1.0)
}

pub fn crop(img: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> GrayImage {
    imageops::crop_imm(img, x, y, width, height).to_image()
}

/// Rotate about the image centre by `degrees` (clockwise on screen, since y
/// points down). Pixels that map outside the source are black.
pub fn rotated(img: &GrayImage, degrees: f64) -> GrayImage {
    let (w, h) = img.dimensions();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (sin, cos) = degrees.to_radians().sin_cos();
    GrayImage::from_fn(w, h, |x, y| {
        let (px, py) = (x as f64 - cx, y as f64 - cy);
        let sx = cos * px + sin * py + cx;
        let sy = -sin * px + cos * py + cy;
        Luma([bilinear(img, sx, sy)])
    })
}

fn bilinear(img: &GrayImage, x: f64, y: f64) -> u8 {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x > (w - 1) as f64 || y > (h - 1) as f64 {
        return 0;
    }
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
    let (fx, fy) = (x - x0 as f64, y - y0 as f64);
    let p = |x, y| img.get_pixel(x, y)[0] as f64;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round() as u8
}

pub fn gray_frame(index: usize, img: &GrayImage) -> Frame {
    Frame::gray(index, img.width(), img.height(), img.as_raw().clone()).unwrap()
}

/// Same content as `gray_frame`, replicated into three channels.
pub fn rgb_frame(index: usize, img: &GrayImage) -> Frame {
    let data = img.as_raw().iter().flat_map(|&v| [v, v, v]).collect();
    Frame::rgb(index, img.width(), img.height(), data).unwrap()
}

/// Constant-intensity RGB frame.
pub fn flat_frame(index: usize, width: u32, height: u32, value: u8) -> Frame {
    let data = vec![value; (width * height * 3) as usize];
    Frame::rgb(index, width, height, data).unwrap()
}
