use camera_motion_common::frame::{Channels, Frame};
use image::GrayImage;

/// BT.601 luma weights in 8.8 fixed point (0.299, 0.587, 0.114).
const R_WEIGHT: u32 = 77;
const G_WEIGHT: u32 = 150;
const B_WEIGHT: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((R_WEIGHT * r as u32 + G_WEIGHT * g as u32 + B_WEIGHT * b as u32 + 128) >> 8) as u8
}

/// Reduce a frame to a single intensity channel of the same size.
///
/// Single-channel frames are copied unchanged.
pub fn to_gray(frame: &Frame) -> GrayImage {
    let mut gray = GrayImage::new(frame.width(), frame.height());
    match frame.channels() {
        Channels::Gray => gray.copy_from_slice(frame.data()),
        Channels::Rgb => {
            for (dst, px) in gray.iter_mut().zip(frame.data().chunks_exact(3)) {
                *dst = luma(px[0], px[1], px[2]);
            }
        }
    }
    gray
}
