//! RGB to HSV conversion in the 8-bit convention (hue halved to fit a byte).

use image::RgbImage;
use ndarray::Array3;

use crate::tracker::color_range::{Hsv, MAX_HUE};

/// Convert one RGB pixel to 8-bit HSV.
///
/// `v = max(r, g, b)`, `s = 255 * (v - min) / v` and the hue in degrees is
/// halved and rounded so that it lands in `[0, 179]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let h_deg = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };
    let h_deg = if h_deg < 0.0 { h_deg + 360.0 } else { h_deg };

    let mut h = (h_deg / 2.0).round() as u16;
    if h > MAX_HUE as u16 {
        h -= 180;
    }

    Hsv::new(h as u8, s.round() as u8, v as u8)
}

/// A frame converted to HSV, stored as `(rows, cols, 3)`.
#[derive(Debug, Clone)]
pub struct HsvFrame {
    data: Array3<u8>,
}

impl HsvFrame {
    /// Convert an RGB frame. The source is only borrowed for the duration of the call.
    pub fn from_rgb(frame: &RgbImage) -> Self {
        let (width, height) = frame.dimensions();
        let mut data = Array3::zeros((height as usize, width as usize, 3));
        for (x, y, px) in frame.enumerate_pixels() {
            let hsv = rgb_to_hsv(px[0], px[1], px[2]);
            let (row, col) = (y as usize, x as usize);
            data[[row, col, 0]] = hsv.h;
            data[[row, col, 1]] = hsv.s;
            data[[row, col, 2]] = hsv.v;
        }
        Self { data }
    }

    /// Wrap an existing `(rows, cols, 3)` HSV array.
    pub fn from_array(data: Array3<u8>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// HSV value at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Hsv {
        Hsv::new(
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        )
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.data
    }
}
