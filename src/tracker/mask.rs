//! Binary detection masks and the color thresholding that produces them.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use ndarray::Array2;

use crate::tracker::color_range::ColorRange;
use crate::tracker::hsv::HsvFrame;

/// Half-width of the square structuring element used for cleanup (5x5 kernel).
pub const KERNEL_RADIUS: u8 = 2;

/// Binary image, `true` = foreground. Indexed as `(row, col)` = `(y, x)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    data: Array2<bool>,
}

impl Mask {
    /// All-background mask of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array2::from_elem((height, width), false),
        }
    }

    pub fn from_array(data: Array2<bool>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[[y, x]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[[y, x]] = value;
    }

    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn as_array(&self) -> &Array2<bool> {
        &self.data
    }

    /// Foreground pixel coordinates `(x, y)` in raster order.
    pub fn foreground(&self) -> Vec<(usize, usize)> {
        self.data
            .indexed_iter()
            .filter_map(|((y, x), &v)| v.then_some((x, y)))
            .collect()
    }

    /// Export as an 8-bit image (255 = foreground) for display or saving.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            image::Luma([if self.get(x as usize, y as usize) { 255 } else { 0 }])
        })
    }

    /// Mask of the nonzero pixels of an 8-bit image.
    pub fn from_gray_image(img: &GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self {
            data: Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
                img.get_pixel(x as u32, y as u32)[0] != 0
            }),
        }
    }

    /// Morphological erosion with a 5x5 square. Pixels outside the image are ignored.
    pub fn erode(&self) -> Self {
        self.apply_gray(|img| morphology::erode(img, Norm::LInf, KERNEL_RADIUS))
    }

    /// Morphological dilation with a 5x5 square. Pixels outside the image are ignored.
    pub fn dilate(&self) -> Self {
        self.apply_gray(|img| morphology::dilate(img, Norm::LInf, KERNEL_RADIUS))
    }

    /// Erode `iterations` times, then dilate `iterations` times.
    ///
    /// Removes specks smaller than the kernel and smooths object outlines.
    pub fn opened(&self, iterations: usize) -> Self {
        if iterations == 0 || self.is_empty() {
            return self.clone();
        }
        self.apply_gray(|img| {
            let mut out = morphology::erode(img, Norm::LInf, KERNEL_RADIUS);
            for _ in 1..iterations {
                out = morphology::erode(&out, Norm::LInf, KERNEL_RADIUS);
            }
            for _ in 0..iterations {
                out = morphology::dilate(&out, Norm::LInf, KERNEL_RADIUS);
            }
            out
        })
    }

    fn apply_gray(&self, op: impl FnOnce(&GrayImage) -> GrayImage) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        Self::from_gray_image(&op(&self.to_gray_image()))
    }
}

/// Threshold an HSV frame: a pixel is foreground iff all channels lie in `range`.
///
/// An empty frame yields an empty mask.
pub fn color_mask(frame: &HsvFrame, range: &ColorRange) -> Mask {
    let mut mask = Mask::new(frame.width(), frame.height());
    if range.is_degenerate() {
        return mask;
    }
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            if range.contains(frame.get(x, y)) {
                mask.set(x, y, true);
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::color_range::Hsv;
    use ndarray::Array3;

    fn frame_from(pixels: &[[u8; 3]], width: usize) -> HsvFrame {
        let height = pixels.len() / width;
        let mut data = Array3::zeros((height, width, 3));
        for (i, px) in pixels.iter().enumerate() {
            for c in 0..3 {
                data[[i / width, i % width, c]] = px[c];
            }
        }
        HsvFrame::from_array(data)
    }

    #[test]
    fn test_color_mask_thresholds_each_channel() {
        let range = ColorRange::new(Hsv::new(100, 50, 50), Hsv::new(120, 200, 200));
        let frame = frame_from(
            &[
                [110, 100, 100], // inside
                [99, 100, 100],  // hue below
                [121, 100, 100], // hue above
                [110, 201, 100], // saturation above
                [110, 100, 49],  // value below
                [100, 50, 50],   // on the lower bound
            ],
            3,
        );
        let mask = color_mask(&frame, &range);
        assert_eq!(mask.width(), 3);
        assert_eq!(mask.height(), 2);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(0, 1));
        assert!(!mask.get(1, 1));
        assert!(mask.get(2, 1));
    }

    #[test]
    fn test_color_mask_empty_frame() {
        let frame = HsvFrame::from_array(Array3::zeros((0, 0, 3)));
        let mask = color_mask(&frame, &ColorRange::full());
        assert!(mask.is_empty());
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_opening_removes_speck_keeps_square() {
        let mut mask = Mask::new(40, 40);
        mask.set(3, 3, true);
        for y in 15..30 {
            for x in 15..30 {
                mask.set(x, y, true);
            }
        }
        let opened = mask.opened(1);
        assert!(!opened.get(3, 3));
        assert_eq!(opened.count(), 15 * 15);
    }

    #[test]
    fn test_erode_ignores_outside_pixels() {
        let mut mask = Mask::new(10, 10);
        for y in 0..10 {
            for x in 0..10 {
                mask.set(x, y, true);
            }
        }
        assert_eq!(mask.erode().count(), 100);
    }

    #[test]
    fn test_gray_export() {
        let mut mask = Mask::new(2, 1);
        mask.set(1, 0, true);
        let img = mask.to_gray_image();
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
        assert_eq!(Mask::from_gray_image(&img), mask);
    }

    #[test]
    fn test_dilate_grows_by_kernel_radius() {
        let mut mask = Mask::new(11, 11);
        mask.set(5, 5, true);
        let grown = mask.dilate();
        assert_eq!(grown.count(), 25);
        assert!(grown.get(3, 3) && grown.get(7, 7));
        assert!(!grown.get(2, 5));
        assert_eq!(grown.erode(), mask);
    }
}
