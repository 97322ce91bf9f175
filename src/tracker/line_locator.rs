//! Rod localisation: probabilistic Hough segments reduced to one orientation.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::tracker::error::ConfigError;
use crate::tracker::mask::Mask;

/// Fixed seed for the point visiting order, so a given mask always yields the same segments.
const HOUGH_SEED: u64 = 0x5eed_0f_11_e5;

/// Fixed-point shift used while walking along a candidate line.
const SHIFT: i64 = 16;

/// Finest accepted accumulator resolution, in pixels for `rho` and degrees for `theta_deg`.
const MIN_RESOLUTION: f64 = 0.1;

/// Accumulators with more cells than this are refused.
const MAX_ACCUMULATOR_CELLS: usize = 1 << 27;

/// Parameters for [`LineLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineParams {
    /// Distance resolution of the accumulator in pixels.
    pub rho: f64,
    /// Angle resolution of the accumulator in degrees.
    pub theta_deg: f64,
    /// Minimum number of votes before a line is traced.
    pub threshold: u32,
    /// Segments shorter than this (along both axes) are discarded.
    pub min_line_length: u32,
    /// Largest gap in pixels bridged while tracing a segment.
    pub max_line_gap: u32,
    /// Erode/dilate passes applied to the mask before the transform.
    pub open_iterations: usize,
    /// Upper bound on the number of returned segments.
    pub max_segments: usize,
}

impl Default for LineParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta_deg: 1.0,
            threshold: 50,
            min_line_length: 50,
            max_line_gap: 10,
            open_iterations: 1,
            max_segments: 256,
        }
    }
}

impl LineParams {
    /// Reject resolutions the accumulator cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rho_ok = self.rho.is_finite() && self.rho >= MIN_RESOLUTION;
        let theta_ok = self.theta_deg.is_finite() && (MIN_RESOLUTION..=180.0).contains(&self.theta_deg);
        if rho_ok && theta_ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidLineParams {
                rho: self.rho,
                theta_deg: self.theta_deg,
            })
        }
    }
}

/// A line segment between two pixel positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Segment {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn length(&self) -> f64 {
        let dx = (self.x2 - self.x1) as f64;
        let dy = (self.y2 - self.y1) as f64;
        dx.hypot(dy)
    }

    /// Orientation in the image plane, in `[0, 180]` degrees.
    ///
    /// The segment is directed downward (towards larger y), so 0° points
    /// right, 90° points straight down and 180° points left.
    pub fn image_angle(&self) -> f64 {
        let (mut dx, mut dy) = ((self.x2 - self.x1) as f64, (self.y2 - self.y1) as f64);
        if dy < 0.0 {
            dx = -dx;
            dy = -dy;
        }
        dy.atan2(dx).to_degrees()
    }

    /// Endpoint with the smaller y coordinate.
    pub fn upper_end(&self) -> (i64, i64) {
        if self.y1 <= self.y2 {
            (self.x1, self.y1)
        } else {
            (self.x2, self.y2)
        }
    }
}

/// Result of rod detection.
#[derive(Debug, Clone, PartialEq)]
pub struct RodLine {
    /// Length-weighted orientation of all segments in `[0, 180)`, image convention.
    pub angle_deg: f64,
    /// Every segment returned by the transform.
    pub segments: Vec<Segment>,
    /// The longest segment, used for drawing.
    pub longest: Segment,
}

/// Finds the dominant line orientation in a mask.
#[derive(Debug, Clone, Default)]
pub struct LineLocator {
    params: LineParams,
}

impl LineLocator {
    pub fn new(params: LineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LineParams {
        &self.params
    }

    /// Clean the mask with the configured opening.
    pub fn prepare(&self, mask: &Mask) -> Mask {
        mask.opened(self.params.open_iterations)
    }

    /// Image-plane orientation of the rod in a raw mask (cleanup included).
    pub fn locate(&self, mask: &Mask) -> Option<f64> {
        self.locate_line(&self.prepare(mask)).map(|l| l.angle_deg)
    }

    /// Run the transform on an already-cleaned mask and reduce the segments.
    pub fn locate_line(&self, mask: &Mask) -> Option<RodLine> {
        let segments = hough_segments(mask, &self.params);
        if segments.is_empty() {
            return None;
        }
        let angle_deg = weighted_orientation(&segments)?;
        let longest = segments
            .iter()
            .copied()
            .fold(segments[0], |best, s| if s.length() > best.length() { s } else { best });
        log::trace!("{} segments, orientation {:.2} deg", segments.len(), angle_deg);
        Some(RodLine {
            angle_deg,
            segments,
            longest,
        })
    }
}

/// Length-weighted mean orientation of undirected segments, in `[0, 180)`.
///
/// Orientations are averaged on the doubled angle so that segments at
/// 1° and 179° average to 0° instead of 90°.
pub fn weighted_orientation(segments: &[Segment]) -> Option<f64> {
    let (mut sum_c, mut sum_s, mut total) = (0f64, 0f64, 0f64);
    for seg in segments {
        let w = seg.length();
        let doubled = (2.0 * seg.image_angle()).to_radians();
        sum_c += w * doubled.cos();
        sum_s += w * doubled.sin();
        total += w;
    }
    if total <= 0.0 {
        return None;
    }
    let mean = sum_s.atan2(sum_c).to_degrees() / 2.0;
    Some(if mean < 0.0 { mean + 180.0 } else { mean })
}

/// Progressive probabilistic Hough transform over the foreground of `mask`.
///
/// Points are visited in a seeded random order. Each point votes in the
/// accumulator; once a bin reaches `threshold` the corresponding line is
/// traced through the mask in both directions, bridging gaps up to
/// `max_line_gap`. Traced pixels are removed, and when the segment is long
/// enough their votes are withdrawn and the segment is emitted.
pub fn hough_segments(mask: &Mask, params: &LineParams) -> Vec<Segment> {
    let (width, height) = (mask.width() as i64, mask.height() as i64);
    if width == 0 || height == 0 || params.validate().is_err() {
        return Vec::new();
    }

    let theta = params.theta_deg.to_radians();
    let irho = 1.0 / params.rho;
    let num_angle = ((std::f64::consts::PI / theta).round() as usize).max(1);
    let num_rho = ((((width + height) * 2 + 1) as f64 / params.rho).round() as usize).max(1);
    let rho_offset = (num_rho as i64 - 1) / 2;
    let Some(cells) = num_angle.checked_mul(num_rho).filter(|&c| c <= MAX_ACCUMULATOR_CELLS) else {
        log::warn!("hough accumulator of {num_angle}x{num_rho} cells is too large, skipping");
        return Vec::new();
    };

    let trig: Vec<(f64, f64)> = (0..num_angle)
        .map(|n| {
            let a = n as f64 * theta;
            (a.cos() * irho, a.sin() * irho)
        })
        .collect();

    let mut accum = vec![0i32; cells];
    let mut live = mask.clone();
    let mut points = mask.foreground();
    let mut rng = StdRng::seed_from_u64(HOUGH_SEED);
    points.shuffle(&mut rng);

    // Cell of `(x, y)` for angle `n`; `None` when the distance falls outside the accumulator.
    let cell = |x: i64, y: i64, n: usize| -> Option<usize> {
        let (c, s) = trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as i64 + rho_offset;
        (0..num_rho as i64).contains(&r).then(|| n * num_rho + r as usize)
    };

    let threshold = i32::try_from(params.threshold).unwrap_or(i32::MAX);
    let max_gap = params.max_line_gap as i64;
    let min_len = params.min_line_length as i64;
    let mut segments = Vec::new();

    for &(px, py) in &points {
        if !live.get(px, py) {
            continue;
        }
        let (x0, y0) = (px as i64, py as i64);

        let mut max_votes = threshold - 1;
        let mut max_n = 0usize;
        for n in 0..num_angle {
            let Some(bin) = cell(x0, y0, n) else { continue };
            accum[bin] += 1;
            if accum[bin] > max_votes {
                max_votes = accum[bin];
                max_n = n;
            }
        }
        if max_votes < threshold {
            continue;
        }

        // Direction along the line is perpendicular to the accumulator normal.
        let (cos_n, sin_n) = trig[max_n];
        let a = -sin_n * params.rho;
        let b = cos_n * params.rho;

        let x_major = a.abs() > b.abs();
        let (step_x, step_y, start_x, start_y) = if x_major {
            let sx = if a > 0.0 { 1 } else { -1 };
            let sy = (b * (1i64 << SHIFT) as f64 / a.abs()).round() as i64;
            (sx, sy, x0, (y0 << SHIFT) + (1 << (SHIFT - 1)))
        } else {
            let sy = if b > 0.0 { 1 } else { -1 };
            let sx = (a * (1i64 << SHIFT) as f64 / b.abs()).round() as i64;
            (sx, sy, (x0 << SHIFT) + (1 << (SHIFT - 1)), y0)
        };

        let to_pixel = |x: i64, y: i64| -> (i64, i64) {
            if x_major { (x, y >> SHIFT) } else { (x >> SHIFT, y) }
        };

        let mut ends = [(x0, y0); 2];
        for (k, end) in ends.iter_mut().enumerate() {
            let (dx, dy) = if k == 0 { (step_x, step_y) } else { (-step_x, -step_y) };
            let (mut x, mut y) = (start_x, start_y);
            let mut gap = 0;
            loop {
                let (j, i) = to_pixel(x, y);
                if j < 0 || j >= width || i < 0 || i >= height {
                    break;
                }
                if live.get(j as usize, i as usize) {
                    gap = 0;
                    *end = (j, i);
                } else {
                    gap += 1;
                    if gap > max_gap {
                        break;
                    }
                }
                x += dx;
                y += dy;
            }
        }

        let good = (ends[1].0 - ends[0].0).abs() >= min_len || (ends[1].1 - ends[0].1).abs() >= min_len;

        for (k, end) in ends.iter().enumerate() {
            let (dx, dy) = if k == 0 { (step_x, step_y) } else { (-step_x, -step_y) };
            let (mut x, mut y) = (start_x, start_y);
            loop {
                let (j, i) = to_pixel(x, y);
                if j < 0 || j >= width || i < 0 || i >= height {
                    break;
                }
                if live.get(j as usize, i as usize) {
                    if good {
                        for bin in (0..num_angle).filter_map(|n| cell(j, i, n)) {
                            accum[bin] -= 1;
                        }
                    }
                    live.set(j as usize, i as usize, false);
                }
                if (j, i) == *end {
                    break;
                }
                x += dx;
                y += dy;
            }
        }

        if good {
            segments.push(Segment::new(ends[0].0, ends[0].1, ends[1].0, ends[1].1));
            if segments.len() >= params.max_segments {
                break;
            }
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bar(mask: &mut Mask, x0: usize, y0: usize, x1: usize, y1: usize) {
        for y in y0..y1 {
            for x in x0..x1 {
                mask.set(x, y, true);
            }
        }
    }

    #[test]
    fn test_segment_image_angle() {
        assert_abs_diff_eq!(Segment::new(0, 0, 0, 10).image_angle(), 90.0);
        assert_abs_diff_eq!(Segment::new(0, 10, 0, 0).image_angle(), 90.0);
        assert_abs_diff_eq!(Segment::new(0, 0, 10, 0).image_angle(), 0.0);
        assert_abs_diff_eq!(Segment::new(0, 0, 10, 10).image_angle(), 45.0);
        assert_abs_diff_eq!(Segment::new(10, 0, 0, 10).image_angle(), 135.0);
    }

    #[test]
    fn test_weighted_orientation_favours_long_segments() {
        let segs = [Segment::new(0, 0, 0, 100), Segment::new(0, 0, 10, 10)];
        let angle = weighted_orientation(&segs).unwrap();
        assert!(angle > 85.0 && angle < 90.0);
    }

    #[test]
    fn test_weighted_orientation_wraps_near_horizontal() {
        // 1 degree and 179 degrees are both nearly horizontal.
        let a = Segment::new(0, 0, 1000, 17);
        let b = Segment::new(1000, 0, 0, 17);
        let angle = weighted_orientation(&[a, b]).unwrap();
        assert!(angle < 0.5 || angle > 179.5, "got {angle}");
    }

    #[test]
    fn test_detects_vertical_bar() {
        let mut mask = Mask::new(200, 250);
        bar(&mut mask, 98, 40, 103, 210);
        let line = LineLocator::default().locate_line(&mask).unwrap();
        assert!((line.angle_deg - 90.0).abs() < 3.0, "got {}", line.angle_deg);
        assert!(line.longest.length() >= 50.0);
    }

    #[test]
    fn test_detects_horizontal_bar() {
        let mut mask = Mask::new(250, 200);
        bar(&mut mask, 30, 98, 220, 103);
        let angle = LineLocator::default().locate(&mask).unwrap();
        assert!(angle < 3.0 || angle > 177.0, "got {angle}");
    }

    #[test]
    fn test_short_bar_yields_none() {
        let mut mask = Mask::new(100, 100);
        bar(&mut mask, 40, 40, 45, 70);
        assert!(LineLocator::default().locate(&mask).is_none());
    }

    #[test]
    fn test_empty_mask_yields_none() {
        assert!(LineLocator::default().locate(&Mask::new(0, 0)).is_none());
        assert!(LineLocator::default().locate(&Mask::new(64, 64)).is_none());
    }

    #[test]
    fn test_deterministic() {
        let mut mask = Mask::new(200, 200);
        bar(&mut mask, 20, 20, 25, 180);
        let locator = LineLocator::default();
        assert_eq!(locator.locate_line(&mask), locator.locate_line(&mask));
    }

    #[test]
    fn test_validate_resolution() {
        assert!(LineParams::default().validate().is_ok());
        for (rho, theta_deg) in [(0.0, 1.0), (-1.0, 1.0), (f64::NAN, 1.0), (1.0, 0.0), (1.0, 270.0)] {
            let params = LineParams {
                rho,
                theta_deg,
                ..LineParams::default()
            };
            assert!(
                matches!(params.validate(), Err(ConfigError::InvalidLineParams { .. })),
                "rho={rho} theta={theta_deg}"
            );
        }
    }

    #[test]
    fn test_coarse_rho_does_not_overrun_accumulator() {
        let mut mask = Mask::new(40, 40);
        bar(&mut mask, 10, 5, 30, 35);
        let params = LineParams {
            rho: 2000.0,
            threshold: 5,
            min_line_length: 5,
            ..LineParams::default()
        };
        for s in hough_segments(&mask, &params) {
            assert!((0..40).contains(&s.x1) && (0..40).contains(&s.y2));
        }
        let invalid = LineParams {
            rho: 0.0,
            ..LineParams::default()
        };
        assert!(hough_segments(&mask, &invalid).is_empty());
    }

    #[test]
    fn test_huge_threshold_finds_nothing() {
        let mut mask = Mask::new(200, 250);
        bar(&mut mask, 98, 40, 103, 210);
        let params = LineParams {
            threshold: u32::MAX,
            ..LineParams::default()
        };
        assert!(hough_segments(&mask, &params).is_empty());
    }
}
