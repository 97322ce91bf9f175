//! Diagnostic overlay drawn on top of a processed frame.

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use nalgebra::Point2;

use crate::tracker::FrameDiagnostics;

const PIVOT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MOVING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LINK_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const ROD_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const ARROW_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const REFERENCE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const WARNING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MARKER_RADIUS: i32 = 5;

const LABEL_SCALE: f32 = 18.0;
const TAG_SCALE: f32 = 13.0;
const LABEL_X: i32 = 10;
const FPS_ROW: i32 = 10;
const PIVOT_NOTICE_ROW: i32 = 32;
const MAIN_ROW: i32 = 54;

/// Fraction of the arrow length used for its head.
const ARROW_TIP: f64 = 0.3;

static LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// Optional extras drawn next to the detections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayOptions {
    /// Wind speed in m/s; shown as a label and as an arrow from the moving ball.
    pub wind_speed: Option<f64>,
    /// Arrow length in pixels per m/s.
    pub arrow_scale: f64,
    pub fps: Option<f64>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            wind_speed: None,
            arrow_scale: 10.0,
            fps: None,
        }
    }
}

/// Copy `frame` and draw the detections of `diagnostics` on it.
///
/// With a rod: the rod's longest segment, a vertical reference from its
/// upper end and the angle label. Otherwise: ball markers with their
/// coordinates, a notice for each ball that was not found, the pivot to ball
/// link, the vertical reference from the pivot, the wind speed (or angle)
/// label and the wind arrow.
pub fn render_overlay(
    frame: &RgbImage,
    diagnostics: &FrameDiagnostics,
    options: &OverlayOptions,
) -> RgbImage {
    let mut out = frame.clone();
    let font = FontRef::try_from_slice(LABEL_FONT)
        .inspect_err(|e| log::warn!("overlay font unavailable, drawing without labels: {e}"))
        .ok();
    let label = |img: &mut RgbImage, x: i32, y: i32, scale: f32, color: Rgb<u8>, text: &str| {
        if let Some(font) = &font {
            draw_text_mut(img, color, x, y, PxScale::from(scale), font, text);
        }
    };
    let bottom = out.height() as f32;
    let angle = diagnostics.reading.value();

    if let Some(fps) = options.fps {
        label(&mut out, LABEL_X, FPS_ROW, LABEL_SCALE, REFERENCE_COLOR, &format!("FPS: {fps:.1}"));
    }

    if let Some(rod) = &diagnostics.rod {
        let s = rod.longest;
        draw_line_segment_mut(&mut out, (s.x1 as f32, s.y1 as f32), (s.x2 as f32, s.y2 as f32), ROD_COLOR);
        if let Some(angle) = angle {
            let text = format!("Angle: {angle:.2} degrees");
            label(&mut out, LABEL_X, MAIN_ROW, LABEL_SCALE, LABEL_COLOR, &text);
        }
        let (ux, uy) = s.upper_end();
        draw_line_segment_mut(&mut out, (ux as f32, uy as f32), (ux as f32, bottom), REFERENCE_COLOR);
        if let Some(m) = diagnostics.moving {
            draw_filled_circle_mut(&mut out, pixel(m), MARKER_RADIUS, MOVING_COLOR);
        }
        return out;
    }

    match diagnostics.pivot {
        Some(p) => {
            let (px, py) = pixel(p);
            draw_filled_circle_mut(&mut out, (px, py), MARKER_RADIUS, PIVOT_COLOR);
            let tag = format!("Pivot: ({px}, {py})");
            label(&mut out, px + 10, py - 20, TAG_SCALE, PIVOT_COLOR, &tag);
            draw_line_segment_mut(&mut out, (px as f32, py as f32), (px as f32, bottom), REFERENCE_COLOR);
        }
        None => {
            let text = "Pivot ball not detected";
            label(&mut out, LABEL_X, PIVOT_NOTICE_ROW, LABEL_SCALE, WARNING_COLOR, text);
        }
    }

    match diagnostics.moving {
        Some(m) => {
            let (mx, my) = pixel(m);
            draw_filled_circle_mut(&mut out, (mx, my), MARKER_RADIUS, MOVING_COLOR);
            let tag = format!("Moving: ({mx}, {my})");
            label(&mut out, mx + 10, my - 20, TAG_SCALE, MOVING_COLOR, &tag);
        }
        None => {
            let text = "Moving ball not detected";
            label(&mut out, LABEL_X, MAIN_ROW, LABEL_SCALE, WARNING_COLOR, text);
        }
    }

    if let (Some(p), Some(m)) = (diagnostics.pivot, diagnostics.moving) {
        let (p, m) = (pixel(p), pixel(m));
        draw_line_segment_mut(&mut out, (p.0 as f32, p.1 as f32), (m.0 as f32, m.1 as f32), LINK_COLOR);

        match (options.wind_speed, angle) {
            (Some(speed), _) => {
                let text = format!("Wind Speed: {speed:.2} m/s");
                label(&mut out, LABEL_X, MAIN_ROW, LABEL_SCALE, LABEL_COLOR, &text);
                let length = (speed * options.arrow_scale) as i32;
                draw_arrow(&mut out, m, (m.0 + length, m.1), ARROW_COLOR);
            }
            (None, Some(angle)) => {
                let text = format!("Angle: {angle:.2} degrees");
                label(&mut out, LABEL_X, MAIN_ROW, LABEL_SCALE, LABEL_COLOR, &text);
            }
            (None, None) => {}
        }
    }

    out
}

fn pixel(p: Point2<f64>) -> (i32, i32) {
    (p.x.round() as i32, p.y.round() as i32)
}

/// Straight arrow from `from` to `to` with two barbs at 45° to the shaft.
/// A zero-length arrow draws nothing.
pub fn draw_arrow(img: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let (dx, dy) = ((from.0 - to.0) as f64, (from.1 - to.1) as f64);
    let length = dx.hypot(dy);
    if length == 0.0 {
        return;
    }
    let tip = (to.0 as f32, to.1 as f32);
    draw_line_segment_mut(img, (from.0 as f32, from.1 as f32), tip, color);

    let back = dy.atan2(dx);
    let barb = ARROW_TIP * length;
    for side in [-1.0, 1.0] {
        let a = back + side * std::f64::consts::FRAC_PI_4;
        let end = (to.0 as f64 + barb * a.cos(), to.1 as f64 + barb * a.sin());
        draw_line_segment_mut(img, tip, (end.0.round() as f32, end.1.round() as f32), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{AngleReading, Mask, RodLine, Segment};

    fn two_balls(pivot: Option<(f64, f64)>, moving: Option<(f64, f64)>) -> FrameDiagnostics {
        let pivot = pivot.map(|(x, y)| Point2::new(x, y));
        let moving = moving.map(|(x, y)| Point2::new(x, y));
        FrameDiagnostics {
            reading: crate::tracker::two_ball_reading(pivot, moving),
            pivot,
            moving,
            rod: None,
            mask: Mask::new(120, 100),
        }
    }

    fn changed_pixels(a: &RgbImage, b: &RgbImage, rows: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| (0..a.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| a.get_pixel(x, y) != b.get_pixel(x, y))
            .count()
    }

    #[test]
    fn test_draws_ball_markers() {
        let frame = RgbImage::new(120, 120);
        let diag = two_balls(Some((60.0, 10.0)), Some((60.0, 90.0)));
        let out = render_overlay(&frame, &diag, &OverlayOptions::default());
        assert_eq!(out.get_pixel(63, 10), &PIVOT_COLOR);
        assert_eq!(out.get_pixel(63, 90), &MOVING_COLOR);
        assert_eq!(out.get_pixel(60, 50), &LINK_COLOR);
        assert_eq!(out.get_pixel(60, 119), &REFERENCE_COLOR);
        // The input frame is untouched.
        assert_eq!(frame.get_pixel(63, 10), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_missing_balls_get_notices() {
        let frame = RgbImage::new(300, 150);
        let pivot_rows = PIVOT_NOTICE_ROW as u32..MAIN_ROW as u32;

        let missing = render_overlay(&frame, &two_balls(None, None), &OverlayOptions::default());
        assert!(changed_pixels(&frame, &missing, pivot_rows.clone()) > 0);
        assert!(changed_pixels(&frame, &missing, MAIN_ROW as u32..MAIN_ROW as u32 + 20) > 0);

        let found = two_balls(Some((250.0, 130.0)), Some((280.0, 130.0)));
        let out = render_overlay(&frame, &found, &OverlayOptions::default());
        assert_eq!(changed_pixels(&frame, &out, pivot_rows), 0);
    }

    #[test]
    fn test_wind_arrow_points_right_from_moving_ball() {
        let frame = RgbImage::new(120, 100);
        let diag = two_balls(Some((30.0, 10.0)), Some((30.0, 80.0)));
        let options = OverlayOptions {
            wind_speed: Some(4.0),
            arrow_scale: 10.0,
            fps: None,
        };
        let out = render_overlay(&frame, &diag, &options);
        // Shaft is 40 px long, starting past the marker.
        assert_eq!(out.get_pixel(50, 80), &ARROW_COLOR);
        assert_eq!(out.get_pixel(70, 80), &ARROW_COLOR);
        assert_ne!(out.get_pixel(75, 80), &ARROW_COLOR);

        let still = render_overlay(&frame, &diag, &OverlayOptions::default());
        assert_ne!(still.get_pixel(50, 80), &ARROW_COLOR);
    }

    #[test]
    fn test_speed_label_drawn() {
        let frame = RgbImage::new(300, 200);
        let diag = two_balls(Some((200.0, 120.0)), Some((200.0, 180.0)));
        let label_rows = MAIN_ROW as u32..(MAIN_ROW as u32 + LABEL_SCALE as u32);
        let plain = render_overlay(&frame, &diag, &OverlayOptions::default());
        let options = OverlayOptions {
            wind_speed: Some(1.5),
            ..OverlayOptions::default()
        };
        let with_speed = render_overlay(&frame, &diag, &options);
        assert!(changed_pixels(&frame, &plain, label_rows.clone()) > 0);
        assert!(changed_pixels(&plain, &with_speed, label_rows) > 0);
    }

    #[test]
    fn test_draws_rod() {
        let seg = Segment::new(5, 10, 15, 50);
        let diag = FrameDiagnostics {
            reading: AngleReading::valid(14.0),
            pivot: None,
            moving: None,
            rod: Some(RodLine {
                angle_deg: 76.0,
                segments: vec![seg],
                longest: seg,
            }),
            mask: Mask::new(20, 60),
        };
        let out = render_overlay(&RgbImage::new(20, 60), &diag, &OverlayOptions::default());
        assert_eq!(out.get_pixel(10, 30), &ROD_COLOR);
        assert_eq!(out.get_pixel(5, 59), &REFERENCE_COLOR);
    }

    #[test]
    fn test_arrow_clipped_outside_image() {
        let mut img = RgbImage::new(10, 10);
        draw_arrow(&mut img, (5, 5), (40, 5), ARROW_COLOR);
        assert_eq!(img.get_pixel(9, 5), &ARROW_COLOR);
        draw_arrow(&mut img, (2, 2), (2, 2), LINK_COLOR);
        assert_ne!(img.get_pixel(2, 2), &LINK_COLOR);
    }
}
