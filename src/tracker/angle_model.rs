//! Conversion of detected features into a signed angle from vertical.
//!
//! Angles are in degrees, `0` means hanging straight down and positive
//! values are clockwise as seen in the image (the lower end swings right).

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Which features a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// A fixed pivot ball and a moving ball.
    #[default]
    TwoBalls,
    /// A colored rod, optionally with a moving ball drawn for reference.
    RodAndBall,
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TwoBalls => write!(f, "two_balls"),
            Self::RodAndBall => write!(f, "rod_and_ball"),
        }
    }
}

/// Angle produced for one frame.
///
/// When `valid` is false nothing was detected and `degrees` carries no meaning.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleReading {
    pub degrees: f64,
    pub valid: bool,
}

impl AngleReading {
    pub fn valid(degrees: f64) -> Self {
        Self {
            degrees,
            valid: true,
        }
    }

    /// The "no detection" reading.
    pub fn invalid() -> Self {
        Self {
            degrees: 0.0,
            valid: false,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.valid.then_some(self.degrees)
    }
}

impl From<Option<f64>> for AngleReading {
    fn from(value: Option<f64>) -> Self {
        value.map_or_else(Self::invalid, Self::valid)
    }
}

/// Wrap an angle into `[-180, 180)`.
#[inline]
pub fn wrap_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Angle of the moving ball around the pivot.
///
/// Uses `atan2(dx, dy)` so that a ball directly below the pivot reads 0°
/// and a ball to the right reads +90°.
pub fn two_ball_angle(pivot: Point2<f64>, moving: Point2<f64>) -> f64 {
    let v = moving - pivot;
    wrap_degrees(v.x.atan2(v.y).to_degrees())
}

/// Convert an image-plane line orientation (0° = horizontal, 90° = down)
/// into the vertical reference.
pub fn rod_angle(image_angle_deg: f64) -> f64 {
    wrap_degrees(90.0 - image_angle_deg)
}

/// Two-ball reading, invalid unless both balls were found.
pub fn two_ball_reading(pivot: Option<Point2<f64>>, moving: Option<Point2<f64>>) -> AngleReading {
    match (pivot, moving) {
        (Some(p), Some(m)) => AngleReading::valid(two_ball_angle(p, m)),
        _ => AngleReading::invalid(),
    }
}

/// Rod reading, invalid unless a line was found.
pub fn rod_reading(image_angle_deg: Option<f64>) -> AngleReading {
    image_angle_deg.map(rod_angle).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_two_ball_cardinal_directions() {
        let p = Point2::new(0.0, 0.0);
        assert_abs_diff_eq!(two_ball_angle(p, Point2::new(0.0, 10.0)), 0.0);
        assert_abs_diff_eq!(two_ball_angle(p, Point2::new(10.0, 0.0)), 90.0);
        assert_abs_diff_eq!(two_ball_angle(p, Point2::new(-10.0, 0.0)), -90.0);
        assert_abs_diff_eq!(two_ball_angle(p, Point2::new(0.0, -10.0)).abs(), 180.0);
    }

    #[test]
    fn test_two_ball_diagonals() {
        let p = Point2::new(100.0, 100.0);
        assert_abs_diff_eq!(two_ball_angle(p, Point2::new(200.0, 200.0)), 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(two_ball_angle(p, Point2::new(0.0, 200.0)), -45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rod_angle_convention() {
        assert_abs_diff_eq!(rod_angle(90.0), 0.0);
        assert_abs_diff_eq!(rod_angle(0.0).abs(), 90.0);
        assert_abs_diff_eq!(rod_angle(180.0).abs(), 90.0);
        // Lower end to the right of the upper end.
        assert_abs_diff_eq!(rod_angle(45.0), 45.0);
        assert_abs_diff_eq!(rod_angle(135.0), -45.0);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_abs_diff_eq!(wrap_degrees(190.0), -170.0);
        assert_abs_diff_eq!(wrap_degrees(-190.0), 170.0);
        assert_abs_diff_eq!(wrap_degrees(720.0 + 45.0), 45.0);
        assert_abs_diff_eq!(wrap_degrees(180.0), -180.0);
    }

    #[test]
    fn test_missing_detection_is_invalid() {
        let reading = two_ball_reading(Some(Point2::new(0.0, 0.0)), None);
        assert!(!reading.valid);
        assert_eq!(reading.value(), None);
        assert!(!rod_reading(None).valid);
        assert_eq!(rod_reading(Some(90.0)).value(), Some(0.0));
    }

    #[test]
    fn test_mode_names() {
        let json = serde_json::to_string(&DetectionMode::RodAndBall).unwrap();
        assert_eq!(json, "\"rod_and_ball\"");
        assert_eq!(DetectionMode::TwoBalls.to_string(), "two_balls");
    }
}
