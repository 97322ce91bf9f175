//! HSV color ranges used to segment tracked objects.

use serde::{Deserialize, Serialize};

/// Largest hue value in the 8-bit HSV convention (degrees halved).
pub const MAX_HUE: u8 = 179;

/// A single 8-bit HSV triple.
///
/// Hue is in `[0, 179]`, saturation and value are in `[0, 255]`.
/// Serialized as a `[h, s, v]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    #[inline]
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }
}

impl From<[u8; 3]> for Hsv {
    fn from([h, s, v]: [u8; 3]) -> Self {
        Self { h, s, v }
    }
}

impl From<Hsv> for [u8; 3] {
    fn from(hsv: Hsv) -> Self {
        [hsv.h, hsv.s, hsv.v]
    }
}

/// Closed HSV interval: a pixel matches when every channel lies in `[lower, upper]`.
///
/// A range whose lower bound exceeds its upper bound on any channel is legal
/// but degenerate: it never matches anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    pub const fn new(lower: Hsv, upper: Hsv) -> Self {
        Self { lower, upper }
    }

    /// Range covering every representable HSV value.
    pub const fn full() -> Self {
        Self {
            lower: Hsv::new(0, 0, 0),
            upper: Hsv::new(MAX_HUE, 255, 255),
        }
    }

    /// Check whether a pixel lies inside the range (bounds inclusive).
    #[inline]
    pub fn contains(&self, px: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&px.h)
            && (self.lower.s..=self.upper.s).contains(&px.s)
            && (self.lower.v..=self.upper.v).contains(&px.v)
    }

    /// True when some channel has `lower > upper`, so the mask is always empty.
    pub fn is_degenerate(&self) -> bool {
        self.lower.h > self.upper.h || self.lower.s > self.upper.s || self.lower.v > self.upper.v
    }

    /// Largest hue appearing in either bound.
    pub fn max_hue(&self) -> u8 {
        self.lower.h.max(self.upper.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let range = ColorRange::new(Hsv::new(10, 100, 100), Hsv::new(20, 200, 200));
        assert!(range.contains(Hsv::new(10, 100, 100)));
        assert!(range.contains(Hsv::new(20, 200, 200)));
        assert!(range.contains(Hsv::new(15, 150, 150)));
        assert!(!range.contains(Hsv::new(9, 150, 150)));
        assert!(!range.contains(Hsv::new(15, 201, 150)));
        assert!(!range.contains(Hsv::new(15, 150, 99)));
    }

    #[test]
    fn test_degenerate_range_matches_nothing() {
        let range = ColorRange::new(Hsv::new(50, 0, 0), Hsv::new(40, 255, 255));
        assert!(range.is_degenerate());
        for h in 0..=MAX_HUE {
            assert!(!range.contains(Hsv::new(h, 128, 128)));
        }
    }

    #[test]
    fn test_serializes_as_arrays() {
        let range = ColorRange::new(Hsv::new(0, 100, 100), Hsv::new(10, 255, 255));
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"lower":[0,100,100],"upper":[10,255,255]}"#);
        let back: ColorRange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, range);
    }
}
