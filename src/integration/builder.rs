//! Builder for creating ColorRange values from sampled colors.

use crate::tracker::{ColorRange, Hsv, MAX_HUE, rgb_to_hsv};

/// Builder for `ColorRange` values.
///
/// Either set explicit bounds, or sample the object's color and widen it by
/// per-channel tolerances. Saturation and value are open upward by default,
/// since a brighter or more saturated sample of the same hue still belongs
/// to the object.
#[derive(Debug, Clone)]
pub struct ColorRangeBuilder {
    lower: Hsv,
    upper: Hsv,
    center: Option<Hsv>,
    hue_tolerance: u8,
    saturation_tolerance: u8,
    value_tolerance: u8,
    open_upper: bool,
}

impl Default for ColorRangeBuilder {
    fn default() -> Self {
        let full = ColorRange::full();
        Self {
            lower: full.lower,
            upper: full.upper,
            center: None,
            hue_tolerance: 10,
            saturation_tolerance: 50,
            value_tolerance: 50,
            open_upper: true,
        }
    }
}

impl ColorRangeBuilder {
    /// Create a new builder covering every color.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lower bound.
    pub fn lower(mut self, h: u8, s: u8, v: u8) -> Self {
        self.center = None;
        self.lower = Hsv::new(h, s, v);
        self
    }

    /// Set the upper bound.
    pub fn upper(mut self, h: u8, s: u8, v: u8) -> Self {
        self.center = None;
        self.upper = Hsv::new(h, s, v);
        self
    }

    /// Center the range on a sampled HSV color.
    pub fn around(mut self, hsv: Hsv) -> Self {
        self.center = Some(hsv);
        self
    }

    /// Center the range on a sampled RGB color.
    pub fn around_rgb(self, r: u8, g: u8, b: u8) -> Self {
        self.around(rgb_to_hsv(r, g, b))
    }

    /// Set the hue tolerance on either side of the sample.
    pub fn hue_tolerance(mut self, tol: u8) -> Self {
        self.hue_tolerance = tol;
        self
    }

    /// Set the saturation tolerance below (and above, unless open) the sample.
    pub fn saturation_tolerance(mut self, tol: u8) -> Self {
        self.saturation_tolerance = tol;
        self
    }

    /// Set the value tolerance below (and above, unless open) the sample.
    pub fn value_tolerance(mut self, tol: u8) -> Self {
        self.value_tolerance = tol;
        self
    }

    /// Make saturation and value symmetric around the sample instead of open to 255.
    pub fn symmetric(mut self) -> Self {
        self.open_upper = false;
        self
    }

    /// Build the final `ColorRange`. Bounds are clamped into the valid HSV domain.
    pub fn build(self) -> ColorRange {
        let Some(c) = self.center else {
            return ColorRange::new(
                Hsv::new(self.lower.h.min(MAX_HUE), self.lower.s, self.lower.v),
                Hsv::new(self.upper.h.min(MAX_HUE), self.upper.s, self.upper.v),
            );
        };

        let upper_sv = |x: u8, tol: u8| if self.open_upper { 255 } else { x.saturating_add(tol) };
        ColorRange::new(
            Hsv::new(
                c.h.saturating_sub(self.hue_tolerance),
                c.s.saturating_sub(self.saturation_tolerance),
                c.v.saturating_sub(self.value_tolerance),
            ),
            Hsv::new(
                c.h.saturating_add(self.hue_tolerance).min(MAX_HUE),
                upper_sv(c.s, self.saturation_tolerance),
                upper_sv(c.v, self.value_tolerance),
            ),
        )
    }
}
