//! Downstream conversion of angle readings into wind speed, with optional smoothing.
//!
//! Both live outside the per-frame core: the session stays memoryless and
//! only the low-pass filter here carries state between samples.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::tracker::{AngleReading, ConfigError};

/// Calibrated angle to speed conversion: `speed = k * sqrt(|tan(angle)|)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSpeedModel {
    pub scale_constant: f64,
}

impl WindSpeedModel {
    pub fn new(scale_constant: f64) -> Self {
        Self { scale_constant }
    }

    /// Speed for a raw angle in degrees.
    pub fn speed_for_angle(&self, degrees: f64) -> f64 {
        self.scale_constant * degrees.to_radians().tan().abs().sqrt()
    }

    /// Speed for a reading, `None` when nothing was detected.
    pub fn convert(&self, reading: AngleReading) -> Option<f64> {
        reading.value().map(|a| self.speed_for_angle(a))
    }
}

/// Butterworth low-pass settings as stored in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub order: usize,
    pub cutoff_hz: f64,
}

// One second-order (or first-order, when b2 = a2 = 0) section in transposed direct form II.
#[derive(Debug, Clone, Copy)]
struct Section {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Section {
    fn second_order(k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = 1.0 / (1.0 + k / q + k2);
        let b0 = k2 * norm;
        Self {
            b0,
            b1: 2.0 * b0,
            b2: b0,
            a1: 2.0 * (k2 - 1.0) * norm,
            a2: (1.0 - k / q + k2) * norm,
            z1: 0.0,
            z2: 0.0,
        }
    }

    fn first_order(k: f64) -> Self {
        let norm = 1.0 / (1.0 + k);
        let b0 = k * norm;
        Self {
            b0,
            b1: b0,
            b2: 0.0,
            a1: (k - 1.0) * norm,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// Digital Butterworth low-pass built from cascaded sections (bilinear transform).
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    sections: Vec<Section>,
}

impl ButterworthLowPass {
    /// Design a filter of `order` with a -3 dB point at `cutoff_hz` for samples at `sample_rate_hz`.
    pub fn new(order: usize, cutoff_hz: f64, sample_rate_hz: f64) -> Result<Self, ConfigError> {
        let nyquist = sample_rate_hz / 2.0;
        if order == 0 || !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(ConfigError::InvalidFilter { order, cutoff_hz });
        }

        let k = (PI * cutoff_hz / sample_rate_hz).tan();
        let n = order as f64;
        let mut sections: Vec<Section> = (0..order / 2)
            .map(|i| {
                let q = 1.0 / (2.0 * (PI * (2 * i + 1) as f64 / (2.0 * n)).sin());
                Section::second_order(k, q)
            })
            .collect();
        if order % 2 == 1 {
            sections.push(Section::first_order(k));
        }

        Ok(Self { sections })
    }

    pub fn from_settings(settings: &FilterSettings, sample_rate_hz: f64) -> Result<Self, ConfigError> {
        Self::new(settings.order, settings.cutoff_hz, sample_rate_hz)
    }

    /// Feed one sample and return the filtered value.
    pub fn filter(&mut self, x: f64) -> f64 {
        self.sections.iter_mut().fold(x, |acc, s| s.process(acc))
    }

    /// Clear the filter history.
    pub fn reset(&mut self) {
        for s in &mut self.sections {
            s.z1 = 0.0;
            s.z2 = 0.0;
        }
    }
}

/// Per-frame wind speed from angle readings, optionally smoothed.
///
/// The filter is fed once per frame so its time base stays at the frame
/// rate. Frames without a detection repeat the last raw speed; before the
/// first detection nothing is produced and the filter is left untouched.
#[derive(Debug, Clone)]
pub struct WindSpeedEstimator {
    model: WindSpeedModel,
    filter: Option<ButterworthLowPass>,
    last_raw: Option<f64>,
}

impl WindSpeedEstimator {
    pub fn new(model: WindSpeedModel, filter: Option<ButterworthLowPass>) -> Self {
        Self {
            model,
            filter,
            last_raw: None,
        }
    }

    /// Advance by one frame and return the (filtered) speed.
    pub fn update(&mut self, reading: AngleReading) -> Option<f64> {
        let raw = self.model.convert(reading).or(self.last_raw)?;
        self.last_raw = Some(raw);
        Some(match self.filter.as_mut() {
            Some(f) => f.filter(raw),
            None => raw,
        })
    }

    pub fn reset(&mut self) {
        self.last_raw = None;
        if let Some(f) = self.filter.as_mut() {
            f.reset();
        }
    }
}
