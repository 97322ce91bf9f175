//! Per-frame tracking session: mask, locate, convert to an angle.

use image::RgbImage;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::tracker::angle_model::{self, AngleReading, DetectionMode};
use crate::tracker::blob_locator::{BlobLocator, BlobParams};
use crate::tracker::color_range::{ColorRange, MAX_HUE};
use crate::tracker::error::{ConfigError, SessionError};
use crate::tracker::hsv::HsvFrame;
use crate::tracker::line_locator::{LineLocator, LineParams, RodLine};
use crate::tracker::mask::{Mask, color_mask};
use crate::tracker::session_state::SessionState;

/// Tuning of the two locators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    pub blob: BlobParams,
    pub line: LineParams,
}

/// Mode and color ranges a session is started with.
///
/// Ranges not needed by the mode may be left out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionConfig {
    pub mode: DetectionMode,
    pub pivot: Option<ColorRange>,
    pub moving: Option<ColorRange>,
    pub rod: Option<ColorRange>,
}

impl SessionConfig {
    pub fn two_balls(pivot: ColorRange, moving: ColorRange) -> Self {
        Self {
            mode: DetectionMode::TwoBalls,
            pivot: Some(pivot),
            moving: Some(moving),
            rod: None,
        }
    }

    pub fn rod_and_ball(rod: ColorRange, moving: Option<ColorRange>) -> Self {
        Self {
            mode: DetectionMode::RodAndBall,
            pivot: None,
            moving,
            rod: Some(rod),
        }
    }

    /// Check bounds and pick out the ranges the mode needs.
    fn validate(&self) -> Result<Tracking, ConfigError> {
        for (role, range) in [("pivot", self.pivot), ("moving", self.moving), ("rod", self.rod)] {
            let Some(range) = range else { continue };
            let hue = range.max_hue();
            if hue > MAX_HUE {
                return Err(ConfigError::HueOutOfRange { role, hue });
            }
            if range.is_degenerate() {
                log::warn!("{role} color range has lower > upper, its mask will always be empty");
            }
        }

        let require = |range: Option<ColorRange>, role: &'static str| {
            range.ok_or(ConfigError::MissingRange {
                mode: self.mode,
                role,
            })
        };

        Ok(match self.mode {
            DetectionMode::TwoBalls => Tracking::TwoBalls {
                pivot: require(self.pivot, "pivot")?,
                moving: require(self.moving, "moving")?,
            },
            DetectionMode::RodAndBall => Tracking::RodAndBall {
                rod: require(self.rod, "rod")?,
                moving: self.moving,
            },
        })
    }
}

/// Validated, mode-specific ranges.
#[derive(Debug, Clone, Copy)]
enum Tracking {
    TwoBalls {
        pivot: ColorRange,
        moving: ColorRange,
    },
    RodAndBall {
        rod: ColorRange,
        moving: Option<ColorRange>,
    },
}

/// Everything computed for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDiagnostics {
    pub reading: AngleReading,
    pub pivot: Option<Point2<f64>>,
    pub moving: Option<Point2<f64>>,
    pub rod: Option<RodLine>,
    /// Cleaned mask of the moving ball (two balls) or of the rod.
    pub mask: Mask,
}

/// Drives frames through masking, localisation and the angle model.
///
/// Each frame is evaluated on its own: the reading never depends on earlier
/// frames. The session only keeps the last reading around for callers.
#[derive(Debug, Clone, Default)]
pub struct TrackerSession {
    blob_locator: BlobLocator,
    line_locator: LineLocator,
    tracking: Option<Tracking>,
    state: SessionState,
    latest: AngleReading,
    frames_processed: u64,
}

impl TrackerSession {
    pub fn new(params: TrackerParams) -> Self {
        Self {
            blob_locator: BlobLocator::new(params.blob),
            line_locator: LineLocator::new(params.line),
            ..Self::default()
        }
    }

    /// Validate `config` and the detection parameters, then start processing.
    /// Restarting replaces the configuration.
    pub fn start(&mut self, config: SessionConfig) -> Result<(), ConfigError> {
        self.line_locator.params().validate()?;
        let tracking = config.validate()?;
        self.tracking = Some(tracking);
        self.state = SessionState::Running;
        self.latest = AngleReading::invalid();
        self.frames_processed = 0;
        log::info!("tracking session started in {} mode", config.mode);
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == SessionState::Running {
            log::info!("tracking session stopped after {} frames", self.frames_processed);
        }
        self.tracking = None;
        self.state = SessionState::Idle;
        self.latest = AngleReading::invalid();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn mode(&self) -> Option<DetectionMode> {
        self.tracking.map(|t| match t {
            Tracking::TwoBalls { .. } => DetectionMode::TwoBalls,
            Tracking::RodAndBall { .. } => DetectionMode::RodAndBall,
        })
    }

    /// Reading of the most recent frame.
    pub fn latest(&self) -> AngleReading {
        self.latest
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Process one RGB frame. The frame is only borrowed for this call.
    pub fn process_frame(&mut self, frame: &RgbImage) -> Result<FrameDiagnostics, SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        self.process_hsv(&HsvFrame::from_rgb(frame))
    }

    /// Process one frame that is already in HSV.
    pub fn process_hsv(&mut self, frame: &HsvFrame) -> Result<FrameDiagnostics, SessionError> {
        let tracking = self.tracking.ok_or(SessionError::NotRunning)?;

        let diagnostics = match tracking {
            Tracking::TwoBalls { pivot, moving } => self.track_two_balls(frame, &pivot, &moving),
            Tracking::RodAndBall { rod, moving } => self.track_rod(frame, &rod, moving.as_ref()),
        };

        self.latest = diagnostics.reading;
        self.frames_processed += 1;
        match diagnostics.reading.value() {
            Some(angle) => log::debug!("frame {}: {:.2} deg", self.frames_processed, angle),
            None => log::debug!("frame {}: no detection", self.frames_processed),
        }
        Ok(diagnostics)
    }

    fn track_two_balls(
        &self,
        frame: &HsvFrame,
        pivot_range: &ColorRange,
        moving_range: &ColorRange,
    ) -> FrameDiagnostics {
        let pivot_mask = self.blob_locator.prepare(&color_mask(frame, pivot_range));
        let moving_mask = self.blob_locator.prepare(&color_mask(frame, moving_range));

        let pivot = self.blob_locator.locate_blob(&pivot_mask).map(|b| b.centroid);
        let moving = self.blob_locator.locate_blob(&moving_mask).map(|b| b.centroid);

        FrameDiagnostics {
            reading: angle_model::two_ball_reading(pivot, moving),
            pivot,
            moving,
            rod: None,
            mask: moving_mask,
        }
    }

    fn track_rod(
        &self,
        frame: &HsvFrame,
        rod_range: &ColorRange,
        moving_range: Option<&ColorRange>,
    ) -> FrameDiagnostics {
        let rod_mask = self.line_locator.prepare(&color_mask(frame, rod_range));
        let rod = self.line_locator.locate_line(&rod_mask);

        let moving = moving_range.and_then(|range| self.blob_locator.locate(&color_mask(frame, range)));

        FrameDiagnostics {
            reading: angle_model::rod_reading(rod.as_ref().map(|r| r.angle_deg)),
            pivot: None,
            moving,
            rod,
            mask: rod_mask,
        }
    }
}
