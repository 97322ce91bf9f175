//! Integration module for connecting frame sources, configuration files and
//! downstream consumers with the tracking core.
//!
//! This module provides the frame source trait, a pipeline driver, the JSON
//! configuration record, overlay rendering and the wind speed conversion.

mod builder;
mod config;
mod frame_source;
mod overlay;
mod pipeline;
mod wind_speed;

pub use builder::ColorRangeBuilder;
pub use config::{BallColors, SensorConfig, SerialSettings};
pub use frame_source::{FrameSource, ImageSequence, ImageSequenceError};
pub use overlay::{OverlayOptions, draw_arrow, render_overlay};
pub use pipeline::{FrameReport, PipelineError, SensorPipeline};
pub use wind_speed::{ButterworthLowPass, FilterSettings, WindSpeedEstimator, WindSpeedModel};
