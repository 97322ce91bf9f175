//! Contactless angle sensing from camera frames.
//!
//! A [`TrackerSession`] turns each frame into an [`AngleReading`]: colored
//! objects are segmented with HSV [`ColorRange`]s, located as blobs (two-ball
//! mode) or as a line (rod mode), and converted into a signed angle from
//! vertical. The [`integration`] module wires sessions to frame sources,
//! configuration files and downstream consumers.
//!
//! ```no_run
//! use angletrack_rs::{SensorConfig, TrackerSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SensorConfig::load("config.json")?;
//! let mut session = TrackerSession::new(config.detection);
//! session.start(config.session_config())?;
//!
//! let frame = image::open("frame.png")?.to_rgb8();
//! let diagnostics = session.process_frame(&frame)?;
//! if let Some(angle) = diagnostics.reading.value() {
//!     println!("{angle:.2}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod integration;
pub mod tracker;

pub use integration::{
    ColorRangeBuilder, FrameSource, ImageSequence, OverlayOptions, SensorConfig, SensorPipeline,
    render_overlay,
};
pub use tracker::{
    AngleReading, ColorRange, ConfigError, DetectionMode, FrameDiagnostics, Hsv, SessionConfig,
    SessionError, SessionState, TrackerParams, TrackerSession,
};
