mod angle_model;
mod blob_locator;
mod color_range;
mod error;
mod hsv;
mod line_locator;
mod mask;
mod session;
mod session_state;

pub use angle_model::{
    AngleReading, DetectionMode, rod_angle, rod_reading, two_ball_angle, two_ball_reading,
    wrap_degrees,
};
pub use blob_locator::{Blob, BlobLocator, BlobParams, largest_component};
pub use color_range::{ColorRange, Hsv, MAX_HUE};
pub use error::{ConfigError, SessionError};
pub use hsv::{HsvFrame, rgb_to_hsv};
pub use line_locator::{LineLocator, LineParams, RodLine, Segment, hough_segments, weighted_orientation};
pub use mask::{KERNEL_RADIUS, Mask, color_mask};
pub use session::{FrameDiagnostics, SessionConfig, TrackerParams, TrackerSession};
pub use session_state::SessionState;
