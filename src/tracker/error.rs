use crate::tracker::angle_model::DetectionMode;

/// Problems found while loading or validating a tracking configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("mode {mode} requires a {role} color range")]
    MissingRange { mode: DetectionMode, role: &'static str },

    #[error("{role} color range has hue {hue}, hue must be at most 179")]
    HueOutOfRange { role: &'static str, hue: u8 },

    #[error("invalid line detection resolution (rho={rho} px, theta={theta_deg} deg)")]
    InvalidLineParams { rho: f64, theta_deg: f64 },

    #[error("invalid butterworth filter (order={order}, cutoff={cutoff_hz} Hz)")]
    InvalidFilter { order: usize, cutoff_hz: f64 },

    #[error("no conversion parameters for side {0:?}")]
    UnknownSide(String),

    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by [`TrackerSession`](super::TrackerSession) operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is not running")]
    NotRunning,
}
