/// Lifecycle of a [`TrackerSession`](super::TrackerSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No configuration loaded, frames are rejected
    #[default]
    Idle,
    /// Configuration validated, frames are processed one at a time
    Running,
}
