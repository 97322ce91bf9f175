//! SensorPipeline for combining a frame source with a tracking session.

use image::RgbImage;

use crate::tracker::{FrameDiagnostics, SessionError, TrackerSession};

use super::FrameSource;

/// Errors surfaced while driving a pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError<E> {
    #[error("frame source failed: {0}")]
    Source(E),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One processed frame together with its diagnostics.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 0-based position of the frame in the stream.
    pub index: u64,
    pub frame: RgbImage,
    pub diagnostics: FrameDiagnostics,
}

/// Bundles a [`FrameSource`] with a [`TrackerSession`].
///
/// The session must already be started. When the source runs dry the
/// session is stopped.
pub struct SensorPipeline<S: FrameSource> {
    source: S,
    session: TrackerSession,
    next_index: u64,
}

impl<S: FrameSource> SensorPipeline<S> {
    /// Create a pipeline from a source and a (started) session.
    pub fn new(source: S, session: TrackerSession) -> Self {
        Self {
            source,
            session,
            next_index: 0,
        }
    }

    /// Fetch and process a single frame.
    ///
    /// # Returns
    /// `Ok(None)` once the source is exhausted, otherwise the frame report.
    pub fn step(&mut self) -> Result<Option<FrameReport>, PipelineError<S::Error>> {
        if !self.session.is_running() {
            return Err(SessionError::NotRunning.into());
        }
        let Some(frame) = self.source.next_frame().map_err(PipelineError::Source)? else {
            self.session.stop();
            return Ok(None);
        };
        let diagnostics = self.session.process_frame(&frame)?;
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(FrameReport {
            index,
            frame,
            diagnostics,
        }))
    }

    /// Process frames until the source ends, handing each report to `on_frame`.
    ///
    /// Returning `false` from the callback stops early and leaves the session running.
    ///
    /// # Returns
    /// Number of frames processed.
    pub fn run<F>(&mut self, mut on_frame: F) -> Result<u64, PipelineError<S::Error>>
    where
        F: FnMut(&FrameReport) -> bool,
    {
        let mut processed = 0;
        while let Some(report) = self.step()? {
            processed += 1;
            if !on_frame(&report) {
                break;
            }
        }
        Ok(processed)
    }

    /// Get a reference to the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Get a reference to the underlying session.
    pub fn session(&self) -> &TrackerSession {
        &self.session
    }

    /// Get a mutable reference to the underlying session.
    pub fn session_mut(&mut self) -> &mut TrackerSession {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{ColorRange, Hsv, SessionConfig, SessionState};
    use std::collections::VecDeque;

    struct MockSource {
        frames: VecDeque<RgbImage>,
    }

    impl FrameSource for MockSource {
        type Error = std::convert::Infallible;

        fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error> {
            Ok(self.frames.pop_front())
        }
    }

    fn started_session() -> TrackerSession {
        let mut session = TrackerSession::default();
        let red = ColorRange::new(Hsv::new(0, 100, 100), Hsv::new(10, 255, 255));
        let blue = ColorRange::new(Hsv::new(110, 100, 100), Hsv::new(130, 255, 255));
        session.start(SessionConfig::two_balls(red, blue)).unwrap();
        session
    }

    #[test]
    fn test_runs_until_source_ends() {
        let source = MockSource {
            frames: (0..3).map(|_| RgbImage::new(16, 16)).collect(),
        };
        let mut pipeline = SensorPipeline::new(source, started_session());

        let mut indices = Vec::new();
        let processed = pipeline
            .run(|report| {
                indices.push(report.index);
                true
            })
            .unwrap();

        assert_eq!(processed, 3);
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(pipeline.session().state(), SessionState::Idle);
    }

    #[test]
    fn test_callback_can_stop_early() {
        let source = MockSource {
            frames: (0..5).map(|_| RgbImage::new(8, 8)).collect(),
        };
        let mut pipeline = SensorPipeline::new(source, started_session());
        let processed = pipeline.run(|report| report.index < 1).unwrap();
        assert_eq!(processed, 2);
        assert!(pipeline.session().is_running());
    }

    #[test]
    fn test_idle_session_is_rejected() {
        let source = MockSource {
            frames: VecDeque::from(vec![RgbImage::new(8, 8)]),
        };
        let mut pipeline = SensorPipeline::new(source, TrackerSession::default());
        assert!(matches!(
            pipeline.step(),
            Err(PipelineError::Session(SessionError::NotRunning))
        ));
    }
}
