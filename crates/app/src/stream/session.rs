//! Per-client frame loop.
//!
//! One session owns the stream resources for the lifetime of one connected
//! client. Every iteration pulls a frame, runs detection, annotates, pushes
//! the finger count, writes the frame to the virtual camera, then paces to
//! the target rate. The first failure of any stage ends the session and
//! returns the server to idle; the resources themselves stay up.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use hand_core::{count_hands, HandPolicy, LandmarkDetector};
use thiserror::Error;
use tracing::debug;
use video_io::{CaptureError, FrameSink, FrameSource, SinkError};

use crate::stream::annotation;

/// Why a session iteration failed. Each seam keeps its own kind so callers
/// and tests can assert on what broke, not just that something did.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("camera device error")]
    Device(#[source] CaptureError),
    #[error("hand detector error")]
    Detector(#[source] anyhow::Error),
    #[error("notification transport error")]
    Transport(#[source] anyhow::Error),
    #[error("virtual camera sink error")]
    Sink(#[source] SinkError),
    #[error("frame annotation error")]
    Annotate(#[source] anyhow::Error),
}

/// A session that ended without an error.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    Cancelled,
}

/// Push side of the notification channel: one count per processed frame.
pub(crate) trait CountNotifier {
    fn send_count(&mut self, count: u8) -> anyhow::Result<()>;
}

/// Remaining wait before the next iteration may start; never negative.
pub(crate) fn pacing_delay(frame_interval: Duration, elapsed: Duration) -> Duration {
    frame_interval.saturating_sub(elapsed)
}

/// Run the frame loop until a stage fails or shutdown is signalled.
pub(crate) fn run_session(
    source: &mut dyn FrameSource,
    detector: &mut dyn LandmarkDetector,
    sink: &mut dyn FrameSink,
    notifier: &mut dyn CountNotifier,
    policy: HandPolicy,
    frame_interval: Duration,
    shutdown: &AtomicBool,
) -> Result<SessionEnd, SessionError> {
    let mut frame_number: u64 = 0;
    let mut smoothed_fps: f32 = 0.0;
    let mut last_instant = Instant::now();

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(SessionEnd::Cancelled);
        }

        let started = Instant::now();

        let frame = source.read().map_err(SessionError::Device)?;
        frame_number = frame_number.wrapping_add(1);

        let elapsed = started.duration_since(last_instant).as_secs_f32();
        last_instant = started;
        if elapsed > 0.0 {
            let instant = 1.0 / elapsed;
            smoothed_fps = if smoothed_fps == 0.0 {
                instant
            } else {
                0.9 * smoothed_fps + 0.1 * instant
            };
        }

        let rgb = annotation::bgr_to_rgb(&frame.data);
        let hands = detector
            .detect(&rgb, frame.width as u32, frame.height as u32)
            .map_err(SessionError::Detector)?;
        let count = count_hands(&hands, policy);

        let annotated =
            annotation::annotate_frame(&frame, rgb, &hands, count, frame_number, smoothed_fps)
                .map_err(SessionError::Annotate)?;

        notifier.send_count(count).map_err(SessionError::Transport)?;
        sink.write_frame(&annotated).map_err(SessionError::Sink)?;

        if frame_number % 30 == 0 {
            debug!(
                "session heartbeat: frame #{}, {:.1} fps, count {}",
                frame_number, smoothed_fps, count
            );
        }

        let delay = pacing_delay(frame_interval, started.elapsed());
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use hand_core::HandLandmarks;
    use video_io::{Frame, FrameFormat};

    struct ScriptedSource {
        frames: Vec<Result<Frame, CaptureError>>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Result<Frame, CaptureError>>) -> Self {
            let mut frames = frames;
            frames.reverse();
            Self { frames }
        }
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            self.frames.pop().unwrap_or(Err(CaptureError::Eof))
        }
    }

    struct NoHands;

    impl LandmarkDetector for NoHands {
        fn detect(&mut self, _rgb: &[u8], _w: u32, _h: u32) -> anyhow::Result<Vec<HandLandmarks>> {
            Ok(Vec::new())
        }
    }

    struct FailingDetector;

    impl LandmarkDetector for FailingDetector {
        fn detect(&mut self, _rgb: &[u8], _w: u32, _h: u32) -> anyhow::Result<Vec<HandLandmarks>> {
            Err(anyhow!("model exploded"))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<Vec<u8>>,
    }

    impl FrameSink for RecordingSink {
        fn write_frame(&mut self, data: &[u8]) -> Result<(), SinkError> {
            self.frames.push(data.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        counts: Vec<u8>,
        fail_after: Option<usize>,
    }

    impl CountNotifier for RecordingNotifier {
        fn send_count(&mut self, count: u8) -> anyhow::Result<()> {
            if let Some(limit) = self.fail_after {
                if self.counts.len() >= limit {
                    return Err(anyhow!("peer went away"));
                }
            }
            self.counts.push(count);
            Ok(())
        }
    }

    fn test_frame() -> Frame {
        Frame {
            data: vec![0u8; 4 * 2 * 3],
            width: 4,
            height: 2,
            timestamp_ms: 0,
            format: FrameFormat::Bgr8,
        }
    }

    fn run(
        source: &mut dyn FrameSource,
        detector: &mut dyn LandmarkDetector,
        sink: &mut RecordingSink,
        notifier: &mut RecordingNotifier,
    ) -> Result<SessionEnd, SessionError> {
        let shutdown = AtomicBool::new(false);
        run_session(
            source,
            detector,
            sink,
            notifier,
            HandPolicy::LastHand,
            Duration::ZERO,
            &shutdown,
        )
    }

    #[test]
    fn read_failure_exits_without_sending_a_stale_count() {
        let mut source = ScriptedSource::new(vec![Err(CaptureError::Eof)]);
        let mut sink = RecordingSink::default();
        let mut notifier = RecordingNotifier::default();

        let outcome = run(&mut source, &mut NoHands, &mut sink, &mut notifier);

        assert!(matches!(outcome, Err(SessionError::Device(_))));
        assert!(notifier.counts.is_empty());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn read_failure_after_a_good_frame_keeps_only_the_good_count() {
        let mut source = ScriptedSource::new(vec![Ok(test_frame()), Err(CaptureError::Eof)]);
        let mut sink = RecordingSink::default();
        let mut notifier = RecordingNotifier::default();

        let outcome = run(&mut source, &mut NoHands, &mut sink, &mut notifier);

        assert!(matches!(outcome, Err(SessionError::Device(_))));
        assert_eq!(notifier.counts, vec![0]);
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].len(), 24);
    }

    #[test]
    fn detector_failure_maps_to_its_own_kind() {
        let mut source = ScriptedSource::new(vec![Ok(test_frame())]);
        let mut sink = RecordingSink::default();
        let mut notifier = RecordingNotifier::default();

        let outcome = run(&mut source, &mut FailingDetector, &mut sink, &mut notifier);

        assert!(matches!(outcome, Err(SessionError::Detector(_))));
        assert!(notifier.counts.is_empty());
    }

    #[test]
    fn send_failure_maps_to_transport_and_skips_the_sink() {
        let mut source = ScriptedSource::new(vec![Ok(test_frame()), Ok(test_frame())]);
        let mut sink = RecordingSink::default();
        let mut notifier = RecordingNotifier {
            counts: Vec::new(),
            fail_after: Some(1),
        };

        let outcome = run(&mut source, &mut NoHands, &mut sink, &mut notifier);

        assert!(matches!(outcome, Err(SessionError::Transport(_))));
        assert_eq!(notifier.counts.len(), 1);
        assert_eq!(sink.frames.len(), 1);
    }

    #[test]
    fn shutdown_flag_cancels_before_the_next_read() {
        let mut source = ScriptedSource::new(vec![Ok(test_frame())]);
        let mut sink = RecordingSink::default();
        let mut notifier = RecordingNotifier::default();
        let shutdown = AtomicBool::new(true);

        let outcome = run_session(
            &mut source,
            &mut NoHands,
            &mut sink,
            &mut notifier,
            HandPolicy::LastHand,
            Duration::ZERO,
            &shutdown,
        );

        assert!(matches!(outcome, Ok(SessionEnd::Cancelled)));
        assert!(notifier.counts.is_empty());
    }

    #[test]
    fn overlong_iterations_get_a_zero_delay() {
        assert_eq!(
            pacing_delay(Duration::from_millis(33), Duration::from_millis(50)),
            Duration::ZERO
        );
        assert_eq!(
            pacing_delay(Duration::from_millis(33), Duration::from_millis(13)),
            Duration::from_millis(20)
        );
    }
}
