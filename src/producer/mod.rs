//! Per-request capture → transform → encode → emit loop.
//!
//! Every HTTP request gets its own [`StreamProducer`] bound to the shared
//! capture source and the process configuration. A producer steps through
//!
//! ```text
//! Idle → Capturing → Transforming → Encoding → Emitting → Pacing → Capturing …
//!                                                      ↘ Done
//! ```
//!
//! and ends in `Failed` if capture or encoding fails. The source lock is
//! held only while a frame is being read.
//!
//! The producer itself is synchronous and pull-based. [`FrameStream`] drives
//! it from async code for the HTTP layer; the `Iterator` impl drives it on
//! the current thread.

pub mod multipart;
mod stream;

pub use stream::FrameStream;

use crate::capture::{CaptureError, Frame, SharedSource};
use crate::config::Config;
use crate::encode::{encode, EncodeError};
use crate::metrics::StreamMetrics;
use crate::pacer::Pacer;
use crate::transform;
use bytes::Bytes;
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use thiserror::Error;

/// Errors that end a producer.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("producer task failed: {0}")]
    Task(String),
}

/// What a producer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerMode {
    /// One bare JPEG, then done.
    Snapshot,
    /// Multipart parts until the consumer stops pulling.
    Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Idle,
    Capturing,
    Transforming,
    Encoding,
    Emitting,
    Pacing,
    Done,
    Failed,
}

/// Drives one client's frames from the shared capture source.
pub struct StreamProducer {
    source: SharedSource,
    config: Arc<Config>,
    metrics: Arc<StreamMetrics>,
    mode: ProducerMode,
    pacer: Pacer,
    state: ProducerState,
    iteration_started: Option<Instant>,
}

impl StreamProducer {
    pub fn new(
        source: SharedSource,
        config: Arc<Config>,
        metrics: Arc<StreamMetrics>,
        mode: ProducerMode,
    ) -> Self {
        let pacer = match mode {
            ProducerMode::Snapshot => Pacer::unlimited(),
            ProducerMode::Stream => Pacer::new(config.stream.framerate),
        };

        Self {
            source,
            config,
            metrics,
            mode,
            pacer,
            state: ProducerState::Idle,
            iteration_started: None,
        }
    }

    #[inline]
    pub fn state(&self) -> ProducerState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> ProducerMode {
        self.mode
    }

    #[inline]
    pub fn pacer(&self) -> Pacer {
        self.pacer
    }

    /// Whether the producer has reached `Done` or `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ProducerState::Done | ProducerState::Failed)
    }

    /// Produces the next chunk: a bare JPEG in snapshot mode, a multipart
    /// part in stream mode.
    ///
    /// Returns `Ok(None)` once the producer is finished. An error moves the
    /// producer to `Failed`; there is no retry.
    pub fn produce(&mut self) -> Result<Option<Bytes>, ProducerError> {
        if self.is_finished() {
            return Ok(None);
        }

        self.iteration_started = Some(Instant::now());
        match self.run_iteration() {
            Ok(chunk) => {
                self.metrics.frame_emitted();
                if self.mode == ProducerMode::Snapshot {
                    self.state = ProducerState::Done;
                }
                Ok(Some(chunk))
            }
            Err(e) => {
                self.state = ProducerState::Failed;
                tracing::error!(error = %e, mode = ?self.mode, "Producer failed");
                Err(e)
            }
        }
    }

    /// Moves a stream producer that just emitted into `Pacing`, returning
    /// when its iteration began so the caller can sleep out the period.
    pub fn enter_pacing(&mut self) -> Option<Instant> {
        if self.mode != ProducerMode::Stream || self.state != ProducerState::Emitting {
            return None;
        }
        self.state = ProducerState::Pacing;
        self.iteration_started
    }

    /// Ends the producer after its consumer went away.
    pub fn finish(&mut self) {
        if self.state != ProducerState::Failed {
            self.state = ProducerState::Done;
        }
    }

    fn run_iteration(&mut self) -> Result<Bytes, ProducerError> {
        let config = Arc::clone(&self.config);
        let stream = &config.stream;

        self.state = ProducerState::Capturing;
        let frame = self.capture()?;

        self.state = ProducerState::Transforming;
        let frame = transform::apply(
            frame,
            stream.flip_horizontal,
            stream.flip_vertical,
            stream.rotate,
        );

        self.state = ProducerState::Encoding;
        let jpeg = match encode(&frame, stream.quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                self.metrics.encode_failed();
                return Err(e.into());
            }
        };

        self.state = ProducerState::Emitting;
        Ok(match self.mode {
            ProducerMode::Snapshot => jpeg,
            ProducerMode::Stream => multipart::part(&jpeg),
        })
    }

    fn capture(&self) -> Result<Frame, ProducerError> {
        let result = {
            // A panic in another producer must not take the camera down with it.
            let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
            source.read_frame()
        };

        match result {
            Ok(frame) => {
                self.metrics.frame_captured();
                Ok(frame)
            }
            Err(e) => {
                self.metrics.capture_failed();
                Err(e.into())
            }
        }
    }
}

impl Iterator for StreamProducer {
    type Item = Result<Bytes, ProducerError>;

    /// Blocks for pacing and capture on the calling thread.
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(started) = self.enter_pacing() {
            self.pacer.pace_blocking(started);
        }
        self.produce().transpose()
    }
}

impl std::fmt::Debug for StreamProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProducer")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("pacer", &self.pacer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{share, CaptureSource, MockCamera, PixelFormat};
    use crate::transform::Rotation;
    use image::GenericImageView;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn config(framerate: u32) -> Arc<Config> {
        let mut config = Config::default();
        config.stream.framerate = framerate;
        Arc::new(config)
    }

    fn metrics() -> Arc<StreamMetrics> {
        Arc::new(StreamMetrics::new().unwrap())
    }

    fn jpeg_of(part: &[u8]) -> &[u8] {
        const HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
        assert!(part.starts_with(HEADER));
        assert!(part.ends_with(b"\r\n"));
        &part[HEADER.len()..part.len() - 2]
    }

    fn sequence_of(jpeg: &[u8]) -> u64 {
        MockCamera::read_sequence(&image::load_from_memory(jpeg).unwrap().to_luma8())
    }

    #[test]
    fn test_snapshot_emits_one_bare_jpeg() {
        let mut producer = StreamProducer::new(
            share(MockCamera::default()),
            config(60),
            metrics(),
            ProducerMode::Snapshot,
        );
        assert_eq!(producer.state(), ProducerState::Idle);

        let jpeg = producer.produce().unwrap().unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(producer.state(), ProducerState::Done);

        assert!(producer.produce().unwrap().is_none());
        assert!(producer.next().is_none());
    }

    #[test]
    fn test_stream_emits_multipart_parts() {
        let camera = MockCamera::default();
        let captures = camera.capture_counter();
        let producer = StreamProducer::new(share(camera), config(0), metrics(), ProducerMode::Stream);

        let parts: Vec<Bytes> = producer.take(5).map(Result::unwrap).collect();
        assert_eq!(parts.len(), 5);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(sequence_of(jpeg_of(part)), i as u64 + 1);
        }
        assert_eq!(captures.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_state_after_emit_and_pacing() {
        let mut producer = StreamProducer::new(
            share(MockCamera::default()),
            config(0),
            metrics(),
            ProducerMode::Stream,
        );

        assert!(producer.enter_pacing().is_none());
        producer.produce().unwrap();
        assert_eq!(producer.state(), ProducerState::Emitting);
        assert!(producer.enter_pacing().is_some());
        assert_eq!(producer.state(), ProducerState::Pacing);

        producer.finish();
        assert_eq!(producer.state(), ProducerState::Done);
        assert!(producer.produce().unwrap().is_none());
    }

    #[test]
    fn test_capture_failure_is_terminal() {
        let metrics = metrics();
        let mut producer = StreamProducer::new(
            share(MockCamera::default().fail_on_capture(2)),
            config(0),
            Arc::clone(&metrics),
            ProducerMode::Stream,
        );

        assert!(producer.next().unwrap().is_ok());
        assert!(matches!(
            producer.next(),
            Some(Err(ProducerError::Capture(CaptureError::CaptureFailed(_))))
        ));
        assert_eq!(producer.state(), ProducerState::Failed);
        assert!(producer.next().is_none());

        producer.finish();
        assert_eq!(producer.state(), ProducerState::Failed);
        assert!(metrics.encode().unwrap().contains("optical_stream_capture_errors_total 1"));
    }

    struct Malformed;

    impl CaptureSource for Malformed {
        fn configure(&mut self, _: u32, _: u32) -> Result<(), CaptureError> {
            Ok(())
        }

        fn set_manual_focus(&mut self, _: i32) -> Result<(), CaptureError> {
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Frame, CaptureError> {
            Ok(Frame::new(vec![0; 5], 8, 8, PixelFormat::Bgr8, 1))
        }
    }

    #[test]
    fn test_encode_failure_is_terminal() {
        let mut producer =
            StreamProducer::new(share(Malformed), config(0), metrics(), ProducerMode::Snapshot);

        assert!(matches!(producer.produce(), Err(ProducerError::Encode(_))));
        assert_eq!(producer.state(), ProducerState::Failed);
    }

    #[test]
    fn test_transforms_applied() {
        let mut config = Config::default();
        config.stream.rotate = Rotation::Clockwise90;
        let mut producer = StreamProducer::new(
            share(MockCamera::new(64, 16)),
            Arc::new(config),
            metrics(),
            ProducerMode::Snapshot,
        );

        let jpeg = producer.produce().unwrap().unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (16, 64));
    }

    #[test]
    fn test_stream_respects_framerate() {
        let producer = StreamProducer::new(
            share(MockCamera::default()),
            config(20),
            metrics(),
            ProducerMode::Stream,
        );

        let started = Instant::now();
        let parts = producer.take(4).filter(Result::is_ok).count();
        let elapsed = started.elapsed();

        // Three full periods separate four frames.
        assert_eq!(parts, 4);
        assert!(elapsed >= Duration::from_millis(150), "took {:?}", elapsed);
    }

    #[test]
    fn test_concurrent_producers_see_increasing_frames() {
        let source = share(MockCamera::default().with_read_delay(Duration::from_millis(1)));
        let config = config(0);
        let metrics = metrics();

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let producer = StreamProducer::new(
                    Arc::clone(&source),
                    Arc::clone(&config),
                    Arc::clone(&metrics),
                    ProducerMode::Stream,
                );
                std::thread::spawn(move || {
                    producer
                        .take(15)
                        .map(|part| sequence_of(jpeg_of(&part.unwrap())))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = Vec::new();
        for worker in workers {
            let sequences = worker.join().unwrap();
            assert!(sequences.windows(2).all(|w| w[0] <= w[1]), "{:?}", sequences);
            all.extend(sequences);
        }

        // Each capture went to exactly one producer.
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 45);
        assert_eq!(metrics.frames_captured(), 45);
    }
}
