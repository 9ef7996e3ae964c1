//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the capture-and-serve loop.
///
/// Counters are updated directly by producers; the registry is shared
/// behind an `Arc` and is cheap to update from many tasks at once.
pub struct StreamMetrics {
    registry: Registry,

    // Pipeline metrics
    frames_captured: IntCounter,
    frames_emitted: IntCounter,
    capture_errors: IntCounter,
    encode_errors: IntCounter,

    // Client metrics
    snapshots: IntCounter,
    active_streams: IntGauge,
}

impl StreamMetrics {
    /// Creates a new metrics registry with all stream metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_captured = IntCounter::new(
            "optical_stream_frames_captured_total",
            "Frames successfully read from the capture source",
        )?;
        let frames_emitted = IntCounter::new(
            "optical_stream_frames_emitted_total",
            "Encoded frames handed to HTTP responses",
        )?;
        let capture_errors = IntCounter::new(
            "optical_stream_capture_errors_total",
            "Failed reads from the capture source",
        )?;
        let encode_errors = IntCounter::new(
            "optical_stream_encode_errors_total",
            "Frames that failed JPEG encoding",
        )?;
        let snapshots = IntCounter::new(
            "optical_stream_snapshots_total",
            "Snapshot requests received",
        )?;
        let active_streams = IntGauge::new(
            "optical_stream_active_streams",
            "Stream clients currently connected",
        )?;

        registry.register(Box::new(frames_captured.clone()))?;
        registry.register(Box::new(frames_emitted.clone()))?;
        registry.register(Box::new(capture_errors.clone()))?;
        registry.register(Box::new(encode_errors.clone()))?;
        registry.register(Box::new(snapshots.clone()))?;
        registry.register(Box::new(active_streams.clone()))?;

        Ok(Self {
            registry,
            frames_captured,
            frames_emitted,
            capture_errors,
            encode_errors,
            snapshots,
            active_streams,
        })
    }

    pub fn frame_captured(&self) {
        self.frames_captured.inc();
    }

    pub fn frame_emitted(&self) {
        self.frames_emitted.inc();
    }

    pub fn capture_failed(&self) {
        self.capture_errors.inc();
    }

    pub fn encode_failed(&self) {
        self.encode_errors.inc();
    }

    pub fn snapshot_requested(&self) {
        self.snapshots.inc();
    }

    pub fn stream_opened(&self) {
        self.active_streams.inc();
    }

    pub fn stream_closed(&self) {
        self.active_streams.dec();
    }

    /// Number of stream clients currently connected.
    pub fn active_streams(&self) -> i64 {
        self.active_streams.get()
    }

    /// Total frames read from the capture source.
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured.get()
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for StreamMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamMetrics")
            .field("frames_captured", &self.frames_captured.get())
            .field("frames_emitted", &self.frames_emitted.get())
            .field("active_streams", &self.active_streams.get())
            .finish()
    }
}
