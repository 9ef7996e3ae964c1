//! Prometheus metrics for the capture-and-serve loop.
//!
//! Exposed in text format at `GET /metrics`.
//!
//! # Metrics Exposed
//!
//! ## Pipeline Metrics
//! - `optical_stream_frames_captured_total` - Frames read from the capture source
//! - `optical_stream_frames_emitted_total` - Encoded frames handed to responses
//! - `optical_stream_capture_errors_total` - Failed capture reads
//! - `optical_stream_encode_errors_total` - Failed JPEG encodes
//!
//! ## Client Metrics
//! - `optical_stream_snapshots_total` - Snapshot requests
//! - `optical_stream_active_streams` - Stream clients currently connected
//!
//! # Example
//!
//! ```
//! use optical_stream::metrics::StreamMetrics;
//!
//! let metrics = StreamMetrics::new().expect("Failed to create registry");
//! metrics.frame_captured();
//!
//! assert!(metrics
//!     .encode()
//!     .unwrap()
//!     .contains("optical_stream_frames_captured_total 1"));
//! ```

mod collector;

pub use collector::{MetricsError, StreamMetrics};
