//! Optical Stream Library
//!
//! Serves a camera over HTTP as a live MJPEG stream and as single JPEG
//! snapshots.
//!
//! # Architecture
//!
//! Every request runs its own producer over one shared capture source:
//!
//! ```text
//! capture → transform → encode → emit ─┬─ snapshot: done
//!    ↑                                 └─ stream: pace ─┐
//!    └──────────────────────────────────────────────────┘
//! ```
//!
//! The capture source is the only shared mutable resource. Its lock is held
//! for the duration of a single frame read; transform and encode run
//! outside it, so a slow client only ever stalls its own producer.
//!
//! # Example
//!
//! ```
//! use optical_stream::{
//!     capture::{share, MockCamera},
//!     metrics::StreamMetrics,
//!     producer::{ProducerMode, StreamProducer},
//!     Config,
//! };
//! use std::sync::Arc;
//!
//! let source = share(MockCamera::default());
//! let config = Arc::new(Config::default());
//! let metrics = Arc::new(StreamMetrics::new().unwrap());
//!
//! let mut snapshot = StreamProducer::new(source, config, metrics, ProducerMode::Snapshot);
//! let jpeg = snapshot.produce().unwrap().unwrap();
//! assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod encode;
pub mod metrics;
pub mod pacer;
pub mod producer;
pub mod server;
pub mod transform;

// Re-export commonly used types at crate root
pub use capture::{CaptureError, CaptureSource, Frame, MockCamera, PixelFormat, SharedSource};
pub use config::{Config, ConfigError};
pub use encode::{encode, EncodeError};
pub use pacer::Pacer;
pub use producer::{FrameStream, ProducerError, ProducerMode, ProducerState, StreamProducer};
pub use server::{ServerError, StreamServer};
pub use transform::{transform, Rotation};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
