//! Capture source abstraction.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.

use super::Frame;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Width of the resolution hint applied at startup.
pub const HINT_WIDTH: u32 = 1920;
/// Height of the resolution hint applied at startup.
pub const HINT_HEIGHT: u32 = 1080;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
}

/// Trait for camera implementations.
///
/// Reading mutates device state, so callers serialize access through
/// [`SharedSource`].
pub trait CaptureSource: Send {
    /// Requests a capture resolution. The device may ignore or adjust it.
    fn configure(&mut self, width: u32, height: u32) -> Result<(), CaptureError>;

    /// Disables autofocus and sets a fixed focus value.
    fn set_manual_focus(&mut self, value: i32) -> Result<(), CaptureError>;

    /// Captures a single frame.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// The process-wide capture handle, shared by every producer.
pub type SharedSource = Arc<Mutex<Box<dyn CaptureSource>>>;

/// Wraps a source so it can be handed to concurrent producers.
pub fn share<S: CaptureSource + 'static>(source: S) -> SharedSource {
    share_boxed(Box::new(source))
}

/// Like [`share`], for a source that is already boxed.
pub fn share_boxed(source: Box<dyn CaptureSource>) -> SharedSource {
    Arc::new(Mutex::new(source))
}

/// Applies the resolution hint and, when `manual_focus >= 0`, a fixed focus.
///
/// Both settings are best-effort: failures are logged and the device keeps
/// whatever it actually applied.
pub fn apply_settings<S: CaptureSource + ?Sized>(
    source: &mut S,
    width: u32,
    height: u32,
    manual_focus: i32,
) {
    if let Err(e) = source.configure(width, height) {
        tracing::warn!(width, height, error = %e, "Resolution hint not applied");
    }

    if manual_focus >= 0 {
        if let Err(e) = source.set_manual_focus(manual_focus) {
            tracing::warn!(
                focus = manual_focus,
                error = %e,
                "Manual focus not applied, continuing with autofocus"
            );
        }
    }
}
