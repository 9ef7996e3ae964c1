//! Camera input and frame handling.
//!
//! This module provides the capture source abstraction, the frame type and
//! the concrete sources: a `nokhwa` device backend (feature `camera`) and a
//! synthetic [`MockCamera`].

#[cfg(feature = "camera")]
mod device;
mod frame;
mod mock;
mod source;

#[cfg(feature = "camera")]
pub use device::DeviceCamera;
pub use frame::{Frame, PixelFormat};
pub use mock::{MockCamera, SEQUENCE_BANDS};
pub use source::{
    apply_settings, share, share_boxed, CaptureError, CaptureSource, SharedSource, HINT_HEIGHT,
    HINT_WIDTH,
};

/// Opens the physical camera at `index`.
#[cfg(feature = "camera")]
pub fn open_device(index: u32) -> Result<Box<dyn CaptureSource>, CaptureError> {
    Ok(Box::new(DeviceCamera::open(index)?))
}

/// Opens the physical camera at `index`.
///
/// This build has no device backend, so opening always fails.
#[cfg(not(feature = "camera"))]
pub fn open_device(index: u32) -> Result<Box<dyn CaptureSource>, CaptureError> {
    Err(CaptureError::DeviceUnavailable(format!(
        "device {} requested but this build lacks the `camera` feature",
        index
    )))
}
