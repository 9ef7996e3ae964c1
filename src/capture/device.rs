//! Physical camera backend built on `nokhwa`.
//!
//! `nokhwa::Camera` is not `Send`, so the device lives on a dedicated
//! worker thread for its whole lifetime. [`DeviceCamera`] is a thin handle
//! that forwards requests over a channel and waits for the reply.

use super::{CaptureError, CaptureSource, Frame, PixelFormat};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraIndex, ControlValueSetter, KnownCameraControl, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use std::sync::mpsc;
use std::thread;

/// V4L2 `V4L2_CID_FOCUS_AUTO`; nokhwa has no named control for it.
const FOCUS_AUTO_CONTROL: u128 = 0x009a_090c;

type Reply<T> = mpsc::Sender<Result<T, CaptureError>>;

enum Request {
    Configure { width: u32, height: u32, reply: Reply<()> },
    Focus { value: i32, reply: Reply<()> },
    Read { reply: Reply<Frame> },
}

/// Handle to a camera device owned by a worker thread.
pub struct DeviceCamera {
    requests: mpsc::Sender<Request>,
}

impl DeviceCamera {
    /// Opens the camera at `index`, failing with
    /// [`CaptureError::DeviceUnavailable`] if it cannot be opened.
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        let (requests, inbox) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name(format!("camera-{}", index))
            .spawn(move || worker(index, inbox, ready_tx))
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| CaptureError::DeviceUnavailable("camera worker exited".into()))??;

        tracing::info!(device = index, "Camera opened");
        Ok(Self { requests })
    }

    fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, CaptureError> {
        let (reply, response) = mpsc::channel();
        self.requests
            .send(make(reply))
            .map_err(|_| CaptureError::CaptureFailed("camera worker stopped".into()))?;
        response
            .recv()
            .map_err(|_| CaptureError::CaptureFailed("camera worker stopped".into()))?
    }
}

impl CaptureSource for DeviceCamera {
    fn configure(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.call(|reply| Request::Configure { width, height, reply })
    }

    fn set_manual_focus(&mut self, value: i32) -> Result<(), CaptureError> {
        self.call(|reply| Request::Focus { value, reply })
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        self.call(|reply| Request::Read { reply })
    }
}

fn worker(index: u32, inbox: mpsc::Receiver<Request>, ready: Reply<()>) {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let mut camera = match Camera::new(CameraIndex::Index(index), requested) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(CaptureError::DeviceUnavailable(e.to_string())));
            return;
        }
    };
    if ready.send(Ok(())).is_err() {
        return;
    }

    let mut sequence = 0u64;

    // Runs until every DeviceCamera handle is dropped.
    while let Ok(request) = inbox.recv() {
        match request {
            Request::Configure { width, height, reply } => {
                let result = camera
                    .set_resolution(Resolution::new(width, height))
                    .map_err(|e| CaptureError::ConfigFailed(e.to_string()));
                let _ = reply.send(result);
            }
            Request::Focus { value, reply } => {
                let _ = reply.send(set_focus(&mut camera, value));
            }
            Request::Read { reply } => {
                sequence += 1;
                let _ = reply.send(read(&mut camera, sequence));
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::debug!(error = %e, "Camera stream did not stop cleanly");
    }
    tracing::info!(device = index, "Camera closed");
}

fn set_focus(camera: &mut Camera, value: i32) -> Result<(), CaptureError> {
    if let Err(e) = camera.set_camera_control(
        KnownCameraControl::Other(FOCUS_AUTO_CONTROL),
        ControlValueSetter::Boolean(false),
    ) {
        tracing::debug!(error = %e, "Could not disable autofocus");
    }

    camera
        .set_camera_control(
            KnownCameraControl::Focus,
            ControlValueSetter::Integer(i64::from(value)),
        )
        .map_err(|e| CaptureError::ConfigFailed(e.to_string()))
}

fn read(camera: &mut Camera, sequence: u64) -> Result<Frame, CaptureError> {
    if !camera.is_stream_open() {
        camera
            .open_stream()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        let resolution = camera.resolution();
        tracing::info!(
            width = resolution.width(),
            height = resolution.height(),
            "Camera stream started"
        );
    }

    let buffer = camera
        .frame()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

    let (width, height) = (decoded.width(), decoded.height());
    Ok(Frame::new(
        decoded.into_raw(),
        width,
        height,
        PixelFormat::Rgb8,
        sequence,
    ))
}
