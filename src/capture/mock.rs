//! Synthetic capture source for tests and benchmarks.

use super::{CaptureError, CaptureSource, Frame, PixelFormat};
use image::GrayImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number of vertical bands used to stamp the sequence number into a frame.
pub const SEQUENCE_BANDS: u32 = 16;

/// Mock camera that generates synthetic frames.
///
/// Every frame carries its sequence number as [`SEQUENCE_BANDS`] vertical
/// bands, least significant bit on the left, each fully black (0) or fully
/// white (1). With band widths that are multiples of 8 the pattern survives
/// JPEG compression, so HTTP-level tests can recover which capture a client
/// received with [`MockCamera::read_sequence`].
#[derive(Debug)]
pub struct MockCamera {
    width: u32,
    height: u32,
    format: PixelFormat,
    captures: Arc<AtomicU64>,
    fail_on: Option<u64>,
    read_delay: Option<Duration>,
    focus: Option<i32>,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new(128, 16)
    }
}

impl MockCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Bgr8,
            captures: Arc::new(AtomicU64::new(0)),
            fail_on: None,
            read_delay: None,
            focus: None,
        }
    }

    /// Produces frames in the given pixel format instead of BGR.
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Makes the `n`th capture (1-based) fail once.
    pub fn fail_on_capture(mut self, n: u64) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Simulates device I/O latency on every read.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Returns a handle to the number of capture attempts made so far.
    pub fn capture_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.captures)
    }

    /// Focus value last applied, if any.
    pub fn focus(&self) -> Option<i32> {
        self.focus
    }

    /// Recovers the sequence number stamped into a (possibly decoded) frame.
    pub fn read_sequence(image: &GrayImage) -> u64 {
        let band_width = image.width() / SEQUENCE_BANDS;
        let y = image.height() / 2;

        (0..SEQUENCE_BANDS).fold(0u64, |acc, band| {
            let x = band * band_width + band_width / 2;
            if image.get_pixel(x, y).0[0] >= 128 {
                acc | (1 << band)
            } else {
                acc
            }
        })
    }

    fn render(&self, sequence: u64) -> Vec<u8> {
        let channels = self.format.channels();
        let band_width = (self.width / SEQUENCE_BANDS).max(1);
        let mut row = Vec::with_capacity(self.width as usize * channels);

        for x in 0..self.width {
            let band = (x / band_width).min(SEQUENCE_BANDS - 1);
            let value = if (sequence >> band) & 1 == 1 { 255 } else { 0 };
            row.extend(std::iter::repeat(value).take(channels));
        }

        row.repeat(self.height as usize)
    }
}

impl CaptureSource for MockCamera {
    fn configure(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        if width < SEQUENCE_BANDS || height == 0 {
            return Err(CaptureError::ConfigFailed(format!(
                "unsupported resolution {}x{}",
                width, height
            )));
        }
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn set_manual_focus(&mut self, value: i32) -> Result<(), CaptureError> {
        self.focus = Some(value);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let sequence = self.captures.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }

        if self.fail_on == Some(sequence) {
            return Err(CaptureError::CaptureFailed(format!(
                "injected failure on capture {}",
                sequence
            )));
        }

        Ok(Frame::new(
            self.render(sequence),
            self.width,
            self.height,
            self.format,
            sequence,
        ))
    }
}
