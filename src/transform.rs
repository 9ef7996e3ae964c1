//! Geometric frame transforms.
//!
//! Flips and rotations are applied in a fixed order: horizontal flip,
//! vertical flip, then rotation. Flip and rotate do not commute, so the
//! order is part of the output contract.

use crate::capture::Frame;
use image::{imageops, ImageBuffer, Luma, Pixel, Rgb};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Rejected rotation angle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported rotation {0}, expected one of 0, 90, 180, 270, -90")]
pub struct RotationError(pub String);

/// Clockwise rotation applied after flipping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Half,
    CounterClockwise90,
}

impl Rotation {
    /// Maps an angle to a rotation, treating unrecognized angles as no rotation.
    pub fn from_degrees(degrees: i32) -> Self {
        Self::try_from(degrees).unwrap_or_default()
    }

    /// Angle in degrees, with counter-clockwise reported as 270.
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Half => 180,
            Rotation::CounterClockwise90 => 270,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = RotationError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Clockwise90),
            180 => Ok(Rotation::Half),
            270 | -90 => Ok(Rotation::CounterClockwise90),
            other => Err(RotationError(other.to_string())),
        }
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl FromStr for Rotation {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let degrees: i32 = s
            .trim()
            .parse()
            .map_err(|_| RotationError(s.to_string()))?;
        Self::try_from(degrees)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Applies the configured flips and rotation to a frame.
///
/// Any angle other than 0, 90, 180, 270 and -90 leaves the frame unrotated.
pub fn transform(frame: Frame, flip_horizontal: bool, flip_vertical: bool, rotate: i32) -> Frame {
    apply(
        frame,
        flip_horizontal,
        flip_vertical,
        Rotation::from_degrees(rotate),
    )
}

/// Same as [`transform`] with an already-normalized rotation.
pub fn apply(frame: Frame, flip_horizontal: bool, flip_vertical: bool, rotation: Rotation) -> Frame {
    if !flip_horizontal && !flip_vertical && rotation == Rotation::None {
        return frame;
    }
    // Malformed frames pass through; the encoder reports them.
    if !frame.is_valid() {
        return frame;
    }

    match frame.channels() {
        1 => apply_as::<Luma<u8>>(frame, flip_horizontal, flip_vertical, rotation),
        _ => apply_as::<Rgb<u8>>(frame, flip_horizontal, flip_vertical, rotation),
    }
}

/// Result of reorienting a pixel buffer.
enum Reoriented<P: Pixel> {
    /// The buffer was rewritten in place.
    InPlace,
    /// A quarter turn produced a new buffer with swapped dimensions.
    Turned(ImageBuffer<P, Vec<P::Subpixel>>),
}

fn apply_as<P>(mut frame: Frame, flip_horizontal: bool, flip_vertical: bool, rotation: Rotation) -> Frame
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (width, height) = (frame.width(), frame.height());
    let reoriented = match reorient::<P>(
        frame.pixels_mut(),
        width,
        height,
        flip_horizontal,
        flip_vertical,
        rotation,
    ) {
        Some(reoriented) => reoriented,
        None => return frame,
    };

    match reoriented {
        Reoriented::InPlace => frame,
        Reoriented::Turned(image) => {
            let (width, height) = image.dimensions();
            frame.with_pixels(image.into_raw(), width, height)
        }
    }
}

/// Flips and rotates `pixels`. Returns `None`, leaving `pixels` untouched,
/// when the buffer is too short for `width` x `height`.
fn reorient<P>(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    flip_horizontal: bool,
    flip_vertical: bool,
    rotation: Rotation,
) -> Option<Reoriented<P>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let mut image = ImageBuffer::<P, &mut [u8]>::from_raw(width, height, pixels)?;

    if flip_horizontal {
        imageops::flip_horizontal_in_place(&mut image);
    }
    if flip_vertical {
        imageops::flip_vertical_in_place(&mut image);
    }

    Some(match rotation {
        Rotation::None => Reoriented::InPlace,
        Rotation::Half => {
            imageops::rotate180_in_place(&mut image);
            Reoriented::InPlace
        }
        Rotation::Clockwise90 => Reoriented::Turned(imageops::rotate90(&image)),
        Rotation::CounterClockwise90 => Reoriented::Turned(imageops::rotate270(&image)),
    })
}
