//! `multipart/x-mixed-replace` framing for the live stream.

use bytes::{BufMut, Bytes, BytesMut};

/// Boundary token separating stream parts.
pub const BOUNDARY: &str = "frame";

/// Response content type of the live stream.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Content type of a single snapshot and of every stream part.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
const PART_TRAILER: &[u8] = b"\r\n";

/// Wraps one JPEG image as a stream part.
pub fn part(jpeg: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PART_HEADER.len() + jpeg.len() + PART_TRAILER.len());
    buf.put_slice(PART_HEADER);
    buf.put_slice(jpeg);
    buf.put_slice(PART_TRAILER);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_framing() {
        let chunk = part(&[0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(
            &chunk[..],
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8\xFF\xD9\r\n"
        );
    }

    #[test]
    fn test_boundary_matches_content_type() {
        assert!(STREAM_CONTENT_TYPE.ends_with(&format!("boundary={}", BOUNDARY)));
        assert!(PART_HEADER.starts_with(format!("--{}\r\n", BOUNDARY).as_bytes()));
    }
}
