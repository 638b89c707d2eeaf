//! Binary codec for gamepad-state messages.
//!
//! Wire format:
//! ```text
//! [tag:2][version:1][reserved:1][body_len:2]
//! [buttons_down:4][buttons_up:4][left_trigger:4][right_trigger:4]
//! [left_x:4][left_y:4][right_x:4][right_y:4][extension:body_len-32]
//! ```
//! Header size: 6 bytes. Body size: at least 32 bytes. Every integer and
//! float is little-endian, independent of the host byte order.
//!
//! # Why a `body_len` field? (for beginners)
//!
//! TCP is a byte stream, not a message stream: one `read()` can return half a
//! message or two and a half messages.  Because every message says how long
//! its body is, the decoder can tell the caller exactly how many bytes it
//! consumed, and the caller can slice off the next message from the same
//! buffer.  The length also lets newer senders append extension fields that
//! older receivers simply skip.

use thiserror::Error;

use crate::protocol::reading::{GamepadButtons, GamepadReading};

/// Tag at offset 0; the bytes `"VG"` read as a little-endian `u16`.
pub const MESSAGE_TAG: u16 = 0x4756;

/// The only wire version this codec understands.
pub const WIRE_VERSION: u8 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 6;

/// Size of the fixed body fields in bytes.
pub const BODY_SIZE: usize = 32;

/// Smallest complete message.
pub const MIN_MESSAGE_SIZE: usize = HEADER_SIZE + BODY_SIZE;

/// Largest body a sender may declare.
pub const MAX_BODY_SIZE: usize = 256;

/// Errors that can occur while encoding or decoding a message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// The buffer ends before the message does; retry with more bytes.
    #[error("incomplete data: need at least {needed} bytes, got {available}")]
    IncompleteData { needed: usize, available: usize },

    /// The bytes are not a message of this schema (tag, version, or field values).
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The declared body length is beyond the accepted limit.
    #[error("declared body length {declared} exceeds the limit of {limit} bytes")]
    DataTooLarge { declared: usize, limit: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `reading` into a complete wire message.
///
/// # Errors
///
/// Returns [`ProtocolError::SchemaMismatch`] if the reading violates the
/// schema (a button in both masks, an undefined button bit, or an axis out of
/// range), because the decoder on the other side would reject it.
///
/// # Examples
///
/// ```rust
/// use vgp_core::protocol::{decode, encode, GamepadButton, GamepadReading};
///
/// let reading = GamepadReading::pressing(GamepadButton::A);
/// let bytes = encode(&reading).unwrap();
/// let (decoded, consumed) = decode(&bytes).unwrap();
/// assert_eq!(decoded, reading);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode(reading: &GamepadReading) -> Result<Vec<u8>, ProtocolError> {
    encode_with_extension(reading, &[])
}

/// Encodes `reading` followed by `extension` bytes inside the body.
///
/// Receivers of this version skip the extension.
///
/// # Errors
///
/// Returns [`ProtocolError::SchemaMismatch`] for an invalid reading and
/// [`ProtocolError::DataTooLarge`] if the body would exceed [`MAX_BODY_SIZE`].
pub fn encode_with_extension(
    reading: &GamepadReading,
    extension: &[u8],
) -> Result<Vec<u8>, ProtocolError> {
    validate_reading(reading)?;

    let body_len = BODY_SIZE + extension.len();
    if body_len > MAX_BODY_SIZE {
        return Err(ProtocolError::DataTooLarge {
            declared: body_len,
            limit: MAX_BODY_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + body_len);
    buf.extend_from_slice(&MESSAGE_TAG.to_le_bytes());
    buf.push(WIRE_VERSION);
    buf.push(0x00); // reserved
    buf.extend_from_slice(&(body_len as u16).to_le_bytes());

    buf.extend_from_slice(&reading.buttons_down.0.to_le_bytes());
    buf.extend_from_slice(&reading.buttons_up.0.to_le_bytes());
    for value in [
        reading.left_trigger,
        reading.right_trigger,
        reading.left_stick_x,
        reading.left_stick_y,
        reading.right_stick_x,
        reading.right_stick_y,
    ] {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf.extend_from_slice(extension);
    Ok(buf)
}

/// Decodes one message from the beginning of `bytes`.
///
/// Returns the reading and the number of bytes the message occupied, so the
/// caller can advance past it.  Bytes after the message are not inspected.
/// The function is pure: it never buffers across calls.
///
/// # Errors
///
/// - [`ProtocolError::IncompleteData`] when `bytes` ends before the message does.
/// - [`ProtocolError::SchemaMismatch`] for a wrong tag or version, a body shorter
///   than the fixed fields, or field values the schema forbids.
/// - [`ProtocolError::DataTooLarge`] when the declared body exceeds [`MAX_BODY_SIZE`].
pub fn decode(bytes: &[u8]) -> Result<(GamepadReading, usize), ProtocolError> {
    require_len(bytes, HEADER_SIZE)?;

    let tag = u16::from_le_bytes([bytes[0], bytes[1]]);
    if tag != MESSAGE_TAG {
        return Err(ProtocolError::SchemaMismatch(format!(
            "unexpected tag 0x{tag:04X}"
        )));
    }

    let version = bytes[2];
    if version != WIRE_VERSION {
        return Err(ProtocolError::SchemaMismatch(format!(
            "unsupported version {version}"
        )));
    }

    // bytes[3] is reserved – ignored on decode

    let body_len = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
    if body_len > MAX_BODY_SIZE {
        return Err(ProtocolError::DataTooLarge {
            declared: body_len,
            limit: MAX_BODY_SIZE,
        });
    }
    if body_len < BODY_SIZE {
        return Err(ProtocolError::SchemaMismatch(format!(
            "body of {body_len} bytes is shorter than the {BODY_SIZE} fixed bytes"
        )));
    }

    let total = HEADER_SIZE + body_len;
    require_len(bytes, total)?;

    let body = &bytes[HEADER_SIZE..total];
    let reading = GamepadReading {
        buttons_down: GamepadButtons(read_u32(body, 0)),
        buttons_up: GamepadButtons(read_u32(body, 4)),
        left_trigger: read_f32(body, 8),
        right_trigger: read_f32(body, 12),
        left_stick_x: read_f32(body, 16),
        left_stick_y: read_f32(body, 20),
        right_stick_x: read_f32(body, 24),
        right_stick_y: read_f32(body, 28),
    };
    validate_reading(&reading)?;

    Ok((reading, total))
}

/// Checks the invariants every [`GamepadReading`] on the wire must satisfy.
///
/// # Errors
///
/// Returns [`ProtocolError::SchemaMismatch`] describing the first violation.
pub fn validate_reading(reading: &GamepadReading) -> Result<(), ProtocolError> {
    let overlap = reading.buttons_down.0 & reading.buttons_up.0;
    if overlap != 0 {
        return Err(ProtocolError::SchemaMismatch(format!(
            "buttons 0x{overlap:08X} are both down and up"
        )));
    }

    let undefined = reading.buttons_down.undefined_bits() | reading.buttons_up.undefined_bits();
    if undefined != 0 {
        return Err(ProtocolError::SchemaMismatch(format!(
            "undefined button bits 0x{undefined:08X}"
        )));
    }

    check_range("left_trigger", reading.left_trigger, 0.0)?;
    check_range("right_trigger", reading.right_trigger, 0.0)?;
    check_range("left_stick_x", reading.left_stick_x, -1.0)?;
    check_range("left_stick_y", reading.left_stick_y, -1.0)?;
    check_range("right_stick_x", reading.right_stick_x, -1.0)?;
    check_range("right_stick_y", reading.right_stick_y, -1.0)?;
    Ok(())
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        return Err(ProtocolError::IncompleteData {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

/// Caller guarantees `offset + 4 <= buf.len()`.
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn read_f32(buf: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(buf, offset))
}

/// Accepts finite values in `[min, 1.0]`. NaN fails both comparisons.
fn check_range(field: &str, value: f32, min: f32) -> Result<(), ProtocolError> {
    if value >= min && value <= 1.0 {
        Ok(())
    } else {
        Err(ProtocolError::SchemaMismatch(format!(
            "{field} = {value} is outside [{min}, 1]"
        )))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::reading::GamepadButton;

    fn sample_reading() -> GamepadReading {
        GamepadReading {
            buttons_down: GamepadButtons(GamepadButton::A.bit() | GamepadButton::DPadLeft.bit()),
            buttons_up: GamepadButtons(GamepadButton::B.bit()),
            left_trigger: 0.25,
            right_trigger: 1.0,
            left_stick_x: -1.0,
            left_stick_y: 0.5,
            right_stick_x: 0.0,
            right_stick_y: -0.75,
        }
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_writes_pinned_little_endian_layout() {
        // Arrange
        let reading = GamepadReading {
            buttons_down: GamepadButtons(0x0000_0004),
            left_trigger: 1.0,
            ..GamepadReading::default()
        };

        // Act
        let bytes = encode(&reading).unwrap();

        // Assert
        assert_eq!(bytes.len(), MIN_MESSAGE_SIZE);
        assert_eq!(&bytes[0..6], &[0x56, 0x47, 0x01, 0x00, 0x20, 0x00]);
        assert_eq!(&bytes[6..10], &[0x04, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[10..14], &[0x00, 0x00, 0x00, 0x00]);
        // 1.0f32 = 0x3F800000
        assert_eq!(&bytes[14..18], &[0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn test_decode_reports_bytes_consumed_equal_to_message_length() {
        let bytes = encode(&sample_reading()).unwrap();
        let (decoded, consumed) = decode(&bytes).unwrap();
        assert_eq!(decoded, sample_reading());
        assert_eq!(consumed, MIN_MESSAGE_SIZE);
    }

    #[test]
    fn test_decode_ignores_bytes_after_the_message() {
        // Arrange – a second message follows the first in the same buffer
        let mut bytes = encode(&sample_reading()).unwrap();
        bytes.extend(encode(&GamepadReading::default()).unwrap());

        // Act
        let (decoded, consumed) = decode(&bytes).unwrap();

        // Assert
        assert_eq!(decoded, sample_reading());
        assert_eq!(consumed, MIN_MESSAGE_SIZE);
    }

    #[test]
    fn test_decode_skips_extension_bytes_inside_body() {
        // Arrange
        let bytes = encode_with_extension(&sample_reading(), &[0xAA; 10]).unwrap();

        // Act
        let (decoded, consumed) = decode(&bytes).unwrap();

        // Assert
        assert_eq!(decoded, sample_reading());
        assert_eq!(consumed, MIN_MESSAGE_SIZE + 10);
    }

    #[test]
    fn test_decode_ignores_reserved_byte() {
        let mut bytes = encode(&sample_reading()).unwrap();
        bytes[3] = 0xFF;
        assert!(decode(&bytes).is_ok());
    }

    // ── IncompleteData ────────────────────────────────────────────────────────

    #[test]
    fn test_decode_three_bytes_short_is_incomplete() {
        // Arrange
        let bytes = encode(&sample_reading()).unwrap();
        let short = &bytes[..MIN_MESSAGE_SIZE - 3];

        // Act
        let result = decode(short);

        // Assert
        assert_eq!(
            result,
            Err(ProtocolError::IncompleteData {
                needed: MIN_MESSAGE_SIZE,
                available: MIN_MESSAGE_SIZE - 3,
            })
        );
    }

    #[test]
    fn test_decode_empty_buffer_is_incomplete() {
        assert!(matches!(
            decode(&[]),
            Err(ProtocolError::IncompleteData { needed: HEADER_SIZE, available: 0 })
        ));
    }

    #[test]
    fn test_decode_partial_extension_is_incomplete() {
        let bytes = encode_with_extension(&sample_reading(), &[0u8; 8]).unwrap();
        let result = decode(&bytes[..MIN_MESSAGE_SIZE + 4]);
        assert!(matches!(result, Err(ProtocolError::IncompleteData { .. })));
    }

    // ── SchemaMismatch ────────────────────────────────────────────────────────

    #[test]
    fn test_decode_wrong_tag_is_schema_mismatch() {
        let mut bytes = encode(&sample_reading()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_wrong_tag_is_detected_before_length() {
        // A 6-byte header with a bad tag must not be reported as incomplete.
        let header = [0x00, 0x00, 0x01, 0x00, 0x20, 0x00];
        assert!(matches!(decode(&header), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_unsupported_version_is_schema_mismatch() {
        let mut bytes = encode(&sample_reading()).unwrap();
        bytes[2] = 2;
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_body_shorter_than_fixed_fields_is_schema_mismatch() {
        let mut bytes = encode(&sample_reading()).unwrap();
        bytes[4] = 31;
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_rejects_button_in_both_masks() {
        // Arrange – hand-patch buttons_up to repeat bit A from buttons_down
        let mut bytes = encode(&GamepadReading::pressing(GamepadButton::A)).unwrap();
        bytes[10] = 0x04;

        // Act
        let result = decode(&bytes);

        // Assert
        assert!(matches!(result, Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_rejects_undefined_button_bits() {
        let mut bytes = encode(&GamepadReading::default()).unwrap();
        bytes[9] = 0x80;
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_rejects_nan_axis() {
        let mut bytes = encode(&GamepadReading::default()).unwrap();
        bytes[22..26].copy_from_slice(&f32::NAN.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_rejects_negative_trigger() {
        let mut bytes = encode(&GamepadReading::default()).unwrap();
        bytes[14..18].copy_from_slice(&(-0.1f32).to_le_bytes());
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_decode_rejects_stick_beyond_unit_range() {
        let mut bytes = encode(&GamepadReading::default()).unwrap();
        bytes[34..38].copy_from_slice(&1.5f32.to_le_bytes());
        assert!(matches!(decode(&bytes), Err(ProtocolError::SchemaMismatch(_))));
    }

    // ── DataTooLarge ──────────────────────────────────────────────────────────

    #[test]
    fn test_decode_oversized_body_is_data_too_large() {
        // Arrange – only the header is needed to detect the problem
        let mut header = [0x56, 0x47, 0x01, 0x00, 0x00, 0x00];
        header[4..6].copy_from_slice(&((MAX_BODY_SIZE + 1) as u16).to_le_bytes());

        // Act
        let result = decode(&header);

        // Assert
        assert_eq!(
            result,
            Err(ProtocolError::DataTooLarge {
                declared: MAX_BODY_SIZE + 1,
                limit: MAX_BODY_SIZE,
            })
        );
    }

    #[test]
    fn test_encode_rejects_extension_past_limit() {
        let ext = vec![0u8; MAX_BODY_SIZE - BODY_SIZE + 1];
        assert!(matches!(
            encode_with_extension(&sample_reading(), &ext),
            Err(ProtocolError::DataTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_overlapping_masks() {
        let reading = GamepadReading {
            buttons_down: GamepadButtons(GamepadButton::X.bit()),
            buttons_up: GamepadButtons(GamepadButton::X.bit()),
            ..GamepadReading::default()
        };
        assert!(matches!(encode(&reading), Err(ProtocolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_validate_accepts_axis_endpoints() {
        let reading = GamepadReading {
            left_trigger: 0.0,
            right_trigger: 1.0,
            left_stick_x: -1.0,
            left_stick_y: 1.0,
            right_stick_x: 1.0,
            right_stick_y: -1.0,
            ..GamepadReading::default()
        };
        assert_eq!(validate_reading(&reading), Ok(()));
    }
}
