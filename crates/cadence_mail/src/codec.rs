//! Mailbox field codec.
//!
//! Each message field is encoded independently as standard base64 of its
//! UTF-8 bytes. The base64 alphabet contains neither [`FIELD_SEPARATOR`] nor
//! [`MAILBOX_SEPARATOR`](cadence_entity::MAILBOX_SEPARATOR), so encoded
//! fields can be joined and split on them without escaping.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::MailError;

/// Joins the encoded fields of one message.
pub const FIELD_SEPARATOR: char = ':';

/// Encode one field.
#[must_use]
pub fn encode_field(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decode one field.
///
/// # Errors
///
/// Returns [`MailError::BadField`] if `encoded` is not base64 or does not
/// decode to UTF-8.
pub fn decode_field(field: &'static str, encoded: &str) -> Result<String, MailError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| MailError::BadField {
            field,
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| MailError::BadField {
        field,
        reason: e.to_string(),
    })
}
