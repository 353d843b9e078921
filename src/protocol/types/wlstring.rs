use std::fmt::{self, Display, Formatter};

use super::{WL_NUL, WL_PREFIX_LEN, read_prefix, roundup_4};
use crate::error::{Error, ProtocolError, ValidationError};

/// Represents a Wayland protocol string.
///
/// Wayland strings are serialized with:
/// - 32-bit length prefix counting the content plus the NUL terminator
/// - String content in UTF-8 encoding
/// - NUL terminator byte
/// - Zero padding to 32-bit alignment
///
/// A length prefix of zero encodes a null string; that case is handled by the argument
/// decoder, so a `WlString` is never null.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WlString {
    /// The string content, without terminator or padding.
    data: Vec<u8>,
}

impl WlString {
    /// Wraps a Rust string, rejecting interior NUL bytes which cannot travel on the wire.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.as_bytes().contains(&WL_NUL) {
            return Err(ValidationError::InteriorNul);
        }
        Ok(Self {
            data: s.as_bytes().to_vec(),
        })
    }

    /// The value carried in the length prefix: content plus terminator.
    pub fn wire_len(&self) -> u32 {
        (self.data.len() + 1) as u32
    }

    /// Total encoded size: prefix, content, terminator and padding.
    ///
    /// ```
    /// use wlwire::protocol::types::WlString;
    ///
    /// assert_eq!(WlString::new("hi").unwrap().buffer_len(), 8);
    /// assert_eq!(WlString::new("hello").unwrap().buffer_len(), 12);
    /// assert_eq!(WlString::new("").unwrap().buffer_len(), 8);
    /// ```
    pub fn buffer_len(&self) -> usize {
        WL_PREFIX_LEN + roundup_4(self.data.len() + 1)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Validates the content as UTF-8.
    pub fn into_string(self) -> Result<String, ProtocolError> {
        String::from_utf8(self.data).map_err(|_| ProtocolError::InvalidUtf8)
    }
}

impl From<&WlString> for String {
    /// Lossy conversion, for logging content that may not be valid UTF-8.
    fn from(wls: &WlString) -> String {
        String::from_utf8_lossy(&wls.data).into_owned()
    }
}

impl From<WlString> for Vec<u8> {
    fn from(wls: WlString) -> Vec<u8> {
        let mut result = Vec::with_capacity(wls.buffer_len());

        result.extend_from_slice(&wls.wire_len().to_le_bytes());
        result.extend_from_slice(&wls.data);
        result.push(WL_NUL);

        let padded_len = roundup_4(result.len());
        result.resize(padded_len, 0);

        result
    }
}

impl TryFrom<&[u8]> for WlString {
    type Error = Error;

    /// Parses a non-null string from the front of `buf`.
    ///
    /// # Errors
    /// - [`Error::UnexpectedEnd`] if `buf` ends before the padded content does
    /// - [`ProtocolError::UnexpectedNull`] for a zero length prefix
    /// - [`ProtocolError::MissingNul`] if the last counted byte is not a terminator
    fn try_from(buf: &[u8]) -> Result<WlString, Error> {
        let wire_len = read_prefix(buf)? as usize;
        if wire_len == 0 {
            return Err(ProtocolError::UnexpectedNull.into());
        }

        let needed = WL_PREFIX_LEN + roundup_4(wire_len);
        if buf.len() < needed {
            return Err(Error::UnexpectedEnd {
                needed,
                available: buf.len(),
            });
        }

        let content = &buf[WL_PREFIX_LEN..WL_PREFIX_LEN + wire_len];
        let (terminator, data) = content.split_last().ok_or(ProtocolError::UnexpectedNull)?;
        if *terminator != WL_NUL || data.contains(&WL_NUL) {
            return Err(ProtocolError::MissingNul { len: wire_len }.into());
        }

        Ok(WlString {
            data: data.to_vec(),
        })
    }
}

impl Display for WlString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", String::from_utf8_lossy(&self.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_length_with_terminator_and_padding() {
        let bytes: Vec<u8> = WlString::new("Hello").unwrap().into();
        assert_eq!(&bytes[..4], &6u32.to_le_bytes());
        assert_eq!(&bytes[4..10], b"Hello\0");
        assert_eq!(&bytes[10..], &[0, 0]);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn empty_string_is_not_null() {
        let bytes: Vec<u8> = WlString::new("").unwrap().into();
        assert_eq!(bytes, vec![1, 0, 0, 0, 0, 0, 0, 0]);
        let decoded = WlString::try_from(bytes.as_slice()).unwrap();
        assert_eq!(decoded.as_bytes(), b"");
    }

    #[test]
    fn rejects_interior_nul() {
        assert_eq!(WlString::new("a\0b"), Err(ValidationError::InteriorNul));
    }

    #[test]
    fn short_buffer_is_recoverable() {
        let bytes: Vec<u8> = WlString::new("xdg_wm_base").unwrap().into();
        let err = WlString::try_from(&bytes[..9]).unwrap_err();
        assert!(err.is_recoverable(), "{err}");
    }

    #[test]
    fn missing_terminator_is_fatal() {
        let mut bytes = 4u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"abcd");
        let err = WlString::try_from(bytes.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::MissingNul { len: 4 })
        ));
    }
}
