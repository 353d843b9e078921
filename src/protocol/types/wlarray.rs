use super::{WL_PREFIX_LEN, read_prefix, roundup_4};
use crate::error::Error;

/// Represents a Wayland protocol array type.
///
/// A blob of arbitrary data, prefixed with a 32-bit integer specifying its length
/// (in bytes), then the verbatim contents of the array, padded to 32 bits with zeroes.
/// Unlike strings, arrays do not include a NUL terminator.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WlArray {
    data: Vec<u8>,
}

impl WlArray {
    pub fn new(buffer: &[u8]) -> Self {
        Self {
            data: buffer.to_vec(),
        }
    }

    /// Total encoded size: prefix plus padded content.
    pub fn buffer_size(&self) -> usize {
        WL_PREFIX_LEN + roundup_4(self.data.len())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Interprets the content as a list of `uint` values, as xdg-shell does for states.
    pub fn to_u32s(&self) -> Option<Vec<u32>> {
        if self.data.len() % 4 != 0 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect(),
        )
    }
}

impl std::fmt::Display for WlArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data_dump = self
            .data
            .iter()
            .map(|b| format!("0x{b:02X}"))
            .collect::<Vec<String>>()
            .join(", ");

        write!(f, "[{data_dump}]")
    }
}

impl From<WlArray> for Vec<u8> {
    fn from(array: WlArray) -> Self {
        let mut buffer = Vec::with_capacity(array.buffer_size());

        buffer.extend_from_slice(&(array.data.len() as u32).to_le_bytes());
        buffer.extend_from_slice(&array.data);
        buffer.resize(array.buffer_size(), 0);

        buffer
    }
}

impl TryFrom<&[u8]> for WlArray {
    type Error = Error;

    /// Parses an array from the front of `buffer`.
    ///
    /// # Errors
    /// Returns [`Error::UnexpectedEnd`] if the buffer ends before the padded content.
    fn try_from(buffer: &[u8]) -> Result<WlArray, Error> {
        let content_len = read_prefix(buffer)? as usize;

        let needed = WL_PREFIX_LEN + roundup_4(content_len);
        if buffer.len() < needed {
            return Err(Error::UnexpectedEnd {
                needed,
                available: buffer.len(),
            });
        }

        Ok(WlArray {
            data: buffer[WL_PREFIX_LEN..WL_PREFIX_LEN + content_len].to_vec(),
        })
    }
}
