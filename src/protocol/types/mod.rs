//! Primitive wire types and the 4-byte alignment rule.

pub mod fixed;
pub mod wlarray;
pub mod wlstring;

pub use fixed::Fixed;
pub use wlarray::WlArray;
pub use wlstring::WlString;

use crate::error::Error;

/// Size of the length prefix in front of strings and arrays.
pub(crate) const WL_PREFIX_LEN: usize = size_of::<u32>();
pub(crate) const WL_NUL: u8 = 0;

/// Number of zero bytes that follow `n` bytes of content to reach 4-byte alignment.
///
/// ```
/// use wlwire::protocol::types::pad;
///
/// let pads: Vec<usize> = (0..=8).map(pad).collect();
/// assert_eq!(pads, [0, 3, 2, 1, 0, 3, 2, 1, 0]);
/// ```
pub fn pad(n: usize) -> usize {
    (4 - n % 4) % 4
}

/// Rounds a size up to the nearest multiple of 4.
pub(crate) fn roundup_4(number: usize) -> usize {
    (number + 3) & !3
}

/// Reads the little-endian `u32` at the front of `buf`.
pub(crate) fn read_prefix(buf: &[u8]) -> Result<u32, Error> {
    match buf.first_chunk::<4>() {
        Some(bytes) => Ok(u32::from_le_bytes(*bytes)),
        None => Err(Error::UnexpectedEnd {
            needed: WL_PREFIX_LEN,
            available: buf.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pad_cycles_every_four_bytes() {
        let pads: Vec<usize> = (0..=8).map(pad).collect();
        assert_eq!(pads, [0, 3, 2, 1, 0, 3, 2, 1, 0]);
    }

    proptest! {
        #[test]
        fn strings_round_trip_aligned(s in "\\PC{0,64}") {
            let encoded: Vec<u8> = WlString::new(&s).unwrap().into();
            prop_assert_eq!(encoded.len() % 4, 0);
            let decoded = WlString::try_from(encoded.as_slice()).unwrap();
            prop_assert_eq!(decoded.into_string().unwrap(), s);
        }

        #[test]
        fn arrays_round_trip_aligned(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let encoded: Vec<u8> = WlArray::new(&bytes).into();
            prop_assert_eq!(encoded.len() % 4, 0);
            prop_assert_eq!(WlArray::try_from(encoded.as_slice()).unwrap().into_vec(), bytes);
        }

        #[test]
        fn roundup_matches_pad(n in 0usize..4096) {
            prop_assert_eq!(roundup_4(n), n + pad(n));
        }
    }
}
