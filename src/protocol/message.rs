use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::os::fd::OwnedFd;

use super::ObjectId;
use super::wire::{Decoder, Encoder};
use crate::error::{Error, ProtocolError};

/// The fixed size of a Wayland message header in bytes (8 bytes).
///
/// Wayland message headers consist of two 32-bit words:
/// - Object ID (32 bits)
/// - Combined size (upper 16 bits) and opcode (lower 16 bits)
pub const WL_MESSAGE_HEADER_LEN: usize = size_of::<u32>() + size_of::<u16>() + size_of::<u16>();

/// Largest frame the compositor will accept or send, header included.
pub const WL_MAX_MESSAGE_LEN: usize = 4096;

/// Represents the header of a Wayland protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WlMessageHeader {
    /// The object ID that this message targets or originates from.
    pub object_id: ObjectId,
    /// The operation code defining the specific request or event type.
    pub opcode: u16,
    /// The total message size including header and data in bytes.
    pub size: u16,
}

impl WlMessageHeader {
    /// Returns the total length of the message including header and data.
    pub fn message_len(&self) -> usize {
        self.size as usize
    }
}

impl From<WlMessageHeader> for Vec<u8> {
    /// Serializes the header into the little-endian wire format:
    /// - Bytes 0-3: object_id
    /// - Bytes 4-5: opcode
    /// - Bytes 6-7: size
    fn from(header: WlMessageHeader) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(WL_MESSAGE_HEADER_LEN);

        bytes.extend_from_slice(&header.object_id.to_le_bytes());
        bytes.extend_from_slice(&header.opcode.to_le_bytes());
        bytes.extend_from_slice(&header.size.to_le_bytes());

        bytes
    }
}

impl TryFrom<&[u8]> for WlMessageHeader {
    type Error = Error;

    /// Deserializes and validates a header.
    ///
    /// # Errors
    /// - [`Error::UnexpectedEnd`] if fewer than 8 bytes are available
    /// - [`ProtocolError`] if the embedded size is below 8, above the frame limit, or not
    ///   4-byte aligned
    fn try_from(buf: &[u8]) -> Result<Self, Error> {
        let Some(raw) = buf.first_chunk::<WL_MESSAGE_HEADER_LEN>() else {
            return Err(Error::UnexpectedEnd {
                needed: WL_MESSAGE_HEADER_LEN,
                available: buf.len(),
            });
        };

        let object_id = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let opcode = u16::from_le_bytes([raw[4], raw[5]]);
        let size = u16::from_le_bytes([raw[6], raw[7]]);

        if (size as usize) < WL_MESSAGE_HEADER_LEN {
            return Err(ProtocolError::SizeTooSmall { size }.into());
        }
        if size as usize > WL_MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge {
                size: size as usize,
                max: WL_MAX_MESSAGE_LEN,
            }
            .into());
        }
        if size % 4 != 0 {
            return Err(ProtocolError::MisalignedPayload {
                len: size as usize - WL_MESSAGE_HEADER_LEN,
            }
            .into());
        }

        Ok(WlMessageHeader {
            object_id,
            opcode,
            size,
        })
    }
}

impl Display for WlMessageHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WlMessageHeader {{ object_id: {}, opcode: {}, size: {} }}",
            self.object_id, self.opcode, self.size
        )
    }
}

/// A complete protocol message: header, argument payload, and any descriptors that
/// travelled with it.
///
/// Descriptors are not tied to an argument position; each interface knows how many of
/// its opcodes carry. Descriptors left in the message are closed when it drops.
#[derive(Debug)]
pub struct Message {
    header: WlMessageHeader,
    data: Vec<u8>,
    fds: Vec<OwnedFd>,
}

impl Message {
    /// Frames `args` for `object_id`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MessageTooLarge`] if the frame would not fit the size field
    /// or the compositor's frame limit.
    pub fn new(object_id: ObjectId, opcode: u16, args: Encoder) -> Result<Message, Error> {
        let (data, fds) = args.into_parts();
        let size = data.len() + WL_MESSAGE_HEADER_LEN;
        if size > WL_MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge {
                size,
                max: WL_MAX_MESSAGE_LEN,
            }
            .into());
        }
        debug_assert_eq!(data.len() % 4, 0, "encoder keeps arguments aligned");

        Ok(Message {
            header: WlMessageHeader {
                object_id,
                opcode,
                size: size as u16,
            },
            data,
            fds,
        })
    }

    /// Parses one frame from the front of `buf`, returning it with its length.
    ///
    /// # Errors
    /// Returns [`Error::UnexpectedEnd`] while the frame is incomplete.
    pub fn parse(buf: &[u8]) -> Result<(Message, usize), Error> {
        let header = WlMessageHeader::try_from(buf)?;
        let len = header.message_len();

        if buf.len() < len {
            return Err(Error::UnexpectedEnd {
                needed: len,
                available: buf.len(),
            });
        }

        let message = Message {
            header,
            data: buf[WL_MESSAGE_HEADER_LEN..len].to_vec(),
            fds: Vec::new(),
        };
        Ok((message, len))
    }

    pub fn header(&self) -> WlMessageHeader {
        self.header
    }

    pub fn object_id(&self) -> ObjectId {
        self.header.object_id
    }

    pub fn opcode(&self) -> u16 {
        self.header.opcode
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn args(&self) -> Decoder<'_> {
        Decoder::new(&self.data)
    }

    pub fn fds(&self) -> &[OwnedFd] {
        &self.fds
    }

    /// Takes the oldest descriptor attached to this message.
    pub fn take_fd(&mut self) -> Option<OwnedFd> {
        (!self.fds.is_empty()).then(|| self.fds.remove(0))
    }

    pub(crate) fn attach_fds(&mut self, fds: impl IntoIterator<Item = OwnedFd>) {
        self.fds.extend(fds);
    }

    /// Serializes the header and payload. Descriptors travel out of band.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header.message_len());

        let mut header_raw: Vec<u8> = self.header.into();
        bytes.append(&mut header_raw);
        bytes.extend_from_slice(&self.data);

        bytes
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let data_dump = self
            .data
            .iter()
            .map(|b| format!("0x{b:02X}"))
            .collect::<Vec<String>>()
            .join(", ");

        write!(
            f,
            "Message {{ header: {}, data: [{}], fds: {} }}",
            self.header,
            data_dump,
            self.fds.len()
        )
    }
}

/// Reassembles frames from a byte stream that may split or merge them arbitrarily.
///
/// Descriptors pushed with a chunk are attached to the next frame that completes.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    buffer: Vec<u8>,
    fds: VecDeque<OwnedFd>,
}

impl MessageBuffer {
    pub fn new() -> MessageBuffer {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8], fds: impl IntoIterator<Item = OwnedFd>) {
        self.buffer.extend_from_slice(bytes);
        self.fds.extend(fds);
    }

    /// Bytes received but not yet framed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Attempts to parse the next complete message.
    ///
    /// Returns `Ok(None)` while the next frame is incomplete; the partial bytes stay
    /// buffered. A malformed header is returned as an error and is not recoverable.
    pub fn next_message(&mut self) -> Result<Option<Message>, Error> {
        match Message::parse(&self.buffer) {
            Ok((mut message, len)) => {
                self.buffer.drain(..len);
                message.attach_fds(self.fds.drain(..));
                Ok(Some(message))
            }
            Err(err) if err.is_recoverable() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
