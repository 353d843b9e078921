//! Argument codec: the payload that follows a message header.

use std::os::fd::OwnedFd;

use super::ObjectId;
use super::types::{Fixed, WL_PREFIX_LEN, WlArray, WlString, read_prefix};
use crate::error::{Error, ProtocolError, ValidationError};

/// Accumulates request arguments in wire order.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
    fds: Vec<OwnedFd>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uint(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn fixed(&mut self, value: Fixed) -> &mut Self {
        self.int(value.to_raw())
    }

    pub fn string(&mut self, value: &str) -> Result<&mut Self, ValidationError> {
        let encoded: Vec<u8> = WlString::new(value)?.into();
        self.buf.extend_from_slice(&encoded);
        Ok(self)
    }

    /// A `None` string is written as a zero length prefix.
    pub fn optional_string(&mut self, value: Option<&str>) -> Result<&mut Self, ValidationError> {
        match value {
            Some(value) => self.string(value),
            None => Ok(self.uint(0)),
        }
    }

    pub fn array(&mut self, value: &[u8]) -> &mut Self {
        let encoded: Vec<u8> = WlArray::new(value).into();
        self.buf.extend_from_slice(&encoded);
        self
    }

    /// A `None` object is written as id 0.
    pub fn object(&mut self, id: Option<ObjectId>) -> &mut Self {
        self.uint(id.unwrap_or(0))
    }

    pub fn new_id(&mut self, id: ObjectId) -> &mut Self {
        self.uint(id)
    }

    /// Queues a descriptor to travel alongside the message.
    pub fn fd(&mut self, fd: OwnedFd) -> &mut Self {
        self.fds.push(fd);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<OwnedFd>) {
        (self.buf, self.fds)
    }
}

/// Reads event arguments in wire order from a complete payload.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn word(&mut self) -> Result<[u8; 4], Error> {
        let rest = self.rest();
        let bytes = rest.first_chunk::<4>().ok_or(Error::UnexpectedEnd {
            needed: 4,
            available: rest.len(),
        })?;
        self.pos += 4;
        Ok(*bytes)
    }

    pub fn uint(&mut self) -> Result<u32, Error> {
        self.word().map(u32::from_le_bytes)
    }

    pub fn int(&mut self) -> Result<i32, Error> {
        self.word().map(i32::from_le_bytes)
    }

    pub fn fixed(&mut self) -> Result<Fixed, Error> {
        self.int().map(Fixed::from_raw)
    }

    pub fn optional_string(&mut self) -> Result<Option<String>, Error> {
        if read_prefix(self.rest())? == 0 {
            self.pos += WL_PREFIX_LEN;
            return Ok(None);
        }
        let value = WlString::try_from(self.rest())?;
        self.pos += value.buffer_len();
        Ok(Some(value.into_string()?))
    }

    pub fn string(&mut self) -> Result<String, Error> {
        self.optional_string()?
            .ok_or(Error::Protocol(ProtocolError::UnexpectedNull))
    }

    pub fn array(&mut self) -> Result<WlArray, Error> {
        let value = WlArray::try_from(self.rest())?;
        self.pos += value.buffer_size();
        Ok(value)
    }

    /// Reads a nullable object reference.
    pub fn object(&mut self) -> Result<Option<ObjectId>, Error> {
        self.uint().map(|id| (id != 0).then_some(id))
    }

    /// Reads an object reference that must not be null.
    pub fn required_object(&mut self) -> Result<ObjectId, Error> {
        self.object()?
            .ok_or(Error::Protocol(ProtocolError::UnexpectedNull))
    }

    pub fn new_id(&mut self) -> Result<ObjectId, Error> {
        match self.uint()? {
            0 => Err(ProtocolError::UnexpectedNull.into()),
            id => Ok(id),
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}
