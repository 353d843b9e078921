use std::io;

use thiserror::Error;

use crate::protocol::ObjectId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the client core can report.
///
/// Only [`Error::UnexpectedEnd`] is recoverable: the caller may retry once more bytes have
/// arrived. Everything else either ends the session or reports caller-side misuse.
#[derive(Debug, Error)]
pub enum Error {
    /// Decoding ran past the bytes available so far.
    #[error("unexpected end of data: needed {needed} bytes, {available} available")]
    UnexpectedEnd { needed: usize, available: usize },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The compositor sent `wl_display.error`.
    #[error("compositor error on {interface}@{object_id} (code {code}): {message}")]
    Server {
        object_id: ObjectId,
        interface: &'static str,
        code: u32,
        message: String,
    },

    #[error("no wayland display socket: {0}")]
    NoDisplay(String),
}

impl Error {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UnexpectedEnd { .. })
    }

    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Protocol(_) | Error::Transport(_) | Error::ConnectionClosed | Error::Server { .. }
        )
    }

    /// Returns the validation error if this is caller-side misuse.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Malformed traffic from the compositor. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message size {size} is smaller than the 8 byte header")]
    SizeTooSmall { size: u16 },

    #[error("message size {size} exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("argument payload of {len} bytes is not 4-byte aligned")]
    MisalignedPayload { len: usize },

    #[error("unknown opcode {opcode} for {interface}")]
    UnknownOpcode { interface: &'static str, opcode: u16 },

    #[error("invalid {name} value {value}")]
    InvalidEnum { name: &'static str, value: u32 },

    #[error("malformed {interface} opcode {opcode}: {reason}")]
    MalformedEvent {
        interface: &'static str,
        opcode: u16,
        reason: String,
    },

    #[error("string of {len} bytes is missing its NUL terminator")]
    MissingNul { len: usize },

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("null value for a non-nullable argument")]
    UnexpectedNull,
}

/// Caller-side contract violations, reported before anything reaches the socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("object {0} is unknown or already destroyed")]
    UnknownObject(ObjectId),

    #[error("object {id} is a {actual}, expected {expected}")]
    WrongInterface {
        id: ObjectId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("surface {surface} committed a buffer before its first configure")]
    CommitBeforeConfigure { surface: ObjectId },

    #[error("surface {surface} committed without acknowledging configure serial {serial}")]
    UnackedConfigure { surface: ObjectId, serial: u32 },

    #[error("serial {serial} was never sent in a configure event")]
    InvalidSerial { serial: u32 },

    #[error("positioner {0} has already been consumed")]
    PositionerConsumed(ObjectId),

    #[error("positioner {0} needs a size and an anchor rectangle")]
    IncompletePositioner(ObjectId),

    #[error("surface {0} already has a role")]
    RoleAlreadySet(ObjectId),

    #[error("surface {0} has a buffer attached before getting a shell role")]
    UnconfiguredBuffer(ObjectId),

    #[error("shell surface {0} still has a live role object")]
    DefunctRoleObject(ObjectId),

    #[error("surface {0} is still wrapped by a live shell surface")]
    LiveShellSurface(ObjectId),

    #[error("wm_base {0} still has live shell surfaces")]
    DefunctSurfaces(ObjectId),

    #[error("invalid size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },

    #[error("invalid buffer scale {0}")]
    InvalidScale(i32),

    #[error("attach offset ({x}, {y}) is not allowed on wl_surface version 5 and later")]
    InvalidOffset { x: i32, y: i32 },

    #[error("{interface}.{request} needs version {since}, object is bound at version {version}")]
    UnsupportedVersion {
        interface: &'static str,
        request: String,
        since: u32,
        version: u32,
    },

    #[error("string contains an interior NUL byte")]
    InteriorNul,

    #[error("no global implementing {0} has been announced")]
    GlobalNotFound(&'static str),

    #[error("global {0} has not been announced")]
    UnknownGlobal(u32),

    #[error("global {name} implements {actual}, expected {expected}")]
    GlobalInterfaceMismatch {
        name: u32,
        expected: &'static str,
        actual: String,
    },

    #[error("dispatch called from inside an event handler")]
    ReentrantDispatch,

    #[error("client object ids exhausted")]
    IdsExhausted,
}
