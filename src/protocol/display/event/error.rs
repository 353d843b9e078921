use std::fmt::{self, Display, Formatter};

use crate::error::Error;
use crate::protocol::ObjectId;
use crate::protocol::wire::Decoder;
use crate::wl_enum;

wl_enum! {
    /// Global error values that can be reported against any object.
    DisplayErrorCode {
        /// The server couldn't find the specified object.
        InvalidObject = 0,

        /// The requested method doesn't exist on the specified interface or was malformed.
        InvalidMethod = 1,

        /// The server is out of memory.
        NoMemory = 2,

        /// An implementation error occurred in the compositor.
        ImplementationError = 3,
    }
}

/// Payload of a `wl_display.error` event.
///
/// `code` is interface specific: it is only a [`DisplayErrorCode`] when the error is
/// reported against the display itself.
///
/// # Protocol XML
/// ```xml
/// <event name="error">
///   <arg name="object_id" type="object" summary="object where the error occurred"/>
///   <arg name="code" type="uint" summary="error code"/>
///   <arg name="message" type="string" summary="error description"/>
/// </event>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayError {
    pub object_id: ObjectId,
    pub code: u32,
    pub message: String,
}

impl DisplayError {
    pub(crate) fn decode(args: &mut Decoder<'_>) -> Result<Self, Error> {
        let object_id = args.required_object()?;
        let code = args.uint()?;
        let message = args.string()?;
        Ok(Self {
            object_id,
            code,
            message,
        })
    }
}

impl Display for DisplayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "object {} code {}: {}",
            self.object_id, self.code, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::Encoder;

    #[test]
    fn decodes_object_code_and_message() {
        let mut args = Encoder::new();
        args.object(Some(7)).uint(2).string("invalid serial").unwrap();
        let (bytes, _) = args.into_parts();

        let error = DisplayError::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(
            error,
            DisplayError {
                object_id: 7,
                code: 2,
                message: "invalid serial".into(),
            }
        );
        assert_eq!(error.to_string(), "object 7 code 2: invalid serial");
    }

    #[test]
    fn display_codes_are_named() {
        assert_eq!(DisplayErrorCode::try_from(1), Ok(DisplayErrorCode::InvalidMethod));
        assert!(DisplayErrorCode::try_from(4).is_err());
    }
}
