pub mod error;

pub use error::{DisplayError, DisplayErrorCode};

use crate::wl_opcode;

wl_opcode! {
    /// Events emitted by `wl_display`.
    DisplayEvent("wl_display") {
        /// A fatal error on some object. The compositor closes the connection after it.
        Error = 0,

        /// The compositor no longer references an id the client destroyed; it may be reused.
        ///
        /// # Protocol XML
        /// ```xml
        /// <event name="delete_id">
        ///   <description summary="acknowledge object ID deletion">
        ///     This event is used internally by the object ID management
        ///     logic. When a client deletes an object that it had created,
        ///     the server will send this event to acknowledge that it has
        ///     seen the delete request. When the client receives this event,
        ///     it will know that it can safely reuse the object ID.
        ///   </description>
        ///   <arg name="id" type="uint" summary="deleted object ID"/>
        /// </event>
        /// ```
        DeleteId = 1,
    }
}
