//! Wire format and the protocol objects this client speaks.

pub mod callback;
pub mod compositor;
pub mod display;
pub mod macros;
pub mod message;
pub mod region;
pub mod registry;
pub mod surface;
pub mod types;
pub mod wire;
pub mod xdg;

use std::fmt::Debug;

/// Client-side handle of a protocol object.
pub type ObjectId = u32;

/// `wl_display` always lives at id 1.
pub const DISPLAY_ID: ObjectId = 1;

/// First id of the range the compositor allocates from.
pub const SERVER_ID_START: ObjectId = 0xFF00_0000;

/// A request or event opcode of one interface.
pub trait Opcode: Copy + Debug {
    const INTERFACE: &'static str;

    fn code(self) -> u16;
}
