//! A Wayland client core written against the wire protocol directly.
//!
//! The crate frames and parses messages, passes file descriptors over the Unix socket,
//! keeps the client's object ids, and implements the objects needed to put a window on
//! screen: `wl_display`, `wl_registry`, `wl_compositor`, `wl_surface`, `wl_region`,
//! `wl_callback` and the xdg-shell family.
//!
//! ```no_run
//! use wlwire::{Compositor, Connection, WmBase};
//!
//! # fn main() -> wlwire::Result<()> {
//! let conn = Connection::connect_to_env()?;
//! let registry = conn.display().get_registry()?;
//! conn.roundtrip()?;
//!
//! let compositor: Compositor = registry.bind_first()?;
//! let wm_base: WmBase = registry.bind_first()?;
//! let surface = compositor.create_surface()?;
//! let shell_surface = wm_base.get_shell_surface(&surface)?;
//! let toplevel = shell_surface.get_toplevel()?;
//! toplevel.set_title("Hello")?;
//! surface.commit()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod object;
pub mod protocol;
pub mod transport;

pub use config::ConnectionConfig;
pub use error::{Error, ProtocolError, Result, ValidationError};
pub use protocol::callback::Callback;
pub use protocol::compositor::Compositor;
pub use protocol::display::Display;
pub use protocol::region::Region;
pub use protocol::registry::event::{Global, RegistryEvent};
pub use protocol::registry::{Bindable, Registry};
pub use protocol::surface::{
    NativeSurfaceHandle, Rect, Surface, SurfaceEvent, SurfaceState, Transform,
};
pub use protocol::xdg::{
    Anchor, ConstraintAdjustment, Gravity, Popup, PopupEvent, Positioner, ResizeEdge,
    ShellSurface, Toplevel, ToplevelEvent, ToplevelFlags, WmBase,
};
pub use protocol::{ObjectId, Opcode};
pub use transport::Connection;
