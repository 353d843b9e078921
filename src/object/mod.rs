//! The closed set of protocol objects a connection can route events to.

pub(crate) mod handler;
pub(crate) mod map;

use std::sync::Arc;

use crate::error::{Error, ProtocolError, Result, ValidationError};
use crate::protocol::callback::CallbackData;
use crate::protocol::compositor::CompositorData;
use crate::protocol::display::DisplayData;
use crate::protocol::message::Message;
use crate::protocol::region::RegionData;
use crate::protocol::registry::RegistryData;
use crate::protocol::surface::SurfaceData;
use crate::protocol::wire::Decoder;
use crate::protocol::xdg::popup::PopupData;
use crate::protocol::xdg::positioner::PositionerData;
use crate::protocol::xdg::shell_surface::ShellSurfaceData;
use crate::protocol::xdg::toplevel::ToplevelData;
use crate::protocol::xdg::wm_base::WmBaseData;
use crate::protocol::{ObjectId, Opcode};
use crate::transport::Connection;

pub(crate) use handler::HandlerSlot;

/// Decodes one incoming event and reacts to it.
pub(crate) trait Dispatch {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()>;
}

/// Per-kind object state stored in the arena.
pub(crate) trait ObjectData: Sized {
    const INTERFACE: &'static str;

    fn downcast(object: &Object) -> Option<Arc<Self>>;

    fn into_object(self) -> Object;
}

macro_rules! objects {
    ($($variant:ident($data:ty) = $interface:literal),* $(,)?) => {
        #[derive(Clone)]
        pub(crate) enum Object {
            $($variant(Arc<$data>),)*
        }

        impl Object {
            pub(crate) fn interface(&self) -> &'static str {
                match self {
                    $(Object::$variant(_) => $interface,)*
                }
            }

            pub(crate) fn version(&self) -> u32 {
                match self {
                    $(Object::$variant(data) => data.version,)*
                }
            }
        }

        impl Dispatch for Object {
            fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
                match self {
                    $(Object::$variant(data) => data.dispatch(conn, id, message),)*
                }
            }
        }

        $(
            impl ObjectData for $data {
                const INTERFACE: &'static str = $interface;

                fn downcast(object: &Object) -> Option<Arc<Self>> {
                    match object {
                        Object::$variant(data) => Some(Arc::clone(data)),
                        _ => None,
                    }
                }

                fn into_object(self) -> Object {
                    Object::$variant(Arc::new(self))
                }
            }
        )*
    };
}

objects! {
    Display(DisplayData) = "wl_display",
    Registry(RegistryData) = "wl_registry",
    Callback(CallbackData) = "wl_callback",
    Compositor(CompositorData) = "wl_compositor",
    Surface(SurfaceData) = "wl_surface",
    Region(RegionData) = "wl_region",
    WmBase(WmBaseData) = "xdg_wm_base",
    ShellSurface(ShellSurfaceData) = "xdg_surface",
    Toplevel(ToplevelData) = "xdg_toplevel",
    Popup(PopupData) = "xdg_popup",
    Positioner(PositionerData) = "xdg_positioner",
}

impl Object {
    /// Fresh state for a global bound through the registry, if the interface is supported.
    pub(crate) fn for_global(interface: &str, version: u32) -> Option<Object> {
        match interface {
            "wl_compositor" => Some(CompositorData::new(version).into_object()),
            "xdg_wm_base" => Some(WmBaseData::new(version).into_object()),
            _ => None,
        }
    }
}

/// Declares a lightweight, non-owning handle to an object in the connection's arena.
///
/// Handles carry only the id and the connection; state is looked up on each call, so a
/// handle to a destroyed object reports [`ValidationError::UnknownObject`].
macro_rules! handle {
    ($(#[$meta:meta])* $name:ident => $data:ty) => {
        $(#[$meta])*
        pub struct $name {
            id: $crate::protocol::ObjectId,
            conn: $crate::transport::Connection,
        }

        impl $name {
            pub(crate) fn new(
                conn: $crate::transport::Connection,
                id: $crate::protocol::ObjectId,
            ) -> Self {
                Self { id, conn }
            }

            pub fn id(&self) -> $crate::protocol::ObjectId {
                self.id
            }

            pub fn connection(&self) -> &$crate::transport::Connection {
                &self.conn
            }

            /// Version this object was bound or created at.
            pub fn version(&self) -> $crate::error::Result<u32> {
                self.conn.version(self.id)
            }

            #[allow(dead_code)]
            fn data(&self) -> $crate::error::Result<std::sync::Arc<$data>> {
                self.conn.data::<$data>(self.id)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}@{}", <$data as $crate::object::ObjectData>::INTERFACE, self.id)
            }
        }
    };
}

pub(crate) use handle;

/// Dispatch for interfaces that define no events.
pub(crate) fn no_events(interface: &'static str, message: &Message) -> Result<()> {
    Err(ProtocolError::UnknownOpcode {
        interface,
        opcode: message.opcode(),
    }
    .into())
}

/// Runs an event decoder over the whole payload.
///
/// Any failure inside a complete frame, including running out of bytes, means the
/// compositor sent something self-inconsistent, so it is reported as a protocol error.
pub(crate) fn decode_event<T>(
    interface: &'static str,
    message: &Message,
    decode: impl FnOnce(&mut Decoder<'_>) -> Result<T>,
) -> Result<T> {
    let malformed = |reason: String| {
        Error::Protocol(ProtocolError::MalformedEvent {
            interface,
            opcode: message.opcode(),
            reason,
        })
    };

    let mut args = message.args();
    let value = decode(&mut args).map_err(|err| malformed(err.to_string()))?;
    match args.remaining() {
        0 => Ok(value),
        trailing => Err(malformed(format!("{trailing} trailing bytes"))),
    }
}

/// Fails with [`ValidationError::UnsupportedVersion`] when `request` is newer than the
/// object's bound version.
pub(crate) fn require_version<R: Opcode>(version: u32, since: u32, request: R) -> Result<()> {
    if version >= since {
        return Ok(());
    }
    Err(ValidationError::UnsupportedVersion {
        interface: R::INTERFACE,
        request: format!("{request:?}"),
        since,
        version,
    }
    .into())
}

/// Rejects non-positive window sizes.
pub(crate) fn require_positive(width: i32, height: i32) -> Result<()> {
    if width > 0 && height > 0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidSize { width, height }.into())
    }
}

/// Rejects negative sizes; zero is allowed where it means "unset".
pub(crate) fn require_non_negative(width: i32, height: i32) -> Result<()> {
    if width >= 0 && height >= 0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidSize { width, height }.into())
    }
}
