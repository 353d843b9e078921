//! `wl_display`: the root object, bootstrap requests, and fatal error reporting.

pub mod event;
pub mod request;

use self::event::{DisplayError, DisplayErrorCode, DisplayEvent};
use self::request::DisplayRequest;
use crate::error::{Error, Result};
use crate::object::{Dispatch, ObjectData, decode_event, handle};
use crate::protocol::ObjectId;
use crate::protocol::callback::{Callback, CallbackData};
use crate::protocol::message::Message;
use crate::protocol::registry::{Registry, RegistryData};
use crate::protocol::wire::Encoder;
use crate::transport::Connection;

pub(crate) struct DisplayData {
    pub(crate) version: u32,
}

impl DisplayData {
    pub(crate) fn new() -> Self {
        Self { version: 1 }
    }
}

impl Dispatch for DisplayData {
    fn dispatch(&self, conn: &Connection, _id: ObjectId, message: Message) -> Result<()> {
        match DisplayEvent::try_from(message.opcode())? {
            DisplayEvent::Error => {
                let error = decode_event(Self::INTERFACE, &message, DisplayError::decode)?;
                let interface = conn.interface_of(error.object_id);
                let name = match DisplayErrorCode::try_from(error.code) {
                    Ok(code) if interface == Self::INTERFACE => format!(" ({code})"),
                    _ => String::new(),
                };
                log::error!(
                    "compositor error on {interface}@{} code {}{name}: {}",
                    error.object_id,
                    error.code,
                    error.message
                );
                Err(Error::Server {
                    object_id: error.object_id,
                    interface,
                    code: error.code,
                    message: error.message,
                })
            }
            DisplayEvent::DeleteId => {
                let id = decode_event(Self::INTERFACE, &message, |args| args.uint())?;
                conn.release_id(id);
                Ok(())
            }
        }
    }
}

handle! {
    /// The connection's root object.
    Display => DisplayData
}

impl Display {
    pub(crate) fn for_connection(conn: Connection) -> Self {
        Self::new(conn, crate::protocol::DISPLAY_ID)
    }

    /// Asks the compositor to fire the returned callback once it has handled every
    /// request sent before this one.
    pub fn sync(&self) -> Result<Callback> {
        let data = CallbackData::new(1);
        let completion = data.completion();
        let id = self.conn.create_object(data.into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn.send_request(self.id, DisplayRequest::Sync, args)?;
        Ok(Callback::with_completion(self.conn.clone(), id, completion))
    }

    /// Creates a registry; the compositor answers with one `global` event per global.
    ///
    /// Server-side resources behind a registry live until disconnect, so call this once.
    pub fn get_registry(&self) -> Result<Registry> {
        let id = self.conn.create_object(RegistryData::new(1).into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn
            .send_request(self.id, DisplayRequest::GetRegistry, args)?;
        Ok(Registry::new(self.conn.clone(), id))
    }
}
