//! `wl_registry`: global discovery and binding.

pub mod event;

use std::collections::BTreeMap;

use parking_lot::Mutex;

use self::event::{Global, RegistryEvent, RegistryEventCode};
use crate::error::{Result, ValidationError};
use crate::object::{Dispatch, HandlerSlot, Object, ObjectData, decode_event, handle};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    RegistryRequest("wl_registry") {
        /// Binds a global by name; carries an untyped new_id (interface, version, id).
        Bind = 0,
    }
}

/// A global interface this crate can bind.
pub trait Bindable: Sized {
    const INTERFACE: &'static str;

    /// Highest version this crate implements.
    const VERSION: u32;

    #[doc(hidden)]
    fn from_id(conn: Connection, id: ObjectId) -> Self;
}

type RegistryHandler = dyn FnMut(&Registry, RegistryEvent) + Send;

pub(crate) struct RegistryData {
    pub(crate) version: u32,
    globals: Mutex<BTreeMap<u32, Global>>,
    handler: HandlerSlot<RegistryHandler>,
}

impl RegistryData {
    pub(crate) fn new(version: u32) -> Self {
        Self {
            version,
            globals: Mutex::default(),
            handler: HandlerSlot::new(),
        }
    }
}

impl Dispatch for RegistryData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        let event = match RegistryEventCode::try_from(message.opcode())? {
            RegistryEventCode::Global => {
                let global = decode_event(Self::INTERFACE, &message, Global::decode)?;
                log::debug!("global {global}");
                self.globals.lock().insert(global.name, global.clone());
                RegistryEvent::Global(global)
            }
            RegistryEventCode::GlobalRemove => {
                let name = decode_event(Self::INTERFACE, &message, |args| args.uint())?;
                let global = self.globals.lock().remove(&name);
                log::debug!("global {name} removed");
                RegistryEvent::GlobalRemove { name, global }
            }
        };

        let registry = Registry::new(conn.clone(), id);
        self.handler
            .invoke("wl_registry", |handler| handler(&registry, event));
        Ok(())
    }
}

handle! {
    /// The compositor's list of globals.
    ///
    /// Globals are recorded as they are announced; call
    /// [`Connection::roundtrip`] after creating the registry to receive the initial burst.
    Registry => RegistryData
}

impl Registry {
    /// Globals currently announced, ordered by name.
    pub fn globals(&self) -> Result<Vec<Global>> {
        Ok(self.data()?.globals.lock().values().cloned().collect())
    }

    /// The first announced global implementing `interface`.
    pub fn find(&self, interface: &str) -> Result<Option<Global>> {
        Ok(self
            .data()?
            .globals
            .lock()
            .values()
            .find(|global| global.interface == interface)
            .cloned())
    }

    pub fn set_handler(
        &self,
        handler: impl FnMut(&Registry, RegistryEvent) + Send + 'static,
    ) -> Result<()> {
        self.data()?.handler.set(Box::new(handler));
        Ok(())
    }

    /// Binds global `name` as `I`.
    ///
    /// `name` must be a currently announced global implementing `I::INTERFACE`. The version
    /// actually bound is the lowest of `version`, the advertised version, and
    /// [`Bindable::VERSION`].
    pub fn bind<I: Bindable>(&self, name: u32, version: u32) -> Result<I> {
        let advertised = match self.data()?.globals.lock().get(&name) {
            Some(global) if global.interface == I::INTERFACE => global.version,
            Some(global) => {
                return Err(ValidationError::GlobalInterfaceMismatch {
                    name,
                    expected: I::INTERFACE,
                    actual: global.interface.clone(),
                }
                .into());
            }
            None => return Err(ValidationError::UnknownGlobal(name).into()),
        };
        let version = version.min(advertised).min(I::VERSION).max(1);

        let object = Object::for_global(I::INTERFACE, version)
            .ok_or(ValidationError::GlobalNotFound(I::INTERFACE))?;
        let id = self.conn.create_object(object)?;

        let mut args = Encoder::new();
        args.uint(name)
            .string(I::INTERFACE)?
            .uint(version)
            .new_id(id);
        self.conn.send_request(self.id, RegistryRequest::Bind, args)?;
        log::debug!("bound {}@{id} v{version} from global {name}", I::INTERFACE);
        Ok(I::from_id(self.conn.clone(), id))
    }

    /// Binds the first announced global implementing `I` at the highest common version.
    pub fn bind_first<I: Bindable>(&self) -> Result<I> {
        let global = self
            .find(I::INTERFACE)?
            .ok_or(ValidationError::GlobalNotFound(I::INTERFACE))?;
        self.bind(global.name, global.version)
    }
}
