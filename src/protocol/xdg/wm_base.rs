//! `xdg_wm_base`: liveness checks and the shell surface factory.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use super::positioner::{Positioner, PositionerData};
use super::shell_surface::{ShellSurface, ShellSurfaceData};
use crate::error::{Result, ValidationError};
use crate::object::{Dispatch, HandlerSlot, ObjectData, decode_event, handle};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::registry::Bindable;
use crate::protocol::surface::{Surface, SurfaceData};
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    WmBaseRequest("xdg_wm_base") {
        Destroy = 0,
        CreatePositioner = 1,
        GetXdgSurface = 2,
        Pong = 3,
    }
}

wl_opcode! {
    WmBaseEventCode("xdg_wm_base") {
        /// The compositor checks the client is alive; it must answer with `pong`.
        Ping = 0,
    }
}

type PingHandler = dyn FnMut(&WmBase, u32) + Send;

pub(crate) struct WmBaseData {
    pub(crate) version: u32,
    /// Live shell surfaces created from this object.
    surfaces: Mutex<BTreeSet<ObjectId>>,
    handler: HandlerSlot<PingHandler>,
}

impl WmBaseData {
    pub(crate) fn new(version: u32) -> Self {
        Self {
            version,
            surfaces: Mutex::default(),
            handler: HandlerSlot::new(),
        }
    }

    pub(crate) fn forget_surface(&self, shell_surface: ObjectId) {
        self.surfaces.lock().remove(&shell_surface);
    }
}

impl Dispatch for WmBaseData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        match WmBaseEventCode::try_from(message.opcode())? {
            WmBaseEventCode::Ping => {
                let serial = decode_event(Self::INTERFACE, &message, |args| args.uint())?;
                // Answer before any user code runs.
                let mut args = Encoder::new();
                args.uint(serial);
                conn.send_request(id, WmBaseRequest::Pong, args)?;

                let wm_base = WmBase::new(conn.clone(), id);
                self.handler
                    .invoke("xdg_wm_base ping", |handler| handler(&wm_base, serial));
                Ok(())
            }
        }
    }
}

handle! {
    /// The bound `xdg_wm_base` global.
    ///
    /// Pings are answered automatically before the ping handler runs.
    WmBase => WmBaseData
}

impl Bindable for WmBase {
    const INTERFACE: &'static str = "xdg_wm_base";
    const VERSION: u32 = 6;

    fn from_id(conn: Connection, id: ObjectId) -> Self {
        Self::new(conn, id)
    }
}

impl WmBase {
    /// Creates a positioner for placing a popup.
    pub fn create_positioner(&self) -> Result<Positioner> {
        let version = self.data()?.version;
        let id = self
            .conn
            .create_object(PositionerData::new(version).into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn
            .send_request(self.id, WmBaseRequest::CreatePositioner, args)?;
        Ok(Positioner::new(self.conn.clone(), id))
    }

    /// Wraps `surface` in an `xdg_surface`.
    ///
    /// The surface must not already have a role, nor a buffer attached or committed.
    pub fn get_shell_surface(&self, surface: &Surface) -> Result<ShellSurface> {
        let data = self.data()?;
        let surface_data = self.conn.data::<SurfaceData>(surface.id())?;
        surface_data.check_role_free(surface.id())?;

        let id = self.conn.create_object(
            ShellSurfaceData::new(data.version, self.id, surface.id()).into_object(),
        )?;
        surface_data.set_role(id);

        let mut args = Encoder::new();
        args.new_id(id).object(Some(surface.id()));
        self.conn
            .send_request(self.id, WmBaseRequest::GetXdgSurface, args)?;
        data.surfaces.lock().insert(id);
        Ok(ShellSurface::new(self.conn.clone(), id))
    }

    pub fn set_ping_handler(
        &self,
        handler: impl FnMut(&WmBase, u32) + Send + 'static,
    ) -> Result<()> {
        self.data()?.handler.set(Box::new(handler));
        Ok(())
    }

    /// Destroys the global. Every shell surface created from it must be destroyed first;
    /// on that error the handle stays usable.
    pub fn destroy(&self) -> Result<()> {
        if !self.data()?.surfaces.lock().is_empty() {
            return Err(ValidationError::DefunctSurfaces(self.id).into());
        }
        self.conn
            .send_request(self.id, WmBaseRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);
        Ok(())
    }
}
