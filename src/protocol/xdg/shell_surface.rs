//! `xdg_surface`: the configure/ack handshake shared by every shell role.

use parking_lot::Mutex;

use super::popup::{Popup, PopupData};
use super::positioner::{Positioner, PositionerData};
use super::toplevel::{Toplevel, ToplevelData};
use super::wm_base::WmBaseData;
use crate::error::{Result, ValidationError};
use crate::object::{Dispatch, HandlerSlot, ObjectData, decode_event, handle, require_positive};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::surface::{Rect, SurfaceData};
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    ShellSurfaceRequest("xdg_surface") {
        Destroy = 0,
        GetToplevel = 1,
        GetPopup = 2,
        SetWindowGeometry = 3,
        AckConfigure = 4,
    }
}

wl_opcode! {
    ShellSurfaceEventCode("xdg_surface") {
        /// Ends a configure sequence; the role's own configure events come first.
        Configure = 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Toplevel,
    Popup,
}

#[derive(Debug, Default)]
struct ShellInner {
    configured: bool,
    /// Serials received since the last acknowledged one, oldest first.
    unacked: Vec<u32>,
    last_received: Option<u32>,
    last_acked: Option<u32>,
    /// Set once and never cleared: a shell surface gets one role for its lifetime.
    role: Option<RoleKind>,
    /// The live toplevel or popup, cleared when it is destroyed.
    role_object: Option<ObjectId>,
    geometry: Option<Rect>,
}

impl ShellInner {
    fn receive(&mut self, serial: u32) -> bool {
        let first = !self.configured;
        self.configured = true;
        self.last_received = Some(serial);
        self.unacked.push(serial);
        first
    }

    /// Acknowledging a serial also drops every older one.
    fn ack(&mut self, serial: u32) -> Result<()> {
        let Some(pos) = self.unacked.iter().position(|s| *s == serial) else {
            return Err(ValidationError::InvalidSerial { serial }.into());
        };
        self.unacked.drain(..=pos);
        self.last_acked = Some(serial);
        Ok(())
    }

    fn check_commit(&self, surface: ObjectId, has_buffer: bool) -> Result<()> {
        if !self.configured {
            if has_buffer {
                return Err(ValidationError::CommitBeforeConfigure { surface }.into());
            }
            return Ok(());
        }
        match self.last_received {
            Some(serial) if self.last_acked != Some(serial) => {
                Err(ValidationError::UnackedConfigure { surface, serial }.into())
            }
            _ => Ok(()),
        }
    }
}

type ConfigureHandler = dyn FnMut(&ShellSurface, u32) + Send;

pub(crate) struct ShellSurfaceData {
    pub(crate) version: u32,
    wm_base: ObjectId,
    surface: ObjectId,
    state: Mutex<ShellInner>,
    handler: HandlerSlot<ConfigureHandler>,
}

impl ShellSurfaceData {
    pub(crate) fn new(version: u32, wm_base: ObjectId, surface: ObjectId) -> Self {
        Self {
            version,
            wm_base,
            surface,
            state: Mutex::default(),
            handler: HandlerSlot::new(),
        }
    }

    /// Validates a `wl_surface.commit` on the wrapped surface.
    ///
    /// Before the first configure only the initial, buffer-less commit is allowed. After
    /// that the latest configure must have been acknowledged.
    pub(crate) fn check_commit(&self, surface: ObjectId, has_buffer: bool) -> Result<()> {
        self.state.lock().check_commit(surface, has_buffer)
    }

    pub(crate) fn role_destroyed(&self) {
        self.state.lock().role_object = None;
    }

    fn claim_role(&self, id: ObjectId, kind: RoleKind) -> Result<()> {
        let mut state = self.state.lock();
        if state.role.is_some() {
            return Err(ValidationError::RoleAlreadySet(id).into());
        }
        state.role = Some(kind);
        Ok(())
    }
}

impl Dispatch for ShellSurfaceData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        match ShellSurfaceEventCode::try_from(message.opcode())? {
            ShellSurfaceEventCode::Configure => {
                let serial = decode_event(Self::INTERFACE, &message, |args| args.uint())?;
                if self.state.lock().receive(serial) {
                    log::debug!("xdg_surface@{id} configured (serial {serial})");
                }
                let shell_surface = ShellSurface::new(conn.clone(), id);
                self.handler.invoke("xdg_surface configure", |handler| {
                    handler(&shell_surface, serial)
                });
                Ok(())
            }
        }
    }
}

handle! {
    /// A surface with window semantics: `xdg_surface`.
    ///
    /// The compositor proposes state with a configure sequence ending in a `configure`
    /// event carrying a serial. The client applies it, calls
    /// [`ack_configure`](ShellSurface::ack_configure), then commits the surface.
    /// [`Surface::commit`](crate::protocol::surface::Surface::commit) enforces that order:
    ///
    /// - before the first configure, a commit with a buffer is
    ///   [`ValidationError::CommitBeforeConfigure`];
    /// - after it, a commit while the latest serial is unacknowledged is
    ///   [`ValidationError::UnackedConfigure`].
    ShellSurface => ShellSurfaceData
}

impl ShellSurface {
    /// Gives the surface the toplevel role.
    pub fn get_toplevel(&self) -> Result<Toplevel> {
        let data = self.data()?;
        data.claim_role(self.id, RoleKind::Toplevel)?;

        let id = self
            .conn
            .create_object(ToplevelData::new(data.version, self.id).into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn
            .send_request(self.id, ShellSurfaceRequest::GetToplevel, args)?;
        data.state.lock().role_object = Some(id);
        Ok(Toplevel::new(self.conn.clone(), id))
    }

    /// Gives the surface the popup role, placed by `positioner` relative to `parent`.
    ///
    /// The positioner is consumed; using it again fails with
    /// [`ValidationError::PositionerConsumed`].
    pub fn get_popup(
        &self,
        parent: Option<&ShellSurface>,
        positioner: &Positioner,
    ) -> Result<Popup> {
        let data = self.data()?;
        if let Some(parent) = parent {
            self.conn.data::<ShellSurfaceData>(parent.id())?;
        }
        let positioner_data = self.conn.data::<PositionerData>(positioner.id())?;
        if data.state.lock().role.is_some() {
            return Err(ValidationError::RoleAlreadySet(self.id).into());
        }
        let rules = positioner_data.consume(positioner.id())?;
        data.claim_role(self.id, RoleKind::Popup)?;

        let id = self.conn.create_object(
            PopupData::new(data.version, self.id, parent.map(ShellSurface::id), rules)
                .into_object(),
        )?;
        let mut args = Encoder::new();
        args.new_id(id)
            .object(parent.map(ShellSurface::id))
            .object(Some(positioner.id()));
        self.conn
            .send_request(self.id, ShellSurfaceRequest::GetPopup, args)?;
        data.state.lock().role_object = Some(id);
        Ok(Popup::new(self.conn.clone(), id))
    }

    /// The visible window bounds, excluding client-side shadows.
    pub fn set_window_geometry(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        require_positive(width, height)?;
        let data = self.data()?;
        let mut args = Encoder::new();
        args.int(x).int(y).int(width).int(height);
        self.conn
            .send_request(self.id, ShellSurfaceRequest::SetWindowGeometry, args)?;
        data.state.lock().geometry = Some(Rect::new(x, y, width, height));
        Ok(())
    }

    /// Acknowledges a configure serial. It must have been received and not yet superseded
    /// by a later acknowledgement.
    pub fn ack_configure(&self, serial: u32) -> Result<()> {
        let data = self.data()?;
        data.state.lock().ack(serial)?;
        let mut args = Encoder::new();
        args.uint(serial);
        self.conn
            .send_request(self.id, ShellSurfaceRequest::AckConfigure, args)
    }

    /// Whether the first configure has arrived.
    pub fn is_configured(&self) -> Result<bool> {
        Ok(self.data()?.state.lock().configured)
    }

    /// Serial of the most recent configure event.
    pub fn last_configure_serial(&self) -> Result<Option<u32>> {
        Ok(self.data()?.state.lock().last_received)
    }

    pub fn last_acked_serial(&self) -> Result<Option<u32>> {
        Ok(self.data()?.state.lock().last_acked)
    }

    pub fn role(&self) -> Result<Option<RoleKind>> {
        Ok(self.data()?.state.lock().role)
    }

    pub fn window_geometry(&self) -> Result<Option<Rect>> {
        Ok(self.data()?.state.lock().geometry)
    }

    /// Id of the wrapped `wl_surface`.
    pub fn surface_id(&self) -> Result<ObjectId> {
        Ok(self.data()?.surface)
    }

    /// Handler run after every `configure`, with the serial to acknowledge.
    pub fn set_handler(
        &self,
        handler: impl FnMut(&ShellSurface, u32) + Send + 'static,
    ) -> Result<()> {
        self.data()?.handler.set(Box::new(handler));
        Ok(())
    }

    /// Destroys the shell surface, leaving the wrapped surface alive and role-less.
    /// The toplevel or popup must be destroyed first; on that error the handle stays usable.
    pub fn destroy(&self) -> Result<()> {
        let data = self.data()?;
        if data.state.lock().role_object.is_some() {
            return Err(ValidationError::DefunctRoleObject(self.id).into());
        }
        self.conn
            .send_request(self.id, ShellSurfaceRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);

        if let Ok(surface) = self.conn.data::<SurfaceData>(data.surface) {
            surface.clear_role();
        }
        if let Ok(wm_base) = self.conn.data::<WmBaseData>(data.wm_base) {
            wm_base.forget_surface(self.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_commit_without_buffer_is_allowed() {
        let state = ShellInner::default();
        assert!(state.check_commit(3, false).is_ok());
        assert_eq!(
            state.check_commit(3, true).unwrap_err().as_validation(),
            Some(&ValidationError::CommitBeforeConfigure { surface: 3 })
        );
    }

    #[test]
    fn configure_must_be_acked_before_commit() {
        let mut state = ShellInner::default();
        assert!(state.receive(10));
        assert!(!state.receive(11));
        assert_eq!(
            state.check_commit(3, true).unwrap_err().as_validation(),
            Some(&ValidationError::UnackedConfigure {
                surface: 3,
                serial: 11
            })
        );

        state.ack(10).unwrap();
        assert!(state.check_commit(3, true).is_err());
        state.ack(11).unwrap();
        assert!(state.check_commit(3, true).is_ok());
    }

    #[test]
    fn acking_drops_older_serials() {
        let mut state = ShellInner::default();
        state.receive(1);
        state.receive(2);
        state.ack(2).unwrap();
        assert_eq!(
            state.ack(1).unwrap_err().as_validation(),
            Some(&ValidationError::InvalidSerial { serial: 1 })
        );
        assert_eq!(
            state.ack(99).unwrap_err().as_validation(),
            Some(&ValidationError::InvalidSerial { serial: 99 })
        );
    }
}
