//! `xdg_popup`: short-lived windows placed relative to a parent.

use parking_lot::Mutex;

use super::positioner::{Positioner, PositionerData, PositionerRules};
use super::shell_surface::ShellSurfaceData;
use crate::error::Result;
use crate::object::{Dispatch, HandlerSlot, ObjectData, decode_event, handle, require_version};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::surface::Rect;
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    PopupRequest("xdg_popup") {
        Destroy = 0,
        Grab = 1,
        Reposition = 2,
    }
}

wl_opcode! {
    PopupEventCode("xdg_popup") {
        Configure = 0,
        PopupDone = 1,
        Repositioned = 2,
    }
}

/// What a popup handler is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupEvent {
    /// Position relative to the parent's window geometry, and size. Applied verbatim.
    Configure(Rect),
    /// The compositor dismissed the popup; the client must destroy it.
    Done,
    /// Answers [`Popup::reposition`] with its token; a configure follows.
    Repositioned(u32),
}

#[derive(Debug)]
struct PopupInner {
    geometry: Option<Rect>,
    done: bool,
    grabbed: bool,
    rules: PositionerRules,
    repositioned: Option<u32>,
}

type PopupHandler = dyn FnMut(&Popup, PopupEvent) + Send;

pub(crate) struct PopupData {
    pub(crate) version: u32,
    shell_surface: ObjectId,
    parent: Option<ObjectId>,
    state: Mutex<PopupInner>,
    handler: HandlerSlot<PopupHandler>,
}

impl PopupData {
    pub(crate) fn new(
        version: u32,
        shell_surface: ObjectId,
        parent: Option<ObjectId>,
        rules: PositionerRules,
    ) -> Self {
        Self {
            version,
            shell_surface,
            parent,
            state: Mutex::new(PopupInner {
                geometry: None,
                done: false,
                grabbed: false,
                rules,
                repositioned: None,
            }),
            handler: HandlerSlot::new(),
        }
    }
}

impl Dispatch for PopupData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        let event = match PopupEventCode::try_from(message.opcode())? {
            PopupEventCode::Configure => {
                let rect = decode_event(Self::INTERFACE, &message, |args| {
                    Ok(Rect::new(args.int()?, args.int()?, args.int()?, args.int()?))
                })?;
                self.state.lock().geometry = Some(rect);
                PopupEvent::Configure(rect)
            }
            PopupEventCode::PopupDone => {
                decode_event(Self::INTERFACE, &message, |_| Ok(()))?;
                log::debug!("xdg_popup@{id} dismissed");
                self.state.lock().done = true;
                PopupEvent::Done
            }
            PopupEventCode::Repositioned => {
                let token = decode_event(Self::INTERFACE, &message, |args| args.uint())?;
                self.state.lock().repositioned = Some(token);
                PopupEvent::Repositioned(token)
            }
        };

        let popup = Popup::new(conn.clone(), id);
        self.handler
            .invoke("xdg_popup", |handler| handler(&popup, event));
        Ok(())
    }
}

handle! {
    /// The popup role.
    Popup => PopupData
}

impl Popup {
    /// Takes an explicit input grab, in response to the input event carrying `serial`.
    /// Must be sent before the popup is first committed.
    pub fn grab(&self, seat: ObjectId, serial: u32) -> Result<()> {
        let data = self.data()?;
        let mut args = Encoder::new();
        args.object(Some(seat)).uint(serial);
        self.conn.send_request(self.id, PopupRequest::Grab, args)?;
        data.state.lock().grabbed = true;
        Ok(())
    }

    /// Moves the popup using new rules. `positioner` is consumed; the compositor answers
    /// with `repositioned(token)` followed by a configure.
    pub fn reposition(&self, positioner: &Positioner, token: u32) -> Result<()> {
        let data = self.data()?;
        require_version(data.version, 3, PopupRequest::Reposition)?;
        let rules = self
            .conn
            .data::<PositionerData>(positioner.id())?
            .consume(positioner.id())?;

        let mut args = Encoder::new();
        args.object(Some(positioner.id())).uint(token);
        self.conn
            .send_request(self.id, PopupRequest::Reposition, args)?;
        data.state.lock().rules = rules;
        Ok(())
    }

    /// Geometry from the last configure.
    pub fn geometry(&self) -> Result<Option<Rect>> {
        Ok(self.data()?.state.lock().geometry)
    }

    /// Whether the compositor has dismissed the popup.
    pub fn is_done(&self) -> Result<bool> {
        Ok(self.data()?.state.lock().done)
    }

    pub fn is_grabbed(&self) -> Result<bool> {
        Ok(self.data()?.state.lock().grabbed)
    }

    /// Placement rules currently in effect.
    pub fn rules(&self) -> Result<PositionerRules> {
        Ok(self.data()?.state.lock().rules.clone())
    }

    /// Token of the last `repositioned` event.
    pub fn last_repositioned(&self) -> Result<Option<u32>> {
        Ok(self.data()?.state.lock().repositioned)
    }

    /// Id of the parent shell surface, if one was given.
    pub fn parent(&self) -> Result<Option<ObjectId>> {
        Ok(self.data()?.parent)
    }

    pub fn set_handler(
        &self,
        handler: impl FnMut(&Popup, PopupEvent) + Send + 'static,
    ) -> Result<()> {
        self.data()?.handler.set(Box::new(handler));
        Ok(())
    }

    /// Destroys the popup. Its shell surface may then take a new role or be destroyed.
    pub fn destroy(self) -> Result<()> {
        let data = self.data()?;
        self.conn
            .send_request(self.id, PopupRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);
        if let Ok(shell_surface) = self.conn.data::<ShellSurfaceData>(data.shell_surface) {
            shell_surface.role_destroyed();
        }
        Ok(())
    }
}
