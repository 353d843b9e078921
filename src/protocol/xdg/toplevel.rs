//! `xdg_toplevel`: the application window role.

use bitflags::bitflags;
use parking_lot::Mutex;

use super::shell_surface::ShellSurfaceData;
use crate::error::{Error, ProtocolError, Result};
use crate::object::{
    Dispatch, HandlerSlot, ObjectData, decode_event, handle, require_non_negative,
};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::types::WlArray;
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::{wl_enum, wl_opcode};

wl_opcode! {
    ToplevelRequest("xdg_toplevel") {
        Destroy = 0,
        SetParent = 1,
        SetTitle = 2,
        SetAppId = 3,
        ShowWindowMenu = 4,
        Move = 5,
        Resize = 6,
        SetMaxSize = 7,
        SetMinSize = 8,
        SetMaximized = 9,
        UnsetMaximized = 10,
        SetFullscreen = 11,
        UnsetFullscreen = 12,
        SetMinimized = 13,
    }
}

wl_opcode! {
    ToplevelEventCode("xdg_toplevel") {
        Configure = 0,
        Close = 1,
        ConfigureBounds = 2,
        WmCapabilities = 3,
    }
}

wl_enum! {
    /// Entries of the `states` array in a toplevel configure.
    WindowState {
        Maximized = 1,
        Fullscreen = 2,
        Resizing = 3,
        Activated = 4,
        TiledLeft = 5,
        TiledRight = 6,
        TiledTop = 7,
        TiledBottom = 8,
        Suspended = 9,
    }
}

wl_enum! {
    /// Edge or corner being dragged in an interactive resize.
    ResizeEdge {
        None = 0,
        Top = 1,
        Bottom = 2,
        Left = 4,
        TopLeft = 5,
        BottomLeft = 6,
        Right = 8,
        TopRight = 9,
        BottomRight = 10,
    }
}

bitflags! {
    /// Window management features the compositor offers for this toplevel.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct WmCapabilities: u32 {
        const WINDOW_MENU = 1 << 0;
        const MAXIMIZE = 1 << 1;
        const FULLSCREEN = 1 << 2;
        const MINIMIZE = 1 << 3;
    }
}

impl WmCapabilities {
    fn from_wire(values: &[u32]) -> Self {
        values
            .iter()
            .fold(WmCapabilities::empty(), |caps, &value| match value {
                1..=4 => caps | WmCapabilities::from_bits_retain(1 << (value - 1)),
                _ => {
                    log::warn!("ignoring unknown xdg_toplevel capability {value}");
                    caps
                }
            })
    }
}

/// Window state derived from the last configure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToplevelFlags {
    pub maximized: bool,
    pub fullscreen: bool,
    pub resizing: bool,
    pub activated: bool,
    pub tiled_left: bool,
    pub tiled_right: bool,
    pub tiled_top: bool,
    pub tiled_bottom: bool,
    pub suspended: bool,
}

impl ToplevelFlags {
    /// Builds the flags from scratch; an empty set clears everything. Unknown values are
    /// skipped so newer compositors keep working.
    pub fn from_states(states: &[u32]) -> Self {
        let mut flags = ToplevelFlags::default();
        for &value in states {
            match WindowState::try_from(value) {
                Ok(WindowState::Maximized) => flags.maximized = true,
                Ok(WindowState::Fullscreen) => flags.fullscreen = true,
                Ok(WindowState::Resizing) => flags.resizing = true,
                Ok(WindowState::Activated) => flags.activated = true,
                Ok(WindowState::TiledLeft) => flags.tiled_left = true,
                Ok(WindowState::TiledRight) => flags.tiled_right = true,
                Ok(WindowState::TiledTop) => flags.tiled_top = true,
                Ok(WindowState::TiledBottom) => flags.tiled_bottom = true,
                Ok(WindowState::Suspended) => flags.suspended = true,
                Err(_) => log::warn!("ignoring unknown xdg_toplevel state {value}"),
            }
        }
        flags
    }
}

/// A toplevel configure. A zero width or height leaves that dimension to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToplevelConfigure {
    pub width: i32,
    pub height: i32,
    pub flags: ToplevelFlags,
}

/// What a toplevel handler is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToplevelEvent {
    Configure(ToplevelConfigure),
    /// The user asked to close the window. Nothing is destroyed automatically.
    Close,
    /// Suggested maximum size, e.g. the output's work area.
    ConfigureBounds { width: i32, height: i32 },
    WmCapabilities(WmCapabilities),
}

#[derive(Debug, Default)]
struct ToplevelInner {
    title: Option<String>,
    app_id: Option<String>,
    parent: Option<ObjectId>,
    min_size: (i32, i32),
    max_size: (i32, i32),
    size: (i32, i32),
    flags: ToplevelFlags,
    bounds: Option<(i32, i32)>,
    capabilities: WmCapabilities,
    close_requested: bool,
}

type ToplevelHandler = dyn FnMut(&Toplevel, ToplevelEvent) + Send;

pub(crate) struct ToplevelData {
    pub(crate) version: u32,
    shell_surface: ObjectId,
    state: Mutex<ToplevelInner>,
    handler: HandlerSlot<ToplevelHandler>,
}

impl ToplevelData {
    pub(crate) fn new(version: u32, shell_surface: ObjectId) -> Self {
        Self {
            version,
            shell_surface,
            state: Mutex::default(),
            handler: HandlerSlot::new(),
        }
    }
}

fn decode_u32s(array: WlArray) -> Result<Vec<u32>> {
    array.to_u32s().ok_or_else(|| {
        Error::Protocol(ProtocolError::MisalignedPayload {
            len: array.as_slice().len(),
        })
    })
}

impl Dispatch for ToplevelData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        let event = match ToplevelEventCode::try_from(message.opcode())? {
            ToplevelEventCode::Configure => {
                let (width, height, states) =
                    decode_event(Self::INTERFACE, &message, |args| {
                        Ok((args.int()?, args.int()?, decode_u32s(args.array()?)?))
                    })?;
                let configure = ToplevelConfigure {
                    width,
                    height,
                    flags: ToplevelFlags::from_states(&states),
                };
                let mut state = self.state.lock();
                state.size = (width, height);
                state.flags = configure.flags;
                ToplevelEvent::Configure(configure)
            }
            ToplevelEventCode::Close => {
                decode_event(Self::INTERFACE, &message, |_| Ok(()))?;
                self.state.lock().close_requested = true;
                ToplevelEvent::Close
            }
            ToplevelEventCode::ConfigureBounds => {
                let (width, height) = decode_event(Self::INTERFACE, &message, |args| {
                    Ok((args.int()?, args.int()?))
                })?;
                self.state.lock().bounds = Some((width, height));
                ToplevelEvent::ConfigureBounds { width, height }
            }
            ToplevelEventCode::WmCapabilities => {
                let values = decode_event(Self::INTERFACE, &message, |args| {
                    decode_u32s(args.array()?)
                })?;
                let capabilities = WmCapabilities::from_wire(&values);
                self.state.lock().capabilities = capabilities;
                ToplevelEvent::WmCapabilities(capabilities)
            }
        };

        let toplevel = Toplevel::new(conn.clone(), id);
        self.handler
            .invoke("xdg_toplevel", |handler| handler(&toplevel, event));
        Ok(())
    }
}

handle! {
    /// The toplevel window role.
    Toplevel => ToplevelData
}

impl Toplevel {
    fn send(&self, request: ToplevelRequest, args: Encoder) -> Result<()> {
        self.data()?;
        self.conn.send_request(self.id, request, args)
    }

    /// Makes this window a child of `parent`, or a top-level window again with `None`.
    pub fn set_parent(&self, parent: Option<&Toplevel>) -> Result<()> {
        let parent = parent.map(Toplevel::id);
        if let Some(parent) = parent {
            self.conn.data::<ToplevelData>(parent)?;
        }
        let mut args = Encoder::new();
        args.object(parent);
        self.send(ToplevelRequest::SetParent, args)?;
        self.data()?.state.lock().parent = parent;
        Ok(())
    }

    /// Sets a short title for the window.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="set_title">
    ///   <description summary="set surface title">
    ///     Set a short title for the surface.
    ///
    ///     This string may be used to identify the surface in a task bar,
    ///     window list, or other user interface elements provided by the
    ///     compositor.
    ///
    ///     The string must be encoded in UTF-8.
    ///   </description>
    ///   <arg name="title" type="string"/>
    /// </request>
    /// ```
    pub fn set_title(&self, title: &str) -> Result<()> {
        let mut args = Encoder::new();
        args.string(title)?;
        self.send(ToplevelRequest::SetTitle, args)?;
        self.data()?.state.lock().title = Some(title.to_owned());
        Ok(())
    }

    /// Sets the application id, conventionally the desktop file name.
    pub fn set_app_id(&self, app_id: &str) -> Result<()> {
        let mut args = Encoder::new();
        args.string(app_id)?;
        self.send(ToplevelRequest::SetAppId, args)?;
        self.data()?.state.lock().app_id = Some(app_id.to_owned());
        Ok(())
    }

    /// Pops up the compositor's window menu at a surface-local position.
    pub fn show_window_menu(&self, seat: ObjectId, serial: u32, x: i32, y: i32) -> Result<()> {
        let mut args = Encoder::new();
        args.object(Some(seat)).uint(serial).int(x).int(y);
        self.send(ToplevelRequest::ShowWindowMenu, args)
    }

    /// Starts an interactive move, in response to the input event carrying `serial`.
    pub fn start_move(&self, seat: ObjectId, serial: u32) -> Result<()> {
        let mut args = Encoder::new();
        args.object(Some(seat)).uint(serial);
        self.send(ToplevelRequest::Move, args)
    }

    /// Starts an interactive resize from `edge`.
    pub fn start_resize(&self, seat: ObjectId, serial: u32, edge: ResizeEdge) -> Result<()> {
        let mut args = Encoder::new();
        args.object(Some(seat)).uint(serial).uint(edge.into());
        self.send(ToplevelRequest::Resize, args)
    }

    /// Zero means no limit.
    pub fn set_max_size(&self, width: i32, height: i32) -> Result<()> {
        require_non_negative(width, height)?;
        let mut args = Encoder::new();
        args.int(width).int(height);
        self.send(ToplevelRequest::SetMaxSize, args)?;
        self.data()?.state.lock().max_size = (width, height);
        Ok(())
    }

    /// Zero means no limit.
    pub fn set_min_size(&self, width: i32, height: i32) -> Result<()> {
        require_non_negative(width, height)?;
        let mut args = Encoder::new();
        args.int(width).int(height);
        self.send(ToplevelRequest::SetMinSize, args)?;
        self.data()?.state.lock().min_size = (width, height);
        Ok(())
    }

    /// Asks to be maximized. The compositor answers with a configure, or ignores it.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="set_maximized">
    ///   <description summary="maximize the window">
    ///     Maximize the surface.
    ///
    ///     After requesting that the surface should be maximized, the compositor
    ///     will respond by emitting a configure event. Whether this configure
    ///     actually sets the window maximized is subject to compositor policies.
    ///   </description>
    /// </request>
    /// ```
    pub fn set_maximized(&self) -> Result<()> {
        self.send(ToplevelRequest::SetMaximized, Encoder::new())
    }

    /// Asks to leave the maximized state.
    pub fn unset_maximized(&self) -> Result<()> {
        self.send(ToplevelRequest::UnsetMaximized, Encoder::new())
    }

    /// Requests fullscreen, optionally on a specific `wl_output`.
    pub fn set_fullscreen(&self, output: Option<ObjectId>) -> Result<()> {
        let mut args = Encoder::new();
        args.object(output);
        self.send(ToplevelRequest::SetFullscreen, args)
    }

    /// Asks to leave fullscreen.
    pub fn unset_fullscreen(&self) -> Result<()> {
        self.send(ToplevelRequest::UnsetFullscreen, Encoder::new())
    }

    /// Asks to be minimized. No configure confirms it.
    pub fn set_minimized(&self) -> Result<()> {
        self.send(ToplevelRequest::SetMinimized, Encoder::new())
    }

    pub fn title(&self) -> Result<Option<String>> {
        Ok(self.data()?.state.lock().title.clone())
    }

    pub fn app_id(&self) -> Result<Option<String>> {
        Ok(self.data()?.state.lock().app_id.clone())
    }

    pub fn parent(&self) -> Result<Option<ObjectId>> {
        Ok(self.data()?.state.lock().parent)
    }

    pub fn min_size(&self) -> Result<(i32, i32)> {
        Ok(self.data()?.state.lock().min_size)
    }

    pub fn max_size(&self) -> Result<(i32, i32)> {
        Ok(self.data()?.state.lock().max_size)
    }

    /// Size from the last configure; `(0, 0)` until one arrives.
    pub fn size(&self) -> Result<(i32, i32)> {
        Ok(self.data()?.state.lock().size)
    }

    pub fn flags(&self) -> Result<ToplevelFlags> {
        Ok(self.data()?.state.lock().flags)
    }

    pub fn bounds(&self) -> Result<Option<(i32, i32)>> {
        Ok(self.data()?.state.lock().bounds)
    }

    pub fn capabilities(&self) -> Result<WmCapabilities> {
        Ok(self.data()?.state.lock().capabilities)
    }

    /// Whether the compositor has sent `close`.
    pub fn close_requested(&self) -> Result<bool> {
        Ok(self.data()?.state.lock().close_requested)
    }

    pub fn set_handler(
        &self,
        handler: impl FnMut(&Toplevel, ToplevelEvent) + Send + 'static,
    ) -> Result<()> {
        self.data()?.handler.set(Box::new(handler));
        Ok(())
    }

    /// Unmaps the window. The shell surface stays and may be destroyed afterwards.
    pub fn destroy(self) -> Result<()> {
        let data = self.data()?;
        self.conn
            .send_request(self.id, ToplevelRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);
        if let Ok(shell_surface) = self.conn.data::<ShellSurfaceData>(data.shell_surface) {
            shell_surface.role_destroyed();
        }
        Ok(())
    }
}
