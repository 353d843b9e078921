//! `wl_surface`: a drawable rectangle with double-buffered state.

use std::ffi::c_void;

use parking_lot::Mutex;

use crate::error::{Result, ValidationError};
use crate::object::{Dispatch, HandlerSlot, ObjectData, decode_event, handle, require_version};
use crate::protocol::ObjectId;
use crate::protocol::callback::{Callback, CallbackData};
use crate::protocol::message::Message;
use crate::protocol::region::Region;
use crate::protocol::wire::Encoder;
use crate::protocol::xdg::shell_surface::ShellSurfaceData;
use crate::transport::Connection;
use crate::{wl_enum, wl_opcode};

wl_opcode! {
    SurfaceRequest("wl_surface") {
        Destroy = 0,
        Attach = 1,
        Damage = 2,
        Frame = 3,
        SetOpaqueRegion = 4,
        SetInputRegion = 5,
        Commit = 6,
        SetBufferTransform = 7,
        SetBufferScale = 8,
        DamageBuffer = 9,
        Offset = 10,
    }
}

wl_opcode! {
    SurfaceEventCode("wl_surface") {
        Enter = 0,
        Leave = 1,
        PreferredBufferScale = 2,
        PreferredBufferTransform = 3,
    }
}

wl_enum! {
    /// `wl_output.transform`: rotation and flip applied to buffer contents.
    Transform {
        Normal = 0,
        Rotate90 = 1,
        Rotate180 = 2,
        Rotate270 = 3,
        Flipped = 4,
        Flipped90 = 5,
        Flipped180 = 6,
        Flipped270 = 7,
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::Normal
    }
}

/// A rectangle in surface or buffer coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Opaque handle given to a GPU backend to create its presentation surface.
///
/// It is the surface's object id widened to pointer size; it carries no ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeSurfaceHandle(usize);

impl NativeSurfaceHandle {
    pub fn as_raw(self) -> usize {
        self.0
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// Surface state as of the last commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// Attached `wl_buffer` id, if any.
    pub buffer: Option<ObjectId>,
    /// Position of the buffer relative to the previous one.
    pub offset: (i32, i32),
    /// Damage in surface coordinates delivered with the last commit.
    pub damage: Vec<Rect>,
    /// Damage in buffer coordinates delivered with the last commit.
    pub buffer_damage: Vec<Rect>,
    pub opaque_region: Option<ObjectId>,
    pub input_region: Option<ObjectId>,
    pub scale: i32,
    pub transform: Transform,
}

/// Mutations since the last commit. `None` means "unchanged".
#[derive(Debug, Default)]
struct PendingState {
    buffer: Option<Option<ObjectId>>,
    offset: Option<(i32, i32)>,
    damage: Vec<Rect>,
    buffer_damage: Vec<Rect>,
    opaque_region: Option<Option<ObjectId>>,
    input_region: Option<Option<ObjectId>>,
    scale: Option<i32>,
    transform: Option<Transform>,
}

impl PendingState {
    fn is_empty(&self) -> bool {
        self.buffer.is_none()
            && self.offset.is_none()
            && self.damage.is_empty()
            && self.buffer_damage.is_empty()
            && self.opaque_region.is_none()
            && self.input_region.is_none()
            && self.scale.is_none()
            && self.transform.is_none()
    }

    /// Moves everything pending into `current`. Damage only lives for one commit.
    fn apply(&mut self, current: &mut SurfaceState) {
        let pending = std::mem::take(self);
        if let Some(buffer) = pending.buffer {
            current.buffer = buffer;
        }
        current.offset = pending.offset.unwrap_or((0, 0));
        current.damage = pending.damage;
        current.buffer_damage = pending.buffer_damage;
        if let Some(region) = pending.opaque_region {
            current.opaque_region = region;
        }
        if let Some(region) = pending.input_region {
            current.input_region = region;
        }
        if let Some(scale) = pending.scale {
            current.scale = scale;
        }
        if let Some(transform) = pending.transform {
            current.transform = transform;
        }
    }
}

struct SurfaceInner {
    pending: PendingState,
    current: SurfaceState,
    /// The `xdg_surface` wrapping this surface.
    role: Option<ObjectId>,
    outputs: Vec<ObjectId>,
    preferred_scale: Option<i32>,
    preferred_transform: Option<Transform>,
}

/// What a surface handler is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Enter(ObjectId),
    Leave(ObjectId),
    PreferredBufferScale(i32),
    PreferredBufferTransform(Transform),
}

type SurfaceHandler = dyn FnMut(&Surface, SurfaceEvent) + Send;

pub(crate) struct SurfaceData {
    pub(crate) version: u32,
    state: Mutex<SurfaceInner>,
    handler: HandlerSlot<SurfaceHandler>,
}

impl SurfaceData {
    pub(crate) fn new(version: u32) -> Self {
        Self {
            version,
            state: Mutex::new(SurfaceInner {
                pending: PendingState::default(),
                current: SurfaceState {
                    scale: 1,
                    ..SurfaceState::default()
                },
                role: None,
                outputs: Vec::new(),
                preferred_scale: None,
                preferred_transform: None,
            }),
            handler: HandlerSlot::new(),
        }
    }

    /// Checks the surface can be given a shell role.
    pub(crate) fn check_role_free(&self, surface: ObjectId) -> Result<()> {
        let state = self.state.lock();
        if state.role.is_some() {
            return Err(ValidationError::RoleAlreadySet(surface).into());
        }
        if state.current.buffer.is_some() || matches!(state.pending.buffer, Some(Some(_))) {
            return Err(ValidationError::UnconfiguredBuffer(surface).into());
        }
        Ok(())
    }

    /// Links the surface to its `xdg_surface`.
    pub(crate) fn set_role(&self, shell_surface: ObjectId) {
        self.state.lock().role = Some(shell_surface);
    }

    pub(crate) fn clear_role(&self) {
        self.state.lock().role = None;
    }
}

impl Dispatch for SurfaceData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        let event = match SurfaceEventCode::try_from(message.opcode())? {
            SurfaceEventCode::Enter => {
                let output =
                    decode_event(Self::INTERFACE, &message, |args| args.required_object())?;
                let mut state = self.state.lock();
                if !state.outputs.contains(&output) {
                    state.outputs.push(output);
                }
                SurfaceEvent::Enter(output)
            }
            SurfaceEventCode::Leave => {
                let output =
                    decode_event(Self::INTERFACE, &message, |args| args.required_object())?;
                self.state.lock().outputs.retain(|o| *o != output);
                SurfaceEvent::Leave(output)
            }
            SurfaceEventCode::PreferredBufferScale => {
                let scale = decode_event(Self::INTERFACE, &message, |args| args.int())?;
                self.state.lock().preferred_scale = Some(scale);
                SurfaceEvent::PreferredBufferScale(scale)
            }
            SurfaceEventCode::PreferredBufferTransform => {
                let transform = decode_event(Self::INTERFACE, &message, |args| {
                    Ok(Transform::try_from(args.uint()?)?)
                })?;
                self.state.lock().preferred_transform = Some(transform);
                SurfaceEvent::PreferredBufferTransform(transform)
            }
        };

        let surface = Surface::new(conn.clone(), id);
        self.handler
            .invoke("wl_surface", |handler| handler(&surface, event));
        Ok(())
    }
}

handle! {
    /// A `wl_surface`.
    ///
    /// Every mutating request only touches pending state; [`Surface::commit`] applies it
    /// atomically.
    Surface => SurfaceData
}

impl Surface {
    /// Attaches a buffer, or detaches with `None`.
    ///
    /// From version 5 on the offset must be zero; use [`Surface::offset`] instead.
    pub fn attach(&self, buffer: Option<ObjectId>, x: i32, y: i32) -> Result<()> {
        let data = self.data()?;
        if data.version >= 5 && (x, y) != (0, 0) {
            return Err(ValidationError::InvalidOffset { x, y }.into());
        }

        let mut args = Encoder::new();
        args.object(buffer).int(x).int(y);
        self.conn
            .send_request(self.id, SurfaceRequest::Attach, args)?;

        let mut state = data.state.lock();
        state.pending.buffer = Some(buffer);
        if data.version < 5 {
            state.pending.offset = Some((x, y));
        }
        Ok(())
    }

    /// Marks a rectangle in surface coordinates as changed.
    pub fn damage(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let data = self.data()?;
        self.send_rect(SurfaceRequest::Damage, x, y, width, height)?;
        data.state
            .lock()
            .pending
            .damage
            .push(Rect::new(x, y, width, height));
        Ok(())
    }

    /// Marks a rectangle in buffer coordinates as changed.
    pub fn damage_buffer(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        let data = self.data()?;
        require_version(data.version, 4, SurfaceRequest::DamageBuffer)?;
        self.send_rect(SurfaceRequest::DamageBuffer, x, y, width, height)?;
        data.state
            .lock()
            .pending
            .buffer_damage
            .push(Rect::new(x, y, width, height));
        Ok(())
    }

    fn send_rect(&self, request: SurfaceRequest, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        let mut args = Encoder::new();
        args.int(x).int(y).int(w).int(h);
        self.conn.send_request(self.id, request, args)
    }

    /// Moves the surface's content relative to its current position. Double-buffered.
    pub fn offset(&self, x: i32, y: i32) -> Result<()> {
        let data = self.data()?;
        require_version(data.version, 5, SurfaceRequest::Offset)?;
        let mut args = Encoder::new();
        args.int(x).int(y);
        self.conn
            .send_request(self.id, SurfaceRequest::Offset, args)?;
        data.state.lock().pending.offset = Some((x, y));
        Ok(())
    }

    /// Requests a frame callback, fired when it is a good time to draw the next frame.
    /// Takes effect on the next commit.
    pub fn frame(&self) -> Result<Callback> {
        let data = CallbackData::new(self.data()?.version);
        let completion = data.completion();
        let id = self.conn.create_object(data.into_object())?;
        let mut args = Encoder::new();
        args.new_id(id);
        self.conn
            .send_request(self.id, SurfaceRequest::Frame, args)?;
        Ok(Callback::with_completion(self.conn.clone(), id, completion))
    }

    /// Marks the part of the surface that is fully opaque. `None` means empty. Double-buffered.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="set_opaque_region">
    ///   <description summary="set opaque region">
    ///     This request sets the region of the surface that contains
    ///     opaque content. The opaque region is an optimization hint for
    ///     the compositor that lets it optimize the redrawing of content
    ///     behind opaque regions.
    ///
    ///     Opaque region is double-buffered state, see wl_surface.commit.
    ///   </description>
    ///   <arg name="region" type="object" interface="wl_region" allow-null="true"/>
    /// </request>
    /// ```
    pub fn set_opaque_region(&self, region: Option<&Region>) -> Result<()> {
        let data = self.data()?;
        let region = region.map(Region::id);
        let mut args = Encoder::new();
        args.object(region);
        self.conn
            .send_request(self.id, SurfaceRequest::SetOpaqueRegion, args)?;
        data.state.lock().pending.opaque_region = Some(region);
        Ok(())
    }

    /// Limits pointer and touch input to a region. `None` means the whole surface. Double-buffered.
    pub fn set_input_region(&self, region: Option<&Region>) -> Result<()> {
        let data = self.data()?;
        let region = region.map(Region::id);
        let mut args = Encoder::new();
        args.object(region);
        self.conn
            .send_request(self.id, SurfaceRequest::SetInputRegion, args)?;
        data.state.lock().pending.input_region = Some(region);
        Ok(())
    }

    /// Declares the transform already applied to attached buffers. Double-buffered.
    pub fn set_buffer_transform(&self, transform: Transform) -> Result<()> {
        let data = self.data()?;
        require_version(data.version, 2, SurfaceRequest::SetBufferTransform)?;
        let mut args = Encoder::new();
        args.int(u32::from(transform) as i32);
        self.conn
            .send_request(self.id, SurfaceRequest::SetBufferTransform, args)?;
        data.state.lock().pending.transform = Some(transform);
        Ok(())
    }

    /// Declares the scale attached buffers are drawn at. Must be positive. Double-buffered.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="set_buffer_scale" since="3">
    ///   <description summary="sets the buffer scaling factor">
    ///     This request sets an optional scaling factor on how the compositor
    ///     interprets the contents of the buffer attached to the window.
    ///
    ///     Buffer scale is double-buffered state, see wl_surface.commit.
    ///
    ///     If scale is not greater than 0 the invalid_scale protocol error is
    ///     raised.
    ///   </description>
    ///   <arg name="scale" type="int" summary="scale for interpreting buffer contents"/>
    /// </request>
    /// ```
    pub fn set_buffer_scale(&self, scale: i32) -> Result<()> {
        let data = self.data()?;
        require_version(data.version, 3, SurfaceRequest::SetBufferScale)?;
        if scale <= 0 {
            return Err(ValidationError::InvalidScale(scale).into());
        }
        let mut args = Encoder::new();
        args.int(scale);
        self.conn
            .send_request(self.id, SurfaceRequest::SetBufferScale, args)?;
        data.state.lock().pending.scale = Some(scale);
        Ok(())
    }

    /// Atomically applies all pending state.
    ///
    /// A surface with a shell role is checked against its configure state first; see
    /// [`ShellSurface`](crate::protocol::xdg::ShellSurface) for the rules.
    pub fn commit(&self) -> Result<()> {
        let data = self.data()?;
        let (role, has_buffer) = {
            let state = data.state.lock();
            let buffer = state.pending.buffer.unwrap_or(state.current.buffer);
            (state.role, buffer.is_some())
        };
        if let Some(role) = role {
            self.conn
                .data::<ShellSurfaceData>(role)?
                .check_commit(self.id, has_buffer)?;
        }

        self.conn
            .send_request(self.id, SurfaceRequest::Commit, Encoder::new())?;

        let mut state = data.state.lock();
        let SurfaceInner {
            pending, current, ..
        } = &mut *state;
        pending.apply(current);
        Ok(())
    }

    /// State as of the last commit.
    pub fn current(&self) -> Result<SurfaceState> {
        Ok(self.data()?.state.lock().current.clone())
    }

    /// Whether any request has changed pending state since the last commit.
    pub fn has_pending(&self) -> Result<bool> {
        Ok(!self.data()?.state.lock().pending.is_empty())
    }

    /// Outputs the surface is currently shown on.
    pub fn outputs(&self) -> Result<Vec<ObjectId>> {
        Ok(self.data()?.state.lock().outputs.clone())
    }

    pub fn preferred_buffer_scale(&self) -> Result<Option<i32>> {
        Ok(self.data()?.state.lock().preferred_scale)
    }

    pub fn preferred_buffer_transform(&self) -> Result<Option<Transform>> {
        Ok(self.data()?.state.lock().preferred_transform)
    }

    pub fn set_handler(
        &self,
        handler: impl FnMut(&Surface, SurfaceEvent) + Send + 'static,
    ) -> Result<()> {
        self.data()?.handler.set(Box::new(handler));
        Ok(())
    }

    pub fn native_handle(&self) -> NativeSurfaceHandle {
        NativeSurfaceHandle(self.id as usize)
    }

    /// Destroys the surface. Any shell surface wrapping it must be destroyed first; on that
    /// error the handle stays usable.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="destroy" type="destructor">
    ///   <description summary="delete surface">
    ///     Deletes the surface and invalidates its object ID.
    ///   </description>
    /// </request>
    /// ```
    pub fn destroy(&self) -> Result<()> {
        if self.data()?.state.lock().role.is_some() {
            return Err(ValidationError::LiveShellSurface(self.id).into());
        }
        self.conn
            .send_request(self.id, SurfaceRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_state_is_invisible_until_applied() {
        let mut pending = PendingState::default();
        let mut current = SurfaceState {
            scale: 1,
            ..SurfaceState::default()
        };
        pending.buffer = Some(Some(9));
        pending.scale = Some(2);
        pending.damage.push(Rect::new(0, 0, 10, 10));
        assert!(!pending.is_empty());
        assert_eq!(current.buffer, None);

        pending.apply(&mut current);
        assert!(pending.is_empty());
        assert_eq!(current.buffer, Some(9));
        assert_eq!(current.scale, 2);
        assert_eq!(current.damage, vec![Rect::new(0, 0, 10, 10)]);
    }

    #[test]
    fn damage_and_offset_last_one_commit() {
        let mut current = SurfaceState::default();
        let mut pending = PendingState {
            offset: Some((3, 4)),
            damage: vec![Rect::new(1, 1, 1, 1)],
            opaque_region: Some(Some(12)),
            ..PendingState::default()
        };
        pending.apply(&mut current);
        assert_eq!(current.offset, (3, 4));

        PendingState::default().apply(&mut current);
        assert_eq!(current.offset, (0, 0));
        assert!(current.damage.is_empty());
        assert_eq!(current.opaque_region, Some(12));
    }

    #[test]
    fn detaching_clears_the_buffer() {
        let mut current = SurfaceState {
            buffer: Some(4),
            ..SurfaceState::default()
        };
        let mut pending = PendingState {
            buffer: Some(None),
            ..PendingState::default()
        };
        pending.apply(&mut current);
        assert_eq!(current.buffer, None);
    }

    #[test]
    fn transform_rejects_unknown_values() {
        assert_eq!(Transform::try_from(5), Ok(Transform::Flipped90));
        assert!(Transform::try_from(8).is_err());
        assert_eq!(Transform::default(), Transform::Normal);
    }

    #[test]
    fn native_handle_is_the_object_id() {
        let handle = NativeSurfaceHandle(7);
        assert_eq!(handle.as_raw(), 7);
        assert_eq!(handle.as_ptr() as usize, 7);
    }
}
