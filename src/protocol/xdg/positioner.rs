//! `xdg_positioner`: placement rules for a popup.

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::error::{Result, ValidationError};
use crate::object::{
    Dispatch, ObjectData, handle, no_events, require_non_negative, require_positive,
    require_version,
};
use crate::protocol::ObjectId;
use crate::protocol::message::Message;
use crate::protocol::surface::Rect;
use crate::protocol::wire::Encoder;
use crate::transport::Connection;
use crate::{wl_enum, wl_opcode};

wl_opcode! {
    PositionerRequest("xdg_positioner") {
        Destroy = 0,
        SetSize = 1,
        SetAnchorRect = 2,
        SetAnchor = 3,
        SetGravity = 4,
        SetConstraintAdjustment = 5,
        SetOffset = 6,
        SetReactive = 7,
        SetParentSize = 8,
        SetParentConfigure = 9,
    }
}

wl_enum! {
    /// Edge or corner of the anchor rectangle the popup is anchored to.
    Anchor {
        None = 0,
        Top = 1,
        Bottom = 2,
        Left = 3,
        Right = 4,
        TopLeft = 5,
        BottomLeft = 6,
        TopRight = 7,
        BottomRight = 8,
    }
}

wl_enum! {
    /// Direction the popup extends from its anchor point.
    Gravity {
        None = 0,
        Top = 1,
        Bottom = 2,
        Left = 3,
        Right = 4,
        TopLeft = 5,
        BottomLeft = 6,
        TopRight = 7,
        BottomRight = 8,
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::None
    }
}

impl Default for Gravity {
    fn default() -> Self {
        Gravity::None
    }
}

bitflags! {
    /// How the compositor may adjust a popup that would end up constrained.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ConstraintAdjustment: u32 {
        const SLIDE_X = 1;
        const SLIDE_Y = 2;
        const FLIP_X = 4;
        const FLIP_Y = 8;
        const RESIZE_X = 16;
        const RESIZE_Y = 32;
    }
}

/// Everything set on a positioner so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionerRules {
    pub size: Option<(i32, i32)>,
    pub anchor_rect: Option<Rect>,
    pub anchor: Anchor,
    pub gravity: Gravity,
    pub constraint_adjustment: ConstraintAdjustment,
    pub offset: (i32, i32),
    pub reactive: bool,
    pub parent_size: Option<(i32, i32)>,
    pub parent_configure: Option<u32>,
}

#[derive(Default)]
struct PositionerInner {
    rules: PositionerRules,
    consumed: bool,
}

pub(crate) struct PositionerData {
    pub(crate) version: u32,
    state: Mutex<PositionerInner>,
}

impl PositionerData {
    pub(crate) fn new(version: u32) -> Self {
        Self {
            version,
            state: Mutex::default(),
        }
    }

    /// Hands the rules to a popup. A positioner can be used only once, and only once
    /// it has a size and an anchor rectangle.
    pub(crate) fn consume(&self, id: ObjectId) -> Result<PositionerRules> {
        let mut state = self.state.lock();
        if state.consumed {
            return Err(ValidationError::PositionerConsumed(id).into());
        }
        if state.rules.size.is_none() || state.rules.anchor_rect.is_none() {
            return Err(ValidationError::IncompletePositioner(id).into());
        }
        state.consumed = true;
        Ok(state.rules.clone())
    }

    fn update(&self, id: ObjectId, apply: impl FnOnce(&mut PositionerRules)) -> Result<()> {
        let mut state = self.state.lock();
        if state.consumed {
            return Err(ValidationError::PositionerConsumed(id).into());
        }
        apply(&mut state.rules);
        Ok(())
    }

    fn ensure_unconsumed(&self, id: ObjectId) -> Result<()> {
        self.update(id, |_| ())
    }
}

impl Dispatch for PositionerData {
    fn dispatch(&self, _conn: &Connection, _id: ObjectId, message: Message) -> Result<()> {
        no_events(Self::INTERFACE, &message)
    }
}

handle! {
    /// Accumulates placement rules, then is consumed by
    /// [`ShellSurface::get_popup`](super::ShellSurface::get_popup) or
    /// [`Popup::reposition`](super::Popup::reposition).
    ///
    /// A consumed positioner rejects further setters with
    /// [`ValidationError::PositionerConsumed`]; it can still be destroyed.
    Positioner => PositionerData
}

impl Positioner {
    fn send(&self, request: PositionerRequest, args: Encoder) -> Result<()> {
        self.data()?.ensure_unconsumed(self.id)?;
        self.conn.send_request(self.id, request, args)
    }

    /// Size of the popup's window geometry. Both dimensions must be positive.
    pub fn set_size(&self, width: i32, height: i32) -> Result<()> {
        require_positive(width, height)?;
        let mut args = Encoder::new();
        args.int(width).int(height);
        self.send(PositionerRequest::SetSize, args)?;
        self.data()?
            .update(self.id, |rules| rules.size = Some((width, height)))
    }

    /// Rectangle on the parent's window geometry the popup is placed against.
    pub fn set_anchor_rect(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        require_non_negative(width, height)?;
        let mut args = Encoder::new();
        args.int(x).int(y).int(width).int(height);
        self.send(PositionerRequest::SetAnchorRect, args)?;
        self.data()?.update(self.id, |rules| {
            rules.anchor_rect = Some(Rect::new(x, y, width, height));
        })
    }

    /// Edge or corner of the anchor rectangle the popup is attached to.
    pub fn set_anchor(&self, anchor: Anchor) -> Result<()> {
        let mut args = Encoder::new();
        args.uint(anchor.into());
        self.send(PositionerRequest::SetAnchor, args)?;
        self.data()?.update(self.id, |rules| rules.anchor = anchor)
    }

    /// Direction the popup extends from the anchor point.
    ///
    /// # Protocol XML
    /// ```xml
    /// <request name="set_gravity">
    ///   <description summary="set child surface gravity">
    ///     Defines in what direction a surface should be positioned, relative to
    ///     the anchor point of the parent surface.
    ///   </description>
    ///   <arg name="gravity" type="uint" enum="gravity" summary="gravity direction"/>
    /// </request>
    /// ```
    pub fn set_gravity(&self, gravity: Gravity) -> Result<()> {
        let mut args = Encoder::new();
        args.uint(gravity.into());
        self.send(PositionerRequest::SetGravity, args)?;
        self.data()?.update(self.id, |rules| rules.gravity = gravity)
    }

    /// How the compositor may move or resize the popup when it would not fit.
    pub fn set_constraint_adjustment(&self, adjustment: ConstraintAdjustment) -> Result<()> {
        let mut args = Encoder::new();
        args.uint(adjustment.bits());
        self.send(PositionerRequest::SetConstraintAdjustment, args)?;
        self.data()?
            .update(self.id, |rules| rules.constraint_adjustment = adjustment)
    }

    /// Offset of the popup from the position given by anchor and gravity.
    pub fn set_offset(&self, x: i32, y: i32) -> Result<()> {
        let mut args = Encoder::new();
        args.int(x).int(y);
        self.send(PositionerRequest::SetOffset, args)?;
        self.data()?.update(self.id, |rules| rules.offset = (x, y))
    }

    /// Asks the compositor to reposition the popup when the parent moves or resizes.
    pub fn set_reactive(&self) -> Result<()> {
        require_version(self.data()?.version, 3, PositionerRequest::SetReactive)?;
        self.send(PositionerRequest::SetReactive, Encoder::new())?;
        self.data()?.update(self.id, |rules| rules.reactive = true)
    }

    /// Parent size the rules are computed against, for a parent in the middle of a resize.
    pub fn set_parent_size(&self, width: i32, height: i32) -> Result<()> {
        require_version(self.data()?.version, 3, PositionerRequest::SetParentSize)?;
        require_non_negative(width, height)?;
        let mut args = Encoder::new();
        args.int(width).int(height);
        self.send(PositionerRequest::SetParentSize, args)?;
        self.data()?
            .update(self.id, |rules| rules.parent_size = Some((width, height)))
    }

    /// Serial of the parent configure the rules were computed for.
    pub fn set_parent_configure(&self, serial: u32) -> Result<()> {
        require_version(self.data()?.version, 3, PositionerRequest::SetParentConfigure)?;
        let mut args = Encoder::new();
        args.uint(serial);
        self.send(PositionerRequest::SetParentConfigure, args)?;
        self.data()?
            .update(self.id, |rules| rules.parent_configure = Some(serial))
    }

    pub fn rules(&self) -> Result<PositionerRules> {
        Ok(self.data()?.state.lock().rules.clone())
    }

    pub fn is_consumed(&self) -> Result<bool> {
        Ok(self.data()?.state.lock().consumed)
    }

    /// Destroys the positioner. Popups already created from it are unaffected.
    pub fn destroy(self) -> Result<()> {
        self.data()?;
        self.conn
            .send_request(self.id, PositionerRequest::Destroy, Encoder::new())?;
        self.conn.retire(self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_exactly_once() {
        let data = PositionerData::new(3);
        data.update(4, |rules| {
            rules.size = Some((100, 50));
            rules.anchor_rect = Some(Rect::new(0, 0, 10, 10));
            rules.anchor = Anchor::BottomLeft;
        })
        .unwrap();

        let rules = data.consume(4).unwrap();
        assert_eq!(rules.anchor, Anchor::BottomLeft);
        assert_eq!(
            data.consume(4).unwrap_err().as_validation(),
            Some(&ValidationError::PositionerConsumed(4))
        );
        assert!(data.update(4, |rules| rules.offset = (1, 1)).is_err());
    }

    #[test]
    fn incomplete_rules_are_not_consumed() {
        let data = PositionerData::new(1);
        data.update(2, |rules| rules.size = Some((1, 1))).unwrap();
        assert_eq!(
            data.consume(2).unwrap_err().as_validation(),
            Some(&ValidationError::IncompletePositioner(2))
        );
        data.update(2, |rules| rules.anchor_rect = Some(Rect::default()))
            .unwrap();
        assert!(data.consume(2).is_ok());
    }

    #[test]
    fn constraint_bits_match_the_wire() {
        let flags = ConstraintAdjustment::FLIP_X | ConstraintAdjustment::SLIDE_Y;
        assert_eq!(flags.bits(), 6);
        assert_eq!(Gravity::try_from(8), Ok(Gravity::BottomRight));
        assert_eq!(Anchor::default(), Anchor::None);
    }
}
