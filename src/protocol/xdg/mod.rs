//! The xdg-shell objects that turn a surface into a window.

pub mod popup;
pub mod positioner;
pub mod shell_surface;
pub mod toplevel;
pub mod wm_base;

pub use popup::{Popup, PopupEvent};
pub use positioner::{Anchor, ConstraintAdjustment, Gravity, Positioner, PositionerRules};
pub use shell_surface::{RoleKind, ShellSurface};
pub use toplevel::{
    ResizeEdge, Toplevel, ToplevelConfigure, ToplevelEvent, ToplevelFlags, WindowState,
    WmCapabilities,
};
pub use wm_base::WmBase;
