pub mod global;

pub use global::Global;

use crate::wl_opcode;

wl_opcode! {
    RegistryEventCode("wl_registry") {
        Global = 0,
        /// A global went away; binding it from now on is a no-op on the compositor side.
        GlobalRemove = 1,
    }
}

/// What a registry handler is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Global(Global),
    /// Carries the removed global if it had been announced.
    GlobalRemove { name: u32, global: Option<Global> },
}
