use std::fmt::{self, Display, Formatter};

use crate::error::Error;
use crate::protocol::wire::Decoder;

/// A global object advertisement from the registry.
///
/// # Protocol XML
/// ```xml
/// <event name="global">
///   <description summary="announce global object">
///     Notify the client of global objects.
///     The event notifies the client that a global object with
///     the given name is now available, and it implements the
///     given version of the given interface.
///   </description>
///   <arg name="name" type="uint" summary="numeric name of the global object"/>
///   <arg name="interface" type="string" summary="interface implemented by the object"/>
///   <arg name="version" type="uint" summary="interface version"/>
/// </event>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    /// Numeric name passed back to `bind`.
    pub name: u32,
    /// Interface implemented by the global, e.g. `wl_compositor`.
    pub interface: String,
    /// Highest version the compositor implements.
    pub version: u32,
}

impl Global {
    pub(crate) fn decode(args: &mut Decoder<'_>) -> Result<Self, Error> {
        Ok(Self {
            name: args.uint()?,
            interface: args.string()?,
            version: args.uint()?,
        })
    }
}

impl Display for Global {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} (name {})", self.interface, self.version, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::Encoder;

    #[test]
    fn decodes_name_interface_version() {
        let mut args = Encoder::new();
        args.uint(3).string("xdg_wm_base").unwrap().uint(6);
        let (bytes, _) = args.into_parts();

        let global = Global::decode(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(global.name, 3);
        assert_eq!(global.interface, "xdg_wm_base");
        assert_eq!(global.version, 6);
        assert_eq!(global.to_string(), "xdg_wm_base v6 (name 3)");
    }
}
