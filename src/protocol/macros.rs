/// Declares a protocol enumeration carried on the wire as a `uint`.
#[macro_export]
macro_rules! wl_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$variant => write!(f, "{}::{}", stringify!($name), stringify!($variant)),
                    )*
                }
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> u32 {
                value as u32
            }
        }

        impl TryFrom<u32> for $name {
            type Error = $crate::error::ProtocolError;

            fn try_from(value: u32) -> Result<Self, $crate::error::ProtocolError> {
                match value {
                    $(
                        $value => Ok($name::$variant),
                    )*
                    _ => Err($crate::error::ProtocolError::InvalidEnum {
                        name: stringify!($name),
                        value,
                    }),
                }
            }
        }
    };
}

/// Declares the request or event opcodes of one interface.
#[macro_export]
macro_rules! wl_opcode {
    (
        $(#[$meta:meta])*
        $name:ident($interface:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(u16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                $variant = $value,
            )*
        }

        impl $crate::protocol::Opcode for $name {
            const INTERFACE: &'static str = $interface;

            fn code(self) -> u16 {
                self as u16
            }
        }

        impl TryFrom<u16> for $name {
            type Error = $crate::error::ProtocolError;

            fn try_from(value: u16) -> Result<Self, $crate::error::ProtocolError> {
                match value {
                    $(
                        $value => Ok($name::$variant),
                    )*
                    _ => Err($crate::error::ProtocolError::UnknownOpcode {
                        interface: $interface,
                        opcode: value,
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::error::ProtocolError;
    use crate::protocol::Opcode;

    crate::wl_enum! {
        Fruit {
            Apple = 0,
            Pear = 3,
        }
    }

    crate::wl_opcode! {
        FruitRequest("fruit_basket") {
            Pick = 0,
            Drop = 1,
        }
    }

    crate::wl_opcode! {
        FruitEvent("fruit_basket") {
            Error = 0,
            Ripe = 1,
        }
    }

    #[test]
    fn enum_accepts_declared_values_only() {
        assert_eq!(Fruit::try_from(3), Ok(Fruit::Pear));
        assert_eq!(u32::from(Fruit::Apple), 0);
        assert_eq!(
            Fruit::try_from(1),
            Err(ProtocolError::InvalidEnum {
                name: "Fruit",
                value: 1
            })
        );
        assert_eq!(Fruit::Pear.to_string(), "Fruit::Pear");
    }

    #[test]
    fn opcode_names_its_interface() {
        assert_eq!(FruitRequest::Drop.code(), 1);
        assert_eq!(<FruitRequest as Opcode>::INTERFACE, "fruit_basket");
        assert_eq!(
            FruitRequest::try_from(9),
            Err(ProtocolError::UnknownOpcode {
                interface: "fruit_basket",
                opcode: 9
            })
        );
    }

    #[test]
    fn variant_named_error_does_not_shadow_the_error_type() {
        assert_eq!(FruitEvent::try_from(0), Ok(FruitEvent::Error));
        assert_eq!(FruitEvent::Ripe.code(), 1);
        assert!(matches!(
            FruitEvent::try_from(2),
            Err(ProtocolError::UnknownOpcode { opcode: 2, .. })
        ));
    }
}
