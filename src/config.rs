use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Socket name used when `WAYLAND_DISPLAY` is not set.
pub const DEFAULT_DISPLAY: &str = "wayland-0";

/// Where to find the compositor, and how chatty to be about the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `XDG_RUNTIME_DIR`.
    pub runtime_dir: Option<PathBuf>,
    /// `WAYLAND_DISPLAY`: a socket name relative to the runtime dir, or an absolute path.
    pub display: Option<String>,
    /// `WAYLAND_DEBUG`: log every request and event at debug level instead of trace.
    pub debug: bool,
}

impl ConnectionConfig {
    pub fn from_env() -> Self {
        let debug = env::var("WAYLAND_DEBUG")
            .map(|value| matches!(value.as_str(), "1" | "client" | "all"))
            .unwrap_or(false);

        Self {
            runtime_dir: env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from),
            display: env::var("WAYLAND_DISPLAY").ok().filter(|name| !name.is_empty()),
            debug,
        }
    }

    /// Resolves the socket to connect to.
    ///
    /// # Errors
    /// Returns [`Error::NoDisplay`] when no display is configured and the fallback socket
    /// does not exist, or when a relative display name has no runtime dir to live in.
    pub fn socket_path(&self) -> Result<PathBuf> {
        if let Some(display) = &self.display {
            let display = Path::new(display);
            if display.is_absolute() {
                return Ok(display.to_path_buf());
            }
            let runtime_dir = self.runtime_dir.as_ref().ok_or_else(|| {
                Error::NoDisplay(format!(
                    "WAYLAND_DISPLAY={} is relative but XDG_RUNTIME_DIR is not set",
                    display.display()
                ))
            })?;
            return Ok(runtime_dir.join(display));
        }

        let fallback = self
            .runtime_dir
            .as_ref()
            .map(|dir| dir.join(DEFAULT_DISPLAY))
            .ok_or_else(|| {
                Error::NoDisplay("neither WAYLAND_DISPLAY nor XDG_RUNTIME_DIR is set".into())
            })?;

        if fallback.exists() {
            Ok(fallback)
        } else {
            Err(Error::NoDisplay(format!(
                "WAYLAND_DISPLAY is not set and {} does not exist",
                fallback.display()
            )))
        }
    }
}
