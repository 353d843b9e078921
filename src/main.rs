use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use wlwire::{Compositor, Connection, ToplevelEvent, WmBase};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let title = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wlwire".to_owned());

    let conn = Connection::connect_to_env().context("failed to connect to the compositor")?;
    let registry = conn.display().get_registry()?;
    conn.roundtrip()?;

    for global in registry.globals()? {
        log::debug!("{global}");
    }

    let compositor: Compositor = registry
        .bind_first()
        .context("compositor does not offer wl_compositor")?;
    let wm_base: WmBase = registry
        .bind_first()
        .context("compositor does not offer xdg_wm_base")?;

    let surface = compositor.create_surface()?;
    let shell_surface = wm_base.get_shell_surface(&surface)?;
    let toplevel = shell_surface.get_toplevel()?;
    toplevel.set_title(&title)?;
    toplevel.set_app_id("wlwire-demo")?;
    log::info!("native surface handle {:#x}", surface.native_handle().as_raw());

    let running = Arc::new(AtomicBool::new(true));
    let acked = Arc::new(AtomicBool::new(false));

    let closing = Arc::clone(&running);
    toplevel.set_handler(move |_, event| match event {
        ToplevelEvent::Configure(configure) => log::info!(
            "configure {}x{} {:?}",
            configure.width,
            configure.height,
            configure.flags
        ),
        ToplevelEvent::Close => closing.store(false, Ordering::Release),
        other => log::debug!("{other:?}"),
    })?;

    let pending = Arc::clone(&acked);
    shell_surface.set_handler(move |shell_surface, serial| {
        match shell_surface.ack_configure(serial) {
            Ok(()) => pending.store(true, Ordering::Release),
            Err(err) => log::error!("ack_configure({serial}) failed: {err}"),
        }
    })?;

    // The initial commit asks the compositor for the first configure.
    surface.commit()?;

    while running.load(Ordering::Acquire) {
        conn.blocking_dispatch()?;

        if acked.swap(false, Ordering::AcqRel) {
            let frame = surface.frame()?;
            frame.on_done(|time| log::debug!("frame done at {time}ms"));
            surface.commit()?;
            log::info!("committed configure {:?}", shell_surface.last_acked_serial()?);
        }
    }

    log::info!("close requested, tearing down");
    toplevel.destroy()?;
    shell_surface.destroy()?;
    surface.destroy()?;
    wm_base.destroy()?;
    conn.roundtrip()?;
    conn.close();

    Ok(())
}
