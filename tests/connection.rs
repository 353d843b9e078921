mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use common::{COMPOSITOR_NAME, FakeCompositor, WM_BASE_NAME, bootstrap, dispatch_until};
use wlwire::protocol::display::event::DisplayEvent;
use wlwire::protocol::display::request::DisplayRequest;
use wlwire::protocol::registry::RegistryRequest;
use wlwire::protocol::registry::event::RegistryEventCode;
use wlwire::protocol::wire::Encoder;
use wlwire::{
    Compositor, Connection, Error, ProtocolError, Registry, RegistryEvent, ValidationError,
    WmBase,
};

/// Announces a throwaway global and dispatches until it shows up, so everything the
/// compositor sent before it has been handled.
fn settle(conn: &Connection, server: &mut FakeCompositor, registry: &Registry, name: u32) {
    server.global(registry.id(), name, "marker", 1);
    dispatch_until(conn, || {
        registry
            .globals()
            .unwrap()
            .iter()
            .any(|global| global.name == name)
    });
}

#[test]
fn bootstrap_records_every_global() {
    let (_conn, _server, registry) = bootstrap();
    let globals = registry.globals().unwrap();
    let interfaces: Vec<_> = globals.iter().map(|g| g.interface.as_str()).collect();
    assert_eq!(interfaces, ["wl_compositor", "xdg_wm_base", "wl_shm"]);
    assert_eq!(registry.find("wl_shm").unwrap().map(|g| g.name), Some(3));
    assert_eq!(registry.find("wl_seat").unwrap(), None);
}

#[test]
fn roundtrip_waits_for_the_sync_callback() {
    let (conn, mut server) = FakeCompositor::pair();
    let compositor = thread::spawn(move || {
        let request = server.expect(1, DisplayRequest::Sync);
        let callback = request.args().new_id().unwrap();
        server.done(callback, 0);
        server
    });

    conn.roundtrip().unwrap();
    compositor.join().unwrap();
    assert!(!conn.is_closed());
}

#[test]
fn callback_fires_exactly_once() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);

    let callback = conn.display().sync().unwrap();
    server.expect(1, DisplayRequest::Sync);
    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&fired);
    callback.on_done(move |data| {
        assert_eq!(data, 5);
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let mut args = Encoder::new();
    args.uint(5);
    server.send_raw(callback.id(), 0, args);
    let mut args = Encoder::new();
    args.uint(6);
    server.send_raw(callback.id(), 0, args);
    settle(&conn, &mut server, &registry, 101);

    assert!(callback.is_done());
    assert_eq!(callback.timestamp(), Some(5));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!conn.is_closed());

    // A handler added afterwards runs immediately with the recorded value.
    let late = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&late);
    callback.on_done(move |data| {
        seen.store(data as usize, Ordering::SeqCst);
    });
    assert_eq!(late.load(Ordering::SeqCst), 5);
}

#[test]
fn ids_are_reused_only_after_delete_id() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);

    let first = conn.display().sync().unwrap();
    server.expect(1, DisplayRequest::Sync);
    let mut args = Encoder::new();
    args.uint(1);
    server.send_raw(first.id(), 0, args);
    settle(&conn, &mut server, &registry, 101);
    assert!(first.is_done());

    // Retired but not yet released by the compositor.
    let second = conn.display().sync().unwrap();
    server.expect(1, DisplayRequest::Sync);
    assert_ne!(second.id(), first.id());

    server.delete_id(first.id());
    settle(&conn, &mut server, &registry, 102);
    let third = conn.display().sync().unwrap();
    let request = server.expect(1, DisplayRequest::Sync);
    assert_eq!(third.id(), first.id());
    assert_eq!(request.args().new_id().unwrap(), first.id());
}

#[test]
fn events_for_unknown_objects_are_dropped() {
    let (conn, mut server, registry) = bootstrap();

    let mut args = Encoder::new();
    args.uint(1);
    server.send_raw(77, 0, args);
    server.send_raw(0xFF00_0005, 3, Encoder::new());
    settle(&conn, &mut server, &registry, 100);

    assert!(!conn.is_closed());
    assert_eq!(conn.dispatch_pending().unwrap(), 0);
}

#[test]
fn global_remove_forgets_the_global() {
    let (conn, mut server, registry) = bootstrap();

    let removed = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&removed);
    registry
        .set_handler(move |_, event| {
            if let RegistryEvent::GlobalRemove { name, global } = event {
                *seen.lock().unwrap() = Some((name, global.map(|g| g.interface)));
            }
        })
        .unwrap();

    let mut args = Encoder::new();
    args.uint(3);
    server.send(registry.id(), RegistryEventCode::GlobalRemove, args);
    dispatch_until(&conn, || removed.lock().unwrap().is_some());

    assert_eq!(
        *removed.lock().unwrap(),
        Some((3, Some("wl_shm".to_string())))
    );
    assert_eq!(registry.find("wl_shm").unwrap(), None);
}

#[test]
fn bind_clamps_to_the_advertised_version() {
    let (_conn, mut server, registry) = bootstrap();

    let compositor: Compositor = registry.bind(COMPOSITOR_NAME, 99).unwrap();
    let request = server.expect(registry.id(), RegistryRequest::Bind);
    let mut args = request.args();
    assert_eq!(args.uint().unwrap(), COMPOSITOR_NAME);
    assert_eq!(args.string().unwrap(), "wl_compositor");
    assert_eq!(args.uint().unwrap(), 6);
    assert_eq!(args.new_id().unwrap(), compositor.id());
    assert_eq!(compositor.version().unwrap(), 6);
}

#[test]
fn bind_first_needs_an_announced_global() {
    let (conn, mut server) = FakeCompositor::pair();
    let registry = conn.display().get_registry().unwrap();
    server.expect(1, DisplayRequest::GetRegistry);

    assert_eq!(
        registry
            .bind_first::<Compositor>()
            .unwrap_err()
            .as_validation(),
        Some(&ValidationError::GlobalNotFound("wl_compositor"))
    );
    server.assert_idle();
}

#[test]
fn bind_checks_the_name_and_interface_of_the_global() {
    let (_conn, mut server, registry) = bootstrap();

    let err = registry.bind::<WmBase>(COMPOSITOR_NAME, 6).unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::GlobalInterfaceMismatch {
            name: COMPOSITOR_NAME,
            expected: "xdg_wm_base",
            actual: "wl_compositor".to_string(),
        })
    );
    assert_eq!(
        registry
            .bind::<Compositor>(9999, 6)
            .unwrap_err()
            .as_validation(),
        Some(&ValidationError::UnknownGlobal(9999))
    );
    server.assert_idle();

    let wm_base: WmBase = registry.bind(WM_BASE_NAME, 6).unwrap();
    let request = server.expect(registry.id(), RegistryRequest::Bind);
    let mut args = request.args();
    assert_eq!(args.uint().unwrap(), WM_BASE_NAME);
    assert_eq!(args.string().unwrap(), "xdg_wm_base");
    args.uint().unwrap();
    assert_eq!(args.new_id().unwrap(), wm_base.id());
}

#[test]
fn compositor_error_closes_the_connection() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);
    let compositor: Compositor = registry.bind_first().unwrap();
    server.expect(registry.id(), RegistryRequest::Bind);
    let surface = compositor.create_surface().unwrap();
    server.recv();

    let mut args = Encoder::new();
    args.object(Some(surface.id()))
        .uint(2)
        .string("invalid scale")
        .unwrap();
    server.send(1, DisplayEvent::Error, args);

    match conn.blocking_dispatch() {
        Err(Error::Server {
            object_id,
            interface,
            code,
            message,
        }) => {
            assert_eq!(object_id, surface.id());
            assert_eq!(interface, "wl_surface");
            assert_eq!(code, 2);
            assert_eq!(message, "invalid scale");
        }
        other => panic!("expected a compositor error, got {other:?}"),
    }

    assert!(conn.is_closed());
    assert!(matches!(conn.dispatch_pending(), Err(Error::ConnectionClosed)));
    assert!(matches!(surface.commit(), Err(Error::ConnectionClosed)));
}

#[test]
fn truncated_event_is_fatal() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);

    let mut args = Encoder::new();
    args.uint(9);
    server.send(registry.id(), RegistryEventCode::Global, args);

    let err = conn.blocking_dispatch().unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::MalformedEvent {
            interface: "wl_registry",
            opcode: 0,
            ..
        })
    ));
    assert!(err.is_fatal());
    assert!(conn.is_closed());
}

#[test]
fn unknown_opcode_is_fatal() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);

    server.send_raw(registry.id(), 9, Encoder::new());
    assert!(matches!(
        conn.blocking_dispatch(),
        Err(Error::Protocol(ProtocolError::UnknownOpcode {
            interface: "wl_registry",
            opcode: 9
        }))
    ));
    assert!(conn.is_closed());
}

#[test]
fn partial_frames_wait_for_the_rest() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);

    let mut args = Encoder::new();
    args.uint(40).string("wl_output").unwrap().uint(4);
    let message =
        wlwire::protocol::message::Message::new(registry.id(), 0, args).unwrap();
    let bytes = message.to_bytes();
    let (head, tail) = bytes.split_at(10);

    server.send_bytes(head);
    // Give the bytes time to land; a partial frame dispatches nothing.
    thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(conn.dispatch_pending().unwrap(), 0);
    assert!(!conn.is_closed());

    server.send_bytes(tail);
    assert_eq!(conn.blocking_dispatch().unwrap(), 1);
    assert_eq!(registry.find("wl_output").unwrap().map(|g| g.version), Some(4));
}

#[test]
fn handler_panic_does_not_take_down_dispatch() {
    let (conn, mut server, registry) = bootstrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    registry
        .set_handler(move |_, _| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("handler failure");
            }
        })
        .unwrap();

    server.global(registry.id(), 50, "wl_seat", 9);
    server.global(registry.id(), 51, "wl_output", 4);
    dispatch_until(&conn, || calls.load(Ordering::SeqCst) == 2);

    assert!(!conn.is_closed());
    assert!(registry.find("wl_seat").unwrap().is_some());
    assert!(registry.find("wl_output").unwrap().is_some());
}

#[test]
fn dispatch_from_a_handler_is_rejected() {
    let (conn, mut server, registry) = bootstrap();

    let rejected = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&rejected);
    registry
        .set_handler(move |registry, _| {
            let result = registry.connection().dispatch_pending();
            seen.store(
                matches!(
                    result,
                    Err(Error::Validation(ValidationError::ReentrantDispatch))
                ),
                Ordering::SeqCst,
            );
        })
        .unwrap();

    server.global(registry.id(), 50, "wl_seat", 9);
    dispatch_until(&conn, || rejected.load(Ordering::SeqCst));
    assert!(!conn.is_closed());

    // Sending requests from a handler is fine.
    registry
        .set_handler(|registry, _| {
            registry.connection().display().sync().unwrap();
        })
        .unwrap();
    server.global(registry.id(), 51, "wl_output", 4);
    dispatch_until(&conn, || registry.find("wl_output").unwrap().is_some());
    server.expect(1, DisplayRequest::Sync);
}

#[test]
fn peer_hangup_is_reported_once_then_closed() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);
    drop(server);

    assert!(matches!(
        conn.blocking_dispatch(),
        Err(Error::ConnectionClosed)
    ));
    assert!(conn.is_closed());
    assert!(matches!(
        conn.display().sync(),
        Err(Error::ConnectionClosed)
    ));
}

#[test]
fn live_objects_lists_what_the_client_holds() {
    let (conn, mut server, registry) = bootstrap();
    settle(&conn, &mut server, &registry, 100);

    let live = conn.live_objects();
    assert!(live.contains(&(1, "wl_display")));
    assert!(live.contains(&(registry.id(), "wl_registry")));
    assert!(!live.iter().any(|(_, interface)| *interface == "wl_callback"));
}
