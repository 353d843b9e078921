//! A scripted compositor on the far end of a socket pair.

#![allow(dead_code)]

use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use wlwire::protocol::Opcode;
use wlwire::protocol::display::event::DisplayEvent;
use wlwire::protocol::display::request::DisplayRequest;
use wlwire::protocol::message::{Message, MessageBuffer};
use wlwire::protocol::registry::RegistryRequest;
use wlwire::protocol::registry::event::RegistryEventCode;
use wlwire::protocol::wire::Encoder;
use wlwire::{Compositor, Connection, ObjectId, Registry, WmBase};

pub const COMPOSITOR_NAME: u32 = 1;
pub const WM_BASE_NAME: u32 = 2;

pub struct FakeCompositor {
    stream: UnixStream,
    buffer: MessageBuffer,
}

impl FakeCompositor {
    pub fn pair() -> (Connection, FakeCompositor) {
        let (client, server) = UnixStream::pair().unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        (
            Connection::from_stream(client),
            FakeCompositor {
                stream: server,
                buffer: MessageBuffer::new(),
            },
        )
    }

    pub fn send(&mut self, object_id: ObjectId, opcode: impl Opcode, args: Encoder) {
        self.send_raw(object_id, opcode.code(), args);
    }

    pub fn send_raw(&mut self, object_id: ObjectId, opcode: u16, args: Encoder) {
        let message = Message::new(object_id, opcode, args).unwrap();
        self.stream.write_all(&message.to_bytes()).unwrap();
    }

    pub fn send_bytes(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
    }

    /// Next request from the client, blocking up to the read timeout.
    pub fn recv(&mut self) -> Message {
        loop {
            if let Some(message) = self.buffer.next_message().unwrap() {
                return message;
            }
            let mut chunk = [0u8; 4096];
            let n = self.stream.read(&mut chunk).unwrap();
            assert!(n > 0, "client hung up");
            self.buffer.push(&chunk[..n], []);
        }
    }

    /// Next request, which must be `opcode` on `object_id`.
    pub fn expect<O: Opcode>(&mut self, object_id: ObjectId, opcode: O) -> Message {
        let message = self.recv();
        assert_eq!(
            (message.object_id(), message.opcode()),
            (object_id, opcode.code()),
            "expected {}@{object_id} {opcode:?}",
            O::INTERFACE
        );
        message
    }

    /// Asserts the client has sent nothing further.
    pub fn assert_idle(&mut self) {
        assert!(self.buffer.next_message().unwrap().is_none());
        self.stream.set_nonblocking(true).unwrap();
        let mut chunk = [0u8; 64];
        let result = self.stream.read(&mut chunk);
        self.stream.set_nonblocking(false).unwrap();
        match result {
            Err(err) => assert_eq!(err.kind(), ErrorKind::WouldBlock),
            Ok(n) => panic!("client sent {n} unexpected bytes"),
        }
    }

    pub fn global(&mut self, registry: ObjectId, name: u32, interface: &str, version: u32) {
        let mut args = Encoder::new();
        args.uint(name).string(interface).unwrap().uint(version);
        self.send(registry, RegistryEventCode::Global, args);
    }

    /// Fires a callback the way a compositor does: `done`, then `delete_id`, in one write
    /// so both are read together.
    pub fn done(&mut self, callback: ObjectId, data: u32) {
        let mut args = Encoder::new();
        args.uint(data);
        let mut bytes = Message::new(callback, 0, args).unwrap().to_bytes();
        let mut args = Encoder::new();
        args.uint(callback);
        bytes.extend(
            Message::new(1, DisplayEvent::DeleteId.code(), args)
                .unwrap()
                .to_bytes(),
        );
        self.send_bytes(&bytes);
    }

    pub fn delete_id(&mut self, id: ObjectId) {
        let mut args = Encoder::new();
        args.uint(id);
        self.send(1, DisplayEvent::DeleteId, args);
    }
}

/// Connects, announces a compositor and an xdg_wm_base, and waits for the registry burst.
pub fn bootstrap() -> (Connection, FakeCompositor, Registry) {
    let (conn, mut server) = FakeCompositor::pair();
    let registry = conn.display().get_registry().unwrap();
    let sync = conn.display().sync().unwrap();

    let request = server.expect(1, DisplayRequest::GetRegistry);
    assert_eq!(request.args().new_id().unwrap(), registry.id());
    let request = server.expect(1, DisplayRequest::Sync);
    assert_eq!(request.args().new_id().unwrap(), sync.id());

    server.global(registry.id(), COMPOSITOR_NAME, "wl_compositor", 6);
    server.global(registry.id(), WM_BASE_NAME, "xdg_wm_base", 6);
    server.global(registry.id(), 3, "wl_shm", 1);
    server.done(sync.id(), 1);
    sync.wait().unwrap();

    (conn, server, registry)
}

/// Binds the compositor and wm_base, consuming the bind requests.
pub fn bind_shell(server: &mut FakeCompositor, registry: &Registry) -> (Compositor, WmBase) {
    let compositor: Compositor = registry.bind_first().unwrap();
    let request = server.expect(registry.id(), RegistryRequest::Bind);
    let mut args = request.args();
    assert_eq!(args.uint().unwrap(), COMPOSITOR_NAME);
    assert_eq!(args.string().unwrap(), "wl_compositor");
    assert_eq!(args.uint().unwrap(), 6);
    assert_eq!(args.new_id().unwrap(), compositor.id());

    let wm_base: WmBase = registry.bind_first().unwrap();
    let request = server.expect(registry.id(), RegistryRequest::Bind);
    let mut args = request.args();
    assert_eq!(args.uint().unwrap(), WM_BASE_NAME);
    assert_eq!(args.string().unwrap(), "xdg_wm_base");
    args.uint().unwrap();
    assert_eq!(args.new_id().unwrap(), wm_base.id());

    (compositor, wm_base)
}

/// Dispatches until `done` holds, failing after a bounded number of reads.
pub fn dispatch_until(conn: &Connection, mut done: impl FnMut() -> bool) {
    for _ in 0..16 {
        if done() {
            return;
        }
        conn.blocking_dispatch().unwrap();
    }
    assert!(done(), "condition not reached");
}
