//! The connection: one socket, one writer lock, one reader, and the object arena.

pub(crate) mod socket;

use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use self::socket::{READ_CHUNK, Socket};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result, ValidationError};
use crate::object::map::ObjectMap;
use crate::object::{Dispatch, Object, ObjectData};
use crate::protocol::display::{Display, DisplayData};
use crate::protocol::message::{Message, MessageBuffer};
use crate::protocol::wire::Encoder;
use crate::protocol::{ObjectId, Opcode};

/// A client connection to a compositor.
///
/// Cloning is cheap and every clone talks over the same socket. Requests may be sent
/// from any thread; they are serialized behind one write lock and written immediately.
/// Events are read and dispatched by whichever thread calls one of the dispatch methods,
/// one at a time. Handlers run on that thread, in order, before the next event is
/// decoded; a handler that blocks stalls the whole connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

struct Inner {
    socket: Socket,
    write_lock: Mutex<()>,
    reader: Mutex<MessageBuffer>,
    dispatcher: Mutex<Option<ThreadId>>,
    objects: Mutex<ObjectMap>,
    closed: AtomicBool,
    debug: bool,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .field("objects", &self.inner.objects.lock().live().len())
            .finish()
    }
}

/// Clears the dispatching-thread marker when a dispatch pass ends.
struct DispatchGuard<'a> {
    dispatcher: &'a Mutex<Option<ThreadId>>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        *self.dispatcher.lock() = None;
    }
}

impl Connection {
    /// Connects to the socket described by `config`.
    pub fn connect(config: &ConnectionConfig) -> Result<Connection> {
        let path = config.socket_path()?;
        log::info!("connecting to {}", path.display());
        let stream = UnixStream::connect(&path)?;
        Ok(Self::with_stream(stream, config.debug))
    }

    /// Connects using `WAYLAND_DISPLAY` and `XDG_RUNTIME_DIR`.
    pub fn connect_to_env() -> Result<Connection> {
        Self::connect(&ConnectionConfig::from_env())
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: UnixStream) -> Connection {
        Self::with_stream(stream, false)
    }

    fn with_stream(stream: UnixStream, debug: bool) -> Connection {
        Connection {
            inner: Arc::new(Inner {
                socket: Socket::new(stream),
                write_lock: Mutex::new(()),
                reader: Mutex::new(MessageBuffer::new()),
                dispatcher: Mutex::new(None),
                objects: Mutex::new(ObjectMap::new(DisplayData::new().into_object())),
                closed: AtomicBool::new(false),
                debug,
            }),
        }
    }

    /// The root object, always id 1.
    pub fn display(&self) -> Display {
        Display::for_connection(self.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the socket. Every object id becomes stale and pending callbacks never fire.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            log::info!("closing connection");
            self.inner.socket.shutdown();
            self.inner.objects.lock().clear();
        }
    }

    /// Live objects as `(id, interface)`, sorted by id.
    pub fn live_objects(&self) -> Vec<(ObjectId, &'static str)> {
        self.inner.objects.lock().live()
    }

    /// Blocks until at least one event has been dispatched. Returns how many were.
    pub fn blocking_dispatch(&self) -> Result<usize> {
        self.dispatch(true)
    }

    /// Dispatches whatever can be read without blocking. Returns 0 if nothing was ready.
    pub fn dispatch_pending(&self) -> Result<usize> {
        self.dispatch(false)
    }

    /// Waits until the compositor has processed every request sent so far.
    pub fn roundtrip(&self) -> Result<usize> {
        let callback = self.display().sync()?;
        let mut dispatched = 0;
        while !callback.is_done() {
            dispatched += self.blocking_dispatch()?;
        }
        Ok(dispatched)
    }

    fn dispatch(&self, blocking: bool) -> Result<usize> {
        self.ensure_open()?;
        let current = thread::current().id();
        if *self.inner.dispatcher.lock() == Some(current) {
            return Err(ValidationError::ReentrantDispatch.into());
        }

        let mut reader = self.inner.reader.lock();
        *self.inner.dispatcher.lock() = Some(current);
        let _guard = DispatchGuard {
            dispatcher: &self.inner.dispatcher,
        };

        let mut dispatched = self.dispatch_buffered(&mut reader)?;
        if dispatched > 0 {
            return Ok(dispatched);
        }
        loop {
            if !self.receive(&mut reader, blocking)? {
                return Ok(0);
            }
            dispatched = self.dispatch_buffered(&mut reader)?;
            if dispatched > 0 || !blocking {
                return Ok(dispatched);
            }
        }
    }

    /// Reads one chunk into the frame buffer. Returns false if nothing was available.
    fn receive(&self, reader: &mut MessageBuffer, blocking: bool) -> Result<bool> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut fds = Vec::new();
        match self.inner.socket.recv(&mut chunk, &mut fds, blocking) {
            Ok(None) => Ok(false),
            Ok(Some(0)) => {
                log::info!("compositor closed the connection");
                Err(self.fail(Error::ConnectionClosed))
            }
            Ok(Some(n)) => {
                reader.push(&chunk[..n], fds);
                Ok(true)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn dispatch_buffered(&self, reader: &mut MessageBuffer) -> Result<usize> {
        let mut dispatched = 0;
        while let Some(message) = reader.next_message().map_err(|err| self.fail(err))? {
            self.dispatch_message(message)?;
            dispatched += 1;
            if self.is_closed() {
                break;
            }
        }
        Ok(dispatched)
    }

    fn dispatch_message(&self, message: Message) -> Result<()> {
        let id = message.object_id();
        let object = self.inner.objects.lock().get(id);
        let Some(object) = object else {
            log::debug!(
                "dropping opcode {} for unknown or destroyed object {id}",
                message.opcode()
            );
            return Ok(());
        };

        self.wire_log(format_args!(
            "<- {}@{id} opcode {} ({} bytes, {} fds)",
            object.interface(),
            message.opcode(),
            message.data().len(),
            message.fds().len()
        ));
        object
            .dispatch(self, id, message)
            .map_err(|err| if err.is_fatal() { self.fail(err) } else { err })
    }

    /// Marks the connection dead after a fatal error and hands the error back.
    pub(crate) fn fail(&self, err: Error) -> Error {
        if err.is_fatal() && !self.is_closed() {
            log::error!("connection failed: {err}");
            self.close();
        }
        err
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn wire_log(&self, args: std::fmt::Arguments<'_>) {
        if self.inner.debug {
            log::debug!("{args}");
        } else {
            log::trace!("{args}");
        }
    }

    /// Frames and writes one request.
    pub(crate) fn send_request<R: Opcode>(
        &self,
        id: ObjectId,
        request: R,
        args: Encoder,
    ) -> Result<()> {
        self.ensure_open()?;
        let message = Message::new(id, request.code(), args)?;
        self.wire_log(format_args!(
            "-> {}@{id} {request:?} ({} bytes, {} fds)",
            R::INTERFACE,
            message.data().len(),
            message.fds().len()
        ));

        let bytes = message.to_bytes();
        let _write = self.inner.write_lock.lock();
        self.inner
            .socket
            .send(&bytes, message.fds())
            .map_err(|err| self.fail(err.into()))
    }

    /// Allocates an id for a new object about to be created by a request.
    pub(crate) fn create_object(&self, object: Object) -> Result<ObjectId> {
        self.ensure_open()?;
        Ok(self.inner.objects.lock().insert(object)?)
    }

    /// Stops routing events to `id` after a destructor request.
    pub(crate) fn retire(&self, id: ObjectId) {
        self.inner.objects.lock().retire(id);
    }

    /// Frees `id` for reuse once the compositor confirmed the deletion.
    pub(crate) fn release_id(&self, id: ObjectId) {
        self.inner.objects.lock().release(id);
    }

    /// Looks up the live state behind `id`, checking its interface.
    pub(crate) fn data<T: ObjectData>(&self, id: ObjectId) -> Result<Arc<T>> {
        self.ensure_open()?;
        let object = self
            .inner
            .objects
            .lock()
            .get(id)
            .ok_or(ValidationError::UnknownObject(id))?;
        T::downcast(&object).ok_or_else(|| {
            ValidationError::WrongInterface {
                id,
                expected: T::INTERFACE,
                actual: object.interface(),
            }
            .into()
        })
    }

    /// Interface of a live or recently destroyed object, for error reports.
    pub(crate) fn interface_of(&self, id: ObjectId) -> &'static str {
        self.inner.objects.lock().interface(id).unwrap_or("unknown")
    }

    /// Bound version of a live object.
    pub(crate) fn version(&self, id: ObjectId) -> Result<u32> {
        self.ensure_open()?;
        self.inner
            .objects
            .lock()
            .get(id)
            .map(|object| object.version())
            .ok_or_else(|| ValidationError::UnknownObject(id).into())
    }
}

impl AsFd for Connection {
    /// The socket, for registering with an external poller before `dispatch_pending`.
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.socket.as_fd()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if !*self.closed.get_mut() {
            log::debug!("connection dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DISPLAY_ID;
    use std::io::Write;

    #[test]
    fn starts_with_only_the_display() {
        let (client, _server) = UnixStream::pair().unwrap();
        let conn = Connection::from_stream(client);
        assert_eq!(conn.live_objects(), vec![(DISPLAY_ID, "wl_display")]);
    }

    #[test]
    fn dispatch_pending_returns_zero_when_idle() {
        let (client, _server) = UnixStream::pair().unwrap();
        let conn = Connection::from_stream(client);
        assert_eq!(conn.dispatch_pending().unwrap(), 0);
    }

    #[test]
    fn events_for_unknown_objects_are_dropped() {
        let (client, mut server) = UnixStream::pair().unwrap();
        let conn = Connection::from_stream(client);
        let mut args = Encoder::new();
        args.uint(5);
        server
            .write_all(&Message::new(42, 0, args).unwrap().to_bytes())
            .unwrap();
        assert_eq!(conn.blocking_dispatch().unwrap(), 1);
        assert!(!conn.is_closed());
    }

    #[test]
    fn malformed_header_closes_the_connection() {
        let (client, mut server) = UnixStream::pair().unwrap();
        let conn = Connection::from_stream(client);
        server.write_all(&[1, 0, 0, 0, 0, 0, 2, 0]).unwrap();
        assert!(conn.blocking_dispatch().unwrap_err().is_fatal());
        assert!(conn.is_closed());
        assert!(matches!(
            conn.display().sync(),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn peer_hangup_is_connection_closed() {
        let (client, server) = UnixStream::pair().unwrap();
        let conn = Connection::from_stream(client);
        drop(server);
        assert!(matches!(conn.blocking_dispatch(), Err(Error::ConnectionClosed)));
        assert!(conn.is_closed());
    }
}
