//! `wl_callback`: a one-shot completion fired by the compositor.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::object::{Dispatch, decode_event};
use crate::protocol::message::Message;
use crate::protocol::{ObjectId, Opcode};
use crate::transport::Connection;
use crate::wl_opcode;

wl_opcode! {
    CallbackEvent("wl_callback") {
        /// Carries the callback data, typically a millisecond timestamp.
        Done = 0,
    }
}

type DoneHandler = dyn FnOnce(u32) + Send;

#[derive(Default)]
struct CompletionState {
    data: Option<u32>,
    handler: Option<Box<DoneHandler>>,
}

/// Shared between the arena entry and the caller's [`Callback`], so the result stays
/// readable after the object is retired.
#[derive(Default)]
pub(crate) struct Completion {
    state: Mutex<CompletionState>,
}

impl Completion {
    /// Records the result. Only the first call has any effect.
    fn resolve(&self, data: u32) -> bool {
        let handler = {
            let mut state = self.state.lock();
            if state.data.is_some() {
                return false;
            }
            state.data = Some(data);
            state.handler.take()
        };

        if let Some(handler) = handler {
            run_done(handler, data);
        }
        true
    }

    fn data(&self) -> Option<u32> {
        self.state.lock().data
    }

    fn on_done(&self, handler: Box<DoneHandler>) {
        let data = {
            let mut state = self.state.lock();
            match state.data {
                Some(data) => data,
                None => {
                    state.handler = Some(handler);
                    return;
                }
            }
        };
        run_done(handler, data);
    }
}

fn run_done(handler: Box<DoneHandler>, data: u32) {
    if panic::catch_unwind(AssertUnwindSafe(|| handler(data))).is_err() {
        log::error!("wl_callback done handler panicked");
    }
}

pub(crate) struct CallbackData {
    pub(crate) version: u32,
    completion: Arc<Completion>,
}

impl CallbackData {
    pub(crate) fn new(version: u32) -> Self {
        Self {
            version,
            completion: Arc::default(),
        }
    }

    pub(crate) fn completion(&self) -> Arc<Completion> {
        Arc::clone(&self.completion)
    }
}

impl Dispatch for CallbackData {
    fn dispatch(&self, conn: &Connection, id: ObjectId, message: Message) -> Result<()> {
        match CallbackEvent::try_from(message.opcode())? {
            CallbackEvent::Done => {
                let data = decode_event(CallbackEvent::INTERFACE, &message, |args| args.uint())?;
                // The compositor destroys the callback itself; delete_id follows.
                conn.retire(id);
                if !self.completion.resolve(data) {
                    log::debug!("wl_callback@{id} already resolved");
                }
                Ok(())
            }
        }
    }
}

/// A pending `wl_callback`, from [`Surface::frame`](crate::protocol::surface::Surface::frame)
/// or [`Display::sync`](crate::protocol::display::Display::sync).
///
/// Resolves exactly once. If the connection closes first it never resolves.
pub struct Callback {
    id: ObjectId,
    conn: Connection,
    completion: Arc<Completion>,
}

impl Callback {
    pub(crate) fn with_completion(
        conn: Connection,
        id: ObjectId,
        completion: Arc<Completion>,
    ) -> Self {
        Self {
            id,
            conn,
            completion,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn is_done(&self) -> bool {
        self.completion.data().is_some()
    }

    /// The `done` payload: a timestamp in milliseconds for frame callbacks, the event
    /// serial for `sync`.
    pub fn timestamp(&self) -> Option<u32> {
        self.completion.data()
    }

    /// Registers a handler run once with the `done` payload. If the callback has already
    /// fired it runs immediately on the calling thread.
    pub fn on_done(&self, handler: impl FnOnce(u32) + Send + 'static) {
        self.completion.on_done(Box::new(handler));
    }

    /// Dispatches events until this callback fires. There is no timeout.
    pub fn wait(&self) -> Result<u32> {
        loop {
            if let Some(data) = self.completion.data() {
                return Ok(data);
            }
            self.conn.blocking_dispatch()?;
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("id", &self.id)
            .field("data", &self.completion.data())
            .finish()
    }
}
