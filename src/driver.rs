//! Single-owner message loop around a [`LiveSession`].
//!
//! The session model is strictly single-writer: updates, connection
//! signals and event dispatches are applied in arrival order with no
//! interleaving. When transport I/O lives on other tasks, this driver is
//! the one place that touches the session — handles enqueue, the driver
//! drains.

use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::{CapturedEvent, EventBinding};
use crate::session::LiveSession;

/// Inbound work for a driven session.
#[derive(Debug, Clone)]
pub enum SessionMsg {
    /// A full tree snapshot replacing the current tree.
    Update(JsonValue),
    ConnectionOpened,
    ConnectionLost,
    /// A captured DOM event to dispatch through its binding.
    Event {
        binding: EventBinding,
        event: CapturedEvent,
    },
}

/// Cloneable sender feeding a driven session. Sends never block; messages
/// queue until the driver drains them.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionMsg>,
}

impl SessionHandle {
    /// Returns false when the driver is gone.
    pub fn update(&self, snapshot: JsonValue) -> bool {
        self.send(SessionMsg::Update(snapshot))
    }

    pub fn connection_opened(&self) -> bool {
        self.send(SessionMsg::ConnectionOpened)
    }

    pub fn connection_lost(&self) -> bool {
        self.send(SessionMsg::ConnectionLost)
    }

    pub fn event(&self, binding: EventBinding, event: CapturedEvent) -> bool {
        self.send(SessionMsg::Event { binding, event })
    }

    fn send(&self, msg: SessionMsg) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Creates the handle/receiver pair for [`drive`].
pub fn channel() -> (SessionHandle, mpsc::UnboundedReceiver<SessionMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionHandle { tx }, rx)
}

/// Owns `session` until every handle is dropped, applying messages
/// strictly in arrival order, then returns it.
///
/// The session is `!Send`, so the driver future must run where the session
/// was created (a current-thread runtime or a `LocalSet`).
pub async fn drive(
    mut session: LiveSession,
    mut rx: mpsc::UnboundedReceiver<SessionMsg>,
) -> LiveSession {
    while let Some(msg) = rx.recv().await {
        match msg {
            SessionMsg::Update(snapshot) => session.handle_update(&snapshot),
            SessionMsg::ConnectionOpened => session.connection_opened(),
            SessionMsg::ConnectionLost => session.connection_lost(),
            SessionMsg::Event { binding, event } => session.dispatch(&binding, &event),
        }
    }
    debug!(target: "flyweb::session", "session driver stopped");
    session
}
