use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{Context as AnyhowContext, Result};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use crate::dom::{EventSink, Patcher, Shell};
use crate::error::TransportError;
use crate::eval::EvalCache;
use crate::events::{dispatch_keyed, CapturedEvent, EventBinding};
use crate::tree::{Materializer, VNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// One page's live-tree session.
///
/// Owns the Current Tree and the expression cache for the page's connection
/// lifetime; both are discarded on navigation/reload. The type is
/// deliberately `!Send` (it holds `Rc` state and the embedded QuickJS
/// context), so all mutation happens from the single thread that created
/// it — see [`crate::driver`] for the ordered single-owner message loop.
pub struct LiveSession {
    patcher: Box<dyn Patcher>,
    shell: Box<dyn Shell>,
    sink: Rc<dyn EventSink>,
    evals: Rc<EvalCache>,
    tree: Option<VNode>,
    connection: ConnectionState,
    failed: bool,
}

impl LiveSession {
    pub fn new(
        patcher: Box<dyn Patcher>,
        shell: Box<dyn Shell>,
        sink: Rc<dyn EventSink>,
    ) -> Result<Self> {
        let evals = EvalCache::new().context("failed to initialize the expression engine")?;
        Ok(Self {
            patcher,
            shell,
            sink,
            evals: Rc::new(evals),
            tree: None,
            connection: ConnectionState::Disconnected,
            failed: false,
        })
    }

    /// The single live materialized tree, replaced wholesale per update.
    pub fn current_tree(&self) -> Option<&VNode> {
        self.tree.as_ref()
    }

    pub fn evals(&self) -> &EvalCache {
        &self.evals
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Whether the session hit a terminal error and stopped processing.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Applies one inbound tree snapshot.
    ///
    /// A decode failure is surfaced and drops only this update, leaving the
    /// previous tree both displayed and owned; the next successful update
    /// supersedes it. A patch failure is terminal for the page.
    pub fn handle_update(&mut self, snapshot: &JsonValue) {
        if self.failed {
            warn!(target: "flyweb::session", "ignoring update after terminal error");
            return;
        }

        let tree = match Materializer::new(&self.evals).materialize(snapshot) {
            Ok(tree) => tree,
            Err(err) => {
                error!(target: "flyweb::session", error = %err, "dropping malformed update");
                self.shell.show_error(&err.to_string());
                return;
            }
        };

        self.tree = Some(tree);
        let Some(tree) = self.tree.as_ref() else {
            return;
        };
        if let Err(err) = self.patcher.patch(tree, &self.evals) {
            self.fail(err.context("failed to apply patch"));
        }
    }

    /// Transport connected; dismisses the disconnected overlay.
    pub fn connection_opened(&mut self) {
        if self.connection == ConnectionState::Connected {
            return;
        }
        info!(target: "flyweb::session", "transport connected");
        self.connection = ConnectionState::Connected;
        self.shell.set_connected(true);
    }

    /// Transport dropped; shows the blocking overlay until reconnect.
    pub fn connection_lost(&mut self) {
        if self.connection == ConnectionState::Disconnected {
            return;
        }
        info!(target: "flyweb::session", "transport disconnected");
        self.connection = ConnectionState::Disconnected;
        self.shell.set_connected(false);
    }

    /// Dispatches a captured DOM event through its resolved binding.
    pub fn dispatch(&mut self, binding: &EventBinding, event: &CapturedEvent) {
        if self.failed {
            warn!(target: "flyweb::session", "ignoring event after terminal error");
            return;
        }
        if let Err(err) = binding.dispatch(event, self.sink.as_ref()) {
            self.report_transport_error(&err);
        }
    }

    /// Dispatches a captured keydown through a per-key handler map.
    pub fn dispatch_key(
        &mut self,
        handlers: &BTreeMap<String, EventBinding>,
        event: &CapturedEvent,
    ) {
        if self.failed {
            return;
        }
        match dispatch_keyed(handlers, event, self.sink.as_ref()) {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "flyweb::dispatch", "no handler bound for captured key");
            }
            Err(err) => self.report_transport_error(&err),
        }
    }

    /// Send failures ride the lifecycle overlay rather than the error
    /// surface; the transport signals a disconnect if the link is gone.
    fn report_transport_error(&self, err: &TransportError) {
        warn!(target: "flyweb::session", error = %err, "failed to emit event message");
    }

    fn fail(&mut self, err: anyhow::Error) {
        error!(target: "flyweb::session", error = ?err, "terminal session error");
        self.failed = true;
        self.shell.show_error(&format!("{err:?}"));
    }
}
