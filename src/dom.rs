use anyhow::Result;
use serde_json::Value as JsonValue;

use crate::error::TransportError;
use crate::eval::EvalCache;
use crate::events::EventMessage;
use crate::tree::VNode;

/// One live element of the real page, as post-patch hooks see it.
///
/// Forced-value markers live on the element rather than in the session so
/// they disappear with the element when the reconciler recreates it.
pub trait LiveNode {
    /// The identity this element reports in outbound events.
    fn target_id(&self) -> &str;

    /// Writes a property on the live element.
    fn set_property(&mut self, prop: &str, value: &JsonValue);

    /// Marker recorded by the last forced write of `prop`, if any.
    fn forced_marker(&self, prop: &str) -> Option<JsonValue>;

    fn set_forced_marker(&mut self, prop: &str, id: JsonValue);
}

/// The external diff/patch engine.
///
/// Implementations diff `tree` against whatever they previously mounted,
/// apply the minimal mutation to the real page, and then run each patched
/// element's `after_update` chain via [`crate::hooks::run_after_update`].
/// The chain must run even for elements the diff considered unchanged;
/// that is the whole point of forced-value hooks.
pub trait Patcher {
    fn patch(&mut self, tree: &VNode, evals: &EvalCache) -> Result<()>;
}

/// Outbound edge of the transport; carries event messages to the server.
pub trait EventSink {
    fn send(&self, message: &EventMessage) -> Result<(), TransportError>;
}

/// Page chrome around the mounted tree: the disconnected overlay and the
/// terminal error surface (see the anchor ids in [`crate::protocol`]).
pub trait Shell {
    fn set_connected(&mut self, connected: bool);

    /// Reveals the error surface with the full diagnostic trace.
    fn show_error(&mut self, trace: &str);
}
