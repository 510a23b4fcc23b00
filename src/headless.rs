//! In-memory page harness: reconciler, chrome and transport edge in one
//! handle, for driving sessions without a browser.
//!
//! The harness stands in for the external diff/patch engine with the same
//! contract: materialized plain props are diffed per element against the
//! previous render, only changes reach the live element, and every patched
//! element's after-update chain runs afterwards. Elements are addressed by
//! their `id` prop; elements without one are rendered but not tracked.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::dom::{EventSink, LiveNode, Patcher, Shell};
use crate::error::TransportError;
use crate::eval::EvalCache;
use crate::events::{CapturedEvent, EventData, EventMessage};
use crate::hooks::run_after_update;
use crate::props::PropValue;
use crate::session::LiveSession;
use crate::tree::{VElement, VNode};

/// One live element of the headless page.
#[derive(Debug, Clone)]
pub struct HeadlessElement {
    id: String,
    properties: BTreeMap<String, JsonValue>,
    markers: BTreeMap<String, JsonValue>,
    /// Property writes performed by patching and hooks, in order. User
    /// edits via [`HeadlessPage::set_live_property`] are not recorded.
    writes: Vec<(String, JsonValue)>,
}

impl HeadlessElement {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            properties: BTreeMap::new(),
            markers: BTreeMap::new(),
            writes: Vec::new(),
        }
    }

    pub fn property(&self, prop: &str) -> Option<&JsonValue> {
        self.properties.get(prop)
    }

    pub fn writes(&self) -> &[(String, JsonValue)] {
        &self.writes
    }
}

impl LiveNode for HeadlessElement {
    fn target_id(&self) -> &str {
        &self.id
    }

    fn set_property(&mut self, prop: &str, value: &JsonValue) {
        self.writes.push((prop.to_string(), value.clone()));
        self.properties.insert(prop.to_string(), value.clone());
    }

    fn forced_marker(&self, prop: &str) -> Option<JsonValue> {
        self.markers.get(prop).cloned()
    }

    fn set_forced_marker(&mut self, prop: &str, id: JsonValue) {
        self.markers.insert(prop.to_string(), id);
    }
}

#[derive(Default)]
struct PageState {
    elements: BTreeMap<String, HeadlessElement>,
    /// Materialized plain props as of the previous patch, per element id.
    rendered: BTreeMap<String, BTreeMap<String, JsonValue>>,
    messages: Vec<EventMessage>,
    connected: bool,
    error: Option<String>,
}

/// Handle onto the shared headless page. Clones share state, so a test can
/// keep one clone while the session owns the others.
#[derive(Clone, Default)]
pub struct HeadlessPage {
    state: Rc<RefCell<PageState>>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a session whose reconciler, chrome and transport edge all
    /// point at this page.
    pub fn session(&self) -> Result<LiveSession> {
        LiveSession::new(
            Box::new(self.clone()),
            Box::new(self.clone()),
            Rc::new(self.clone()),
        )
    }

    pub fn element(&self, id: &str) -> Option<HeadlessElement> {
        self.state.borrow().elements.get(id).cloned()
    }

    pub fn property(&self, id: &str, prop: &str) -> Option<JsonValue> {
        self.state
            .borrow()
            .elements
            .get(id)
            .and_then(|element| element.properties.get(prop).cloned())
    }

    /// Number of patch/hook writes to `prop` on element `id` so far.
    pub fn write_count(&self, id: &str, prop: &str) -> usize {
        self.state
            .borrow()
            .elements
            .get(id)
            .map(|element| {
                element
                    .writes
                    .iter()
                    .filter(|(written, _)| written == prop)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Outbound event messages in emission order.
    pub fn messages(&self) -> Vec<EventMessage> {
        self.state.borrow().messages.clone()
    }

    pub fn connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Mutates a live property directly, the way user interaction would,
    /// without touching render state or the write log.
    pub fn set_live_property(&self, id: &str, prop: &str, value: JsonValue) {
        if let Some(element) = self.state.borrow_mut().elements.get_mut(id) {
            element.properties.insert(prop.to_string(), value);
        }
    }

    /// Synthesizes a captured event from the live element state: identity
    /// from the element itself, `target_value` from its `value` property.
    pub fn captured(&self, id: &str, event_type: &str, data: EventData) -> Option<CapturedEvent> {
        let state = self.state.borrow();
        let element = state.elements.get(id)?;
        let target_value = match element.properties.get("value") {
            Some(JsonValue::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        };
        Some(CapturedEvent {
            event_type: event_type.to_string(),
            target_id: id.to_string(),
            target_value,
            data,
        })
    }
}

impl Patcher for HeadlessPage {
    fn patch(&mut self, tree: &VNode, evals: &EvalCache) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let mut seen = Vec::new();
        patch_node(&mut state, tree, evals, &mut seen)?;
        state.elements.retain(|id, _| seen.iter().any(|s| s == id));
        state.rendered.retain(|id, _| seen.iter().any(|s| s == id));
        Ok(())
    }
}

fn patch_node(
    state: &mut PageState,
    node: &VNode,
    evals: &EvalCache,
    seen: &mut Vec<String>,
) -> Result<()> {
    let VNode::Element(element) = node else {
        return Ok(());
    };
    if let Some(id) = element.id() {
        seen.push(id.to_string());
        patch_element(state, id, element, evals)?;
    }
    for child in &element.children {
        patch_node(state, child, evals, seen)?;
    }
    Ok(())
}

fn patch_element(
    state: &mut PageState,
    id: &str,
    element: &VElement,
    evals: &EvalCache,
) -> Result<()> {
    let mut plain = BTreeMap::new();
    for (name, prop) in &element.props {
        if let PropValue::Plain(value) = prop {
            plain.insert(name.clone(), value.clone());
        }
    }

    // Diff against the previous render; only changed props reach the live
    // element. Forced values go through the hook chain below instead.
    let previous = state.rendered.get(id).cloned().unwrap_or_default();
    let live = state
        .elements
        .entry(id.to_string())
        .or_insert_with(|| HeadlessElement::new(id));
    for (name, value) in &plain {
        if previous.get(name) != Some(value) {
            live.set_property(name, value);
        }
    }

    run_after_update(&element.after_update, live, evals)?;
    state.rendered.insert(id.to_string(), plain);
    Ok(())
}

impl Shell for HeadlessPage {
    fn set_connected(&mut self, connected: bool) {
        self.state.borrow_mut().connected = connected;
    }

    fn show_error(&mut self, trace: &str) {
        self.state.borrow_mut().error = Some(trace.to_string());
    }
}

impl EventSink for HeadlessPage {
    fn send(&self, message: &EventMessage) -> Result<(), TransportError> {
        debug!(
            target: "flyweb::dispatch",
            event_type = %message.event_type,
            target_id = %message.target_id,
            "recorded outbound event"
        );
        self.state.borrow_mut().messages.push(message.clone());
        Ok(())
    }
}
