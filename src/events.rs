use std::collections::BTreeMap;

use keyboard_types::{Code, Key};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::debug;

use crate::dom::EventSink;
use crate::error::{DecodeError, TransportError};

/// Built-in handler classes a server-side callback can be bound as.
///
/// The class decides which parameter set the outbound message carries; the
/// name table is fixed, and binding an unknown name fails at decode time,
/// never when the event later fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerClass {
    NoArgs,
    Event,
    FocusEvent,
    MouseEvent,
    KeyboardEvent,
}

impl HandlerClass {
    pub fn from_wire(name: &str) -> Result<Self, DecodeError> {
        match name {
            "no_args" => Ok(Self::NoArgs),
            "event" => Ok(Self::Event),
            "focus_event" => Ok(Self::FocusEvent),
            "mouse_event" => Ok(Self::MouseEvent),
            "keyboard_event" => Ok(Self::KeyboardEvent),
            other => Err(DecodeError::UnknownHandlerClass {
                name: other.to_string(),
            }),
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::NoArgs => "no_args",
            Self::Event => "event",
            Self::FocusEvent => "focus_event",
            Self::MouseEvent => "mouse_event",
            Self::KeyboardEvent => "keyboard_event",
        }
    }
}

/// Snapshot of a DOM event taken by the embedder when a bound event fires.
///
/// `target_id` and `target_value` are read from the element the handler is
/// attached to, not the innermost event target, so events bubbling out of
/// child elements still report the listening element's identity.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub event_type: String,
    pub target_id: String,
    pub target_value: Option<String>,
    pub data: EventData,
}

/// Class-specific fields captured alongside the basic identity.
#[derive(Debug, Clone)]
pub enum EventData {
    Basic,
    Mouse(MouseData),
    Keyboard(KeyboardData),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MouseData {
    pub detail: i32,
    pub button: i32,
    pub buttons: u32,
}

#[derive(Debug, Clone)]
pub struct KeyboardData {
    pub detail: i32,
    pub key: Key,
    pub code: Code,
    pub key_code: u32,
}

/// Flat outbound message emitted when a bound handler fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub event_type: String,
    pub target_id: String,
    /// Always present on the wire; null when the listening element has no
    /// value property.
    #[serde(default)]
    pub target_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_key: Option<String>,
    /// Class-specific parameters (mouse or keyboard fields).
    #[serde(flatten)]
    pub params: JsonMap<String, JsonValue>,
}

/// A resolved `event_handler` binding attached to an element prop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    class: HandlerClass,
    handler_key: Option<String>,
}

impl EventBinding {
    pub fn new(class: HandlerClass, handler_key: Option<String>) -> Self {
        Self { class, handler_key }
    }

    pub fn class(&self) -> HandlerClass {
        self.class
    }

    pub fn handler_key(&self) -> Option<&str> {
        self.handler_key.as_deref()
    }

    /// Builds the outbound message for a captured event.
    ///
    /// Basic classes carry only the identity fields; the mouse class adds
    /// `detail`/`button`/`buttons`, the keyboard class adds
    /// `detail`/`code`/`key`/`keyCode`. Captured data that does not match
    /// the bound class falls back to neutral values.
    pub fn message(&self, event: &CapturedEvent) -> EventMessage {
        let mut params = JsonMap::new();
        match self.class {
            HandlerClass::MouseEvent => {
                let (detail, button, buttons) = match &event.data {
                    EventData::Mouse(data) => (data.detail, data.button, data.buttons),
                    _ => (0, 0, 0),
                };
                params.insert("detail".to_string(), json!(detail));
                params.insert("button".to_string(), json!(button));
                params.insert("buttons".to_string(), json!(buttons));
            }
            HandlerClass::KeyboardEvent => {
                let (detail, key, code, key_code) = match &event.data {
                    EventData::Keyboard(data) => (
                        data.detail,
                        data.key.to_string(),
                        data.code.to_string(),
                        data.key_code,
                    ),
                    _ => (0, String::new(), String::new(), 0),
                };
                params.insert("detail".to_string(), json!(detail));
                params.insert("code".to_string(), json!(code));
                params.insert("key".to_string(), json!(key));
                params.insert("keyCode".to_string(), json!(key_code));
            }
            HandlerClass::NoArgs | HandlerClass::Event | HandlerClass::FocusEvent => {}
        }

        EventMessage {
            event_type: event.event_type.clone(),
            target_id: event.target_id.clone(),
            target_value: event.target_value.clone(),
            handler_key: self.handler_key.clone(),
            params,
        }
    }

    /// Synchronously emits exactly one message for the captured event.
    /// There is no batching or debouncing; rapid events produce that many
    /// ordered messages.
    pub fn dispatch(
        &self,
        event: &CapturedEvent,
        sink: &dyn EventSink,
    ) -> Result<(), TransportError> {
        let message = self.message(event);
        debug!(
            target: "flyweb::dispatch",
            event_type = %message.event_type,
            target_id = %message.target_id,
            "dispatching event"
        );
        sink.send(&message)
    }
}

/// Looks up the captured key in a per-key handler map and dispatches the
/// matching binding, if any. Returns whether a handler fired.
pub fn dispatch_keyed(
    handlers: &BTreeMap<String, EventBinding>,
    event: &CapturedEvent,
    sink: &dyn EventSink,
) -> Result<bool, TransportError> {
    let EventData::Keyboard(data) = &event.data else {
        return Ok(false);
    };
    let Some(binding) = handlers.get(&data.key.to_string()) else {
        return Ok(false);
    };
    binding.dispatch(event, sink)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(data: EventData) -> CapturedEvent {
        CapturedEvent {
            event_type: "click".to_string(),
            target_id: "widget".to_string(),
            target_value: None,
            data,
        }
    }

    #[test]
    fn basic_class_carries_identity_only() {
        let binding = EventBinding::new(HandlerClass::Event, None);
        let message = binding.message(&captured(EventData::Basic));
        assert!(message.params.is_empty());
        assert_eq!(message.handler_key, None);
    }

    #[test]
    fn mouse_class_defaults_when_data_is_missing() {
        let binding = EventBinding::new(HandlerClass::MouseEvent, None);
        let message = binding.message(&captured(EventData::Basic));
        assert_eq!(message.params.get("detail"), Some(&json!(0)));
        assert_eq!(message.params.get("button"), Some(&json!(0)));
        assert_eq!(message.params.get("buttons"), Some(&json!(0)));
    }

    #[test]
    fn unknown_class_name_is_rejected() {
        assert!(matches!(
            HandlerClass::from_wire("gamepad_event"),
            Err(DecodeError::UnknownHandlerClass { .. })
        ));
    }
}
