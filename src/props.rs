use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{json_excerpt, DecodeError};
use crate::eval::{CompiledExpr, EvalCache};
use crate::events::{EventBinding, HandlerClass};
use crate::hooks::{AfterUpdate, ForceHook};
use crate::protocol;

/// A resolved element prop.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Opaque scalar or structure passed through to the reconciler unchanged.
    Plain(JsonValue),
    /// Compound object whose entries were resolved individually (markers
    /// may nest inside props like `styles`).
    Map(BTreeMap<String, PropValue>),
    /// Server-bound event handler.
    Handler(EventBinding),
    /// Keydown handlers dispatched by the captured key name.
    KeyedHandlers(BTreeMap<String, EventBinding>),
    /// Compiled frontend expression.
    Callable(CompiledExpr),
}

impl PropValue {
    pub fn as_handler(&self) -> Option<&EventBinding> {
        match self {
            PropValue::Handler(binding) => Some(binding),
            _ => None,
        }
    }

    pub fn as_plain(&self) -> Option<&JsonValue> {
        match self {
            PropValue::Plain(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    EventHandler,
    Eval,
    ForceValue,
}

impl MarkerKind {
    fn tag(self) -> &'static str {
        match self {
            Self::EventHandler => protocol::EVENT_HANDLER_TAG,
            Self::Eval => protocol::EVAL_TAG,
            Self::ForceValue => protocol::FORCE_VALUE_TAG,
        }
    }
}

/// Up-front classification of a prop value: marker tuple, plain object to
/// resolve recursively, or opaque passthrough. Arrays that do not open with
/// a marker tag are ordinary data.
enum PropShape<'v> {
    Marker(MarkerKind, &'v [JsonValue]),
    Object(&'v JsonMap<String, JsonValue>),
    Opaque,
}

fn classify(value: &JsonValue) -> PropShape<'_> {
    match value {
        JsonValue::Array(items) => match items.first() {
            Some(JsonValue::String(head)) => match head.as_str() {
                protocol::EVENT_HANDLER_TAG => PropShape::Marker(MarkerKind::EventHandler, items),
                protocol::EVAL_TAG => PropShape::Marker(MarkerKind::Eval, items),
                protocol::FORCE_VALUE_TAG => PropShape::Marker(MarkerKind::ForceValue, items),
                _ => PropShape::Opaque,
            },
            _ => PropShape::Opaque,
        },
        JsonValue::Object(map) => PropShape::Object(map),
        _ => PropShape::Opaque,
    }
}

/// Resolves every marker encoding in an element's props mapping.
///
/// Non-marker props pass through untouched. Plain objects are resolved
/// entry by entry, since markers can nest inside compound props; marker
/// tuples themselves are never recursed into. Returns the resolved props
/// together with the element's collected after-update hook chain.
pub fn decode_props(
    props: &JsonMap<String, JsonValue>,
    evals: &EvalCache,
) -> Result<(BTreeMap<String, PropValue>, Vec<AfterUpdate>), DecodeError> {
    let mut resolved = BTreeMap::new();
    let mut hooks = Vec::new();

    for (name, value) in props {
        if name == protocol::META_PROP {
            continue;
        }
        let prop = decode_prop_value(name, value, evals, &mut hooks)?;
        resolved.insert(name.clone(), prop);
    }

    // A callable afterUpdate prop becomes the head of the hook chain, ahead
    // of any force hooks, so the caller-supplied callback is never dropped.
    if matches!(
        resolved.get(protocol::AFTER_UPDATE_PROP),
        Some(PropValue::Callable(_))
    ) {
        if let Some(PropValue::Callable(expr)) = resolved.remove(protocol::AFTER_UPDATE_PROP) {
            hooks.insert(0, AfterUpdate::Callable(expr));
        }
    }

    if let Some(bag) = props.get(protocol::META_PROP) {
        expand_meta_bag(bag, &mut resolved)?;
    }

    Ok((resolved, hooks))
}

fn decode_prop_value(
    name: &str,
    value: &JsonValue,
    evals: &EvalCache,
    hooks: &mut Vec<AfterUpdate>,
) -> Result<PropValue, DecodeError> {
    match classify(value) {
        PropShape::Marker(kind, items) => decode_marker(name, kind, items, value, evals, hooks),
        PropShape::Object(map) => {
            let mut entries = BTreeMap::new();
            for (key, entry) in map {
                let path = format!("{name}.{key}");
                entries.insert(key.clone(), decode_prop_value(&path, entry, evals, hooks)?);
            }
            Ok(PropValue::Map(entries))
        }
        PropShape::Opaque => Ok(PropValue::Plain(value.clone())),
    }
}

fn decode_marker(
    name: &str,
    kind: MarkerKind,
    items: &[JsonValue],
    raw: &JsonValue,
    evals: &EvalCache,
    hooks: &mut Vec<AfterUpdate>,
) -> Result<PropValue, DecodeError> {
    let malformed = |detail: &str| DecodeError::MalformedMarker {
        tag: kind.tag(),
        detail: detail.to_string(),
        excerpt: json_excerpt(raw),
    };

    match kind {
        MarkerKind::EventHandler => Ok(PropValue::Handler(decode_handler_tuple(items, raw)?)),
        MarkerKind::Eval => {
            if items.len() != 2 {
                return Err(malformed("expected 2 entries"));
            }
            let source = match &items[1] {
                JsonValue::String(source) => source,
                _ => return Err(malformed("source text must be a string")),
            };
            Ok(PropValue::Callable(evals.resolve(source)?))
        }
        MarkerKind::ForceValue => {
            if items.len() != 3 {
                return Err(malformed("expected 3 entries"));
            }
            let force_id = items[1].clone();
            if !(force_id.is_string() || force_id.is_number()) {
                return Err(malformed("force id must be a string or number"));
            }
            let value = items[2].clone();
            hooks.push(AfterUpdate::Force(ForceHook {
                prop: name.to_string(),
                force_id,
                value: value.clone(),
            }));
            Ok(PropValue::Plain(value))
        }
    }
}

fn decode_handler_tuple(
    items: &[JsonValue],
    raw: &JsonValue,
) -> Result<EventBinding, DecodeError> {
    let malformed = |detail: &str| DecodeError::MalformedMarker {
        tag: protocol::EVENT_HANDLER_TAG,
        detail: detail.to_string(),
        excerpt: json_excerpt(raw),
    };

    if items.len() != 2 && items.len() != 3 {
        return Err(malformed("expected 2 or 3 entries"));
    }
    let class = match &items[1] {
        JsonValue::String(name) => HandlerClass::from_wire(name)?,
        _ => return Err(malformed("handler class must be a string")),
    };
    let handler_key = match items.get(2) {
        None => None,
        Some(JsonValue::String(key)) => Some(key.clone()),
        Some(_) => return Err(malformed("handler key must be a string")),
    };
    Ok(EventBinding::new(class, handler_key))
}

/// Expands the reserved framework prop bag into concrete bindings.
fn expand_meta_bag(
    bag: &JsonValue,
    resolved: &mut BTreeMap<String, PropValue>,
) -> Result<(), DecodeError> {
    let malformed = |detail: &str| DecodeError::MalformedMarker {
        tag: protocol::META_PROP,
        detail: detail.to_string(),
        excerpt: json_excerpt(bag),
    };

    let JsonValue::Object(directives) = bag else {
        return Err(malformed("directive bag must be an object"));
    };

    for (directive, value) in directives {
        match directive.as_str() {
            protocol::KEY_DOWN_HANDLERS_DIRECTIVE => {
                let JsonValue::Object(entries) = value else {
                    return Err(malformed("key handler map must be an object"));
                };
                let mut handlers = BTreeMap::new();
                for (key_name, tuple) in entries {
                    let PropShape::Marker(MarkerKind::EventHandler, items) = classify(tuple)
                    else {
                        return Err(malformed("each key entry must be an event handler tuple"));
                    };
                    let binding = decode_handler_tuple(items, tuple)?;
                    if binding.class() != HandlerClass::KeyboardEvent {
                        return Err(malformed("key handlers must use the keyboard_event class"));
                    }
                    handlers.insert(key_name.clone(), binding);
                }
                if resolved.contains_key(protocol::KEY_DOWN_PROP) {
                    return Err(DecodeError::ConflictingProp {
                        prop: protocol::KEY_DOWN_PROP.to_string(),
                    });
                }
                resolved.insert(
                    protocol::KEY_DOWN_PROP.to_string(),
                    PropValue::KeyedHandlers(handlers),
                );
            }
            other => {
                return Err(DecodeError::UnknownDirective {
                    name: other.to_string(),
                })
            }
        }
    }
    Ok(())
}
