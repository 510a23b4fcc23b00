use std::collections::BTreeMap;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{json_excerpt, DecodeError};
use crate::eval::EvalCache;
use crate::hooks::AfterUpdate;
use crate::props::{decode_props, PropValue};

/// Materialized node handed to the external reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Text(String),
    Element(VElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub props: BTreeMap<String, PropValue>,
    pub children: Vec<VNode>,
    /// Post-patch hook chain; the reconciler runs this after every patch
    /// that includes the element, diff outcome notwithstanding.
    pub after_update: Vec<AfterUpdate>,
}

impl VNode {
    /// Finds the first element whose `id` prop equals `id`, depth-first.
    pub fn find_element(&self, id: &str) -> Option<&VElement> {
        match self {
            VNode::Text(_) => None,
            VNode::Element(element) => element.find_element(id),
        }
    }
}

impl VElement {
    pub fn find_element(&self, id: &str) -> Option<&VElement> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_element(id))
    }

    /// The element's `id` prop, when it is a plain string.
    pub fn id(&self) -> Option<&str> {
        match self.props.get("id") {
            Some(PropValue::Plain(JsonValue::String(id))) => Some(id.as_str()),
            _ => None,
        }
    }
}

/// Converts wire-format snapshots into materialized trees.
///
/// Invoked once per inbound update with the entire snapshot as input; it is
/// never incremental. A failure anywhere aborts the whole materialization
/// and leaves the caller's previous tree untouched.
pub struct Materializer<'a> {
    evals: &'a EvalCache,
}

impl<'a> Materializer<'a> {
    pub fn new(evals: &'a EvalCache) -> Self {
        Self { evals }
    }

    pub fn materialize(&self, value: &JsonValue) -> Result<VNode, DecodeError> {
        match value {
            JsonValue::String(text) => Ok(VNode::Text(text.clone())),
            JsonValue::Object(fields) => self.materialize_element(fields, value),
            other => Err(DecodeError::UnexpectedNode {
                excerpt: json_excerpt(other),
            }),
        }
    }

    fn materialize_element(
        &self,
        fields: &JsonMap<String, JsonValue>,
        raw: &JsonValue,
    ) -> Result<VNode, DecodeError> {
        let malformed = |detail: &str| DecodeError::MalformedElement {
            detail: detail.to_string(),
            excerpt: json_excerpt(raw),
        };

        for key in fields.keys() {
            if key != "tag" && key != "props" && key != "children" {
                return Err(malformed(&format!("unexpected field \"{key}\"")));
            }
        }

        let tag = match fields.get("tag") {
            Some(JsonValue::String(tag)) if !tag.is_empty() => tag.clone(),
            Some(_) => return Err(malformed("\"tag\" must be a non-empty string")),
            None => return Err(malformed("missing \"tag\"")),
        };

        let (props, after_update) = match fields.get("props") {
            None | Some(JsonValue::Null) => (BTreeMap::new(), Vec::new()),
            Some(JsonValue::Object(props)) => decode_props(props, self.evals)?,
            Some(_) => return Err(malformed("\"props\" must be an object or null")),
        };

        let children = match fields.get("children") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| self.materialize(item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(malformed("\"children\" must be an array or null")),
        };

        Ok(VNode::Element(VElement {
            tag,
            props,
            children,
            after_update,
        }))
    }
}
