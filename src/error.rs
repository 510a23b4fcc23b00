use thiserror::Error;

/// Errors raised while decoding an inbound tree snapshot.
///
/// Every variant is fatal to the current update only: the update is dropped
/// after being surfaced, and the previously materialized tree stays in
/// place. Nothing here is ever silently swallowed.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The wire value is neither a string leaf nor an element object.
    #[error("expected a node (string or element object), got {excerpt}")]
    UnexpectedNode { excerpt: String },

    /// An element object with the wrong fields or field types.
    #[error("malformed element ({detail}): {excerpt}")]
    MalformedElement { detail: String, excerpt: String },

    /// A marker tuple with the wrong arity or payload types.
    #[error("malformed {tag} marker ({detail}): {excerpt}")]
    MalformedMarker {
        tag: &'static str,
        detail: String,
        excerpt: String,
    },

    /// An event handler tuple naming a class outside the fixed table.
    #[error("unknown event handler class \"{name}\"")]
    UnknownHandlerClass { name: String },

    /// A directive in the framework prop bag this client does not know.
    #[error("unknown directive \"{name}\" in the _flyweb prop bag")]
    UnknownDirective { name: String },

    /// Two encodings tried to bind the same prop.
    #[error("conflicting bindings for prop \"{prop}\"")]
    ConflictingProp { prop: String },

    /// Server-supplied expression text failed to compile to a function.
    #[error("failed to compile expression: {message}")]
    ExprCompile { message: String },
}

/// Transport-level failures. These are never fatal to the session; they
/// drive the disconnected overlay and clear on reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection is closed")]
    Closed,

    #[error("failed to send event message: {0}")]
    Send(String),
}

/// Single-line excerpt of a wire value for error messages.
pub(crate) fn json_excerpt(value: &serde_json::Value) -> String {
    const MAX_LEN: usize = 120;
    let mut text = value.to_string();
    if text.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}
