//! Wire protocol between a flyweb server and this client, version 2.
//!
//! The server pushes `update` messages, each carrying one complete tree
//! snapshot that replaces whatever was previously displayed. A snapshot is
//! JSON: a bare string is a text leaf, an object
//! `{"tag": string, "props": object|null, "children": array|null}` is an
//! element. The legacy 3-tuple element shape from protocol version 1 is not
//! accepted.
//!
//! Props may carry marker tuples, small fixed-arity JSON arrays whose first
//! entry is one of the tag constants below. They let non-serializable values
//! (handler bindings, frontend callbacks, forced DOM writes) travel as
//! plain JSON:
//!
//! - `[EVENT_HANDLER_TAG, class]` or `[EVENT_HANDLER_TAG, class, key]`
//!   binds a built-in handler class to the prop; the optional key is echoed
//!   back to the server in the resulting event messages.
//! - `[EVAL_TAG, source]` compiles `source` as a strict function expression
//!   and uses the callable as the prop value.
//! - `[FORCE_VALUE_TAG, id, value]` sets the prop to `value` and rewrites
//!   the live DOM property after every patch in which `id` is new.
//!
//! The reserved [`META_PROP`] prop carries framework directives; the only
//! directive in this revision is [`KEY_DOWN_HANDLERS_DIRECTIVE`], a map
//! from key names to keyboard handler tuples that expands into a single
//! keydown binding dispatching on the captured key.
//!
//! The client answers with `event` messages: flat objects always carrying
//! `type`, `target_id` and `target_value`, the class-specific fields of
//! [`crate::events::EventBinding::message`], and `handler_key` when the
//! originating binding carried one.

/// Version of the wire schema this client speaks.
pub const PROTOCOL_VERSION: u32 = 2;

/// Marker tuple tag binding a built-in event handler class.
pub const EVENT_HANDLER_TAG: &str = "_flyweb_event_handler";

/// Marker tuple tag carrying frontend expression source text.
pub const EVAL_TAG: &str = "_flyweb_eval";

/// Marker tuple tag forcing a live DOM property write after each patch.
pub const FORCE_VALUE_TAG: &str = "_flyweb_force_value";

/// Reserved prop name carrying framework directives.
pub const META_PROP: &str = "_flyweb";

/// Directive in the meta bag mapping key names to keydown handlers.
pub const KEY_DOWN_HANDLERS_DIRECTIVE: &str = "individualKeyDownHandlers";

/// Prop the keyed keydown map expands into.
pub const KEY_DOWN_PROP: &str = "onkeydown";

/// Prop whose callable joins the element's after-update hook chain.
pub const AFTER_UPDATE_PROP: &str = "afterUpdate";

/// Anchor element the materialized tree is mounted under.
pub const CONTENT_ELEMENT_ID: &str = "flyweb-content";

/// Anchor element shown as a blocking overlay while disconnected.
pub const DISCONNECTED_OVERLAY_ID: &str = "flyweb-disconnected";

/// Anchor element revealed when the session hits a terminal error.
pub const ERROR_ELEMENT_ID: &str = "flyweb-error";

/// Text region inside the error element holding the diagnostic trace.
pub const ERROR_TRACE_ELEMENT_ID: &str = "flyweb-error-trace";
