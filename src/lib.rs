//! Client runtime for the flyweb live-tree protocol: decodes server-pushed
//! tree snapshots for an external reconciler, resolves marker-encoded props
//! into bindings, callables and forced-value hooks, and serializes captured
//! DOM events into outbound messages. See [`protocol`] for the wire format.

pub mod dom;
pub mod driver;
pub mod error;
pub mod eval;
pub mod events;
pub mod headless;
pub mod hooks;
pub mod props;
pub mod protocol;
pub mod session;
pub mod tree;

pub use dom::{EventSink, LiveNode, Patcher, Shell};
pub use error::{DecodeError, TransportError};
pub use eval::{CompiledExpr, EvalCache};
pub use events::{
    CapturedEvent, EventBinding, EventData, EventMessage, HandlerClass, KeyboardData, MouseData,
};
pub use headless::{HeadlessElement, HeadlessPage};
pub use hooks::{AfterUpdate, ForceHook};
pub use props::PropValue;
pub use session::{ConnectionState, LiveSession};
pub use tree::{Materializer, VElement, VNode};
