use anyhow::{Context as AnyhowContext, Result};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::dom::LiveNode;
use crate::eval::{CompiledExpr, EvalCache};

/// Forces a live DOM property back to a server-chosen value after a patch.
///
/// The reconciler diffs materialized props, so a prop that is unchanged
/// between two renders produces no DOM write even when the live property
/// has since diverged through user interaction (text typed into an input
/// the server wants reset to its prior value). The hook compares its
/// `force_id` against the marker last recorded on the live element and
/// rewrites the property whenever the id is new.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceHook {
    /// Prop to rewrite; nested props use a dotted path (`styles.color`).
    pub prop: String,
    pub force_id: JsonValue,
    pub value: JsonValue,
}

impl ForceHook {
    /// Applies the hook, returning whether the live property was written.
    /// Repeated application with an unchanged `force_id` writes nothing.
    pub fn apply(&self, node: &mut dyn LiveNode) -> bool {
        if node.forced_marker(&self.prop).as_ref() == Some(&self.force_id) {
            return false;
        }
        node.set_property(&self.prop, &self.value);
        node.set_forced_marker(&self.prop, self.force_id.clone());
        true
    }
}

/// One link of an element's post-patch hook chain.
#[derive(Debug, Clone, PartialEq)]
pub enum AfterUpdate {
    /// Caller-supplied frontend callback (an `afterUpdate` prop).
    Callable(CompiledExpr),
    /// Forced-value rewrite registered by a `force_value` prop.
    Force(ForceHook),
}

/// Runs an element's full hook chain against its live node.
///
/// Callable hooks receive the element identity as their argument; a failing
/// callable aborts the chain so the error reaches the top-level handler.
pub fn run_after_update(
    hooks: &[AfterUpdate],
    node: &mut dyn LiveNode,
    evals: &EvalCache,
) -> Result<()> {
    for hook in hooks {
        match hook {
            AfterUpdate::Callable(expr) => {
                evals
                    .call(expr, &json!({ "target_id": node.target_id() }))
                    .context("afterUpdate hook failed")?;
            }
            AfterUpdate::Force(force) => {
                if force.apply(node) {
                    debug!(
                        target: "flyweb::session",
                        prop = %force.prop,
                        "forced live property write"
                    );
                }
            }
        }
    }
    Ok(())
}
