use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use rquickjs::{Context, Ctx, Error as JsError, Function, Runtime, Value};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::DecodeError;

/// Engine-side registry array holding compiled functions by slot.
const EXPR_REGISTRY: &str = "__flyweb_exprs";

/// Scratch global used to pass the JSON call argument into the engine.
const ARG_GLOBAL: &str = "__flyweb_arg";

/// Compiled representation of server-supplied expression source text.
///
/// Clones share the same underlying compiled function; [`CompiledExpr::same`]
/// is reference equality, and the owning [`EvalCache`] guarantees that
/// identical source text resolves to the same instance for the life of the
/// session.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    inner: Rc<ExprInner>,
}

#[derive(Debug)]
struct ExprInner {
    source: String,
    slot: usize,
}

impl CompiledExpr {
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    pub fn same(&self, other: &CompiledExpr) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for CompiledExpr {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

/// QuickJS-backed cache of compiled expressions.
///
/// Entries are created lazily on first sight and never evicted; the cache
/// lives as long as the page session. Source text arrives from the server
/// and runs with full access to the embedded engine: there is deliberately
/// no sandboxing, the server is a trusted peer.
///
/// The engine has `console` wired up to `tracing`, the way the embedding
/// page's developer console would receive it.
pub struct EvalCache {
    runtime: Runtime,
    context: Context,
    entries: RefCell<HashMap<String, CompiledExpr>>,
}

impl EvalCache {
    pub fn new() -> Result<Self> {
        let runtime = Runtime::new().context("failed to create QuickJS runtime")?;
        let context = Context::full(&runtime).context("failed to create QuickJS context")?;
        let cache = Self {
            runtime,
            context,
            entries: RefCell::new(HashMap::new()),
        };
        cache.init_globals()?;
        Ok(cache)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Returns the compiled callable for `source`, compiling on first sight.
    ///
    /// The source is evaluated as a strict, self-contained function
    /// expression; anything that fails to compile, or compiles to a
    /// non-function, fails the decode of the prop that carried it.
    pub fn resolve(&self, source: &str) -> Result<CompiledExpr, DecodeError> {
        if let Some(existing) = self.entries.borrow().get(source) {
            return Ok(existing.clone());
        }

        let slot = self.entries.borrow().len();
        self.compile(source, slot)?;

        let expr = CompiledExpr {
            inner: Rc::new(ExprInner {
                source: source.to_string(),
                slot,
            }),
        };
        self.entries
            .borrow_mut()
            .insert(source.to_string(), expr.clone());
        debug!(target: "flyweb::eval", slot, "compiled expression");
        Ok(expr)
    }

    fn compile(&self, source: &str, slot: usize) -> Result<(), DecodeError> {
        // The trailing newline keeps a line comment at the end of the
        // source from swallowing the closing paren.
        let script = format!("\"use strict\"; globalThis.{EXPR_REGISTRY}[{slot}] = (\n{source}\n);");
        self.eval_with::<()>(&script)
            .map_err(|err| DecodeError::ExprCompile {
                message: err.to_string(),
            })?;

        let check = format!("typeof globalThis.{EXPR_REGISTRY}[{slot}] === \"function\"");
        let is_function: bool =
            self.eval_with(&check)
                .map_err(|err| DecodeError::ExprCompile {
                    message: err.to_string(),
                })?;
        if !is_function {
            return Err(DecodeError::ExprCompile {
                message: "expression did not evaluate to a function".to_string(),
            });
        }
        Ok(())
    }

    /// Invokes a compiled expression with a JSON argument, returning its
    /// result mapped back to JSON (`null` when the result is undefined).
    pub fn call(&self, expr: &CompiledExpr, arg: &JsonValue) -> Result<JsonValue> {
        let payload =
            serde_json::to_string(arg).context("failed to serialize expression argument")?;
        self.context
            .with(|ctx| ctx.globals().set(ARG_GLOBAL, payload))
            .map_err(anyhow::Error::from)?;

        let slot = expr.inner.slot;
        let script = format!(
            "JSON.stringify(globalThis.{EXPR_REGISTRY}[{slot}](JSON.parse(globalThis.{ARG_GLOBAL}))) ?? \"null\""
        );
        let result: String = self.eval_with(&script)?;
        self.pump()?;
        serde_json::from_str(&result).context("expression returned malformed JSON")
    }

    fn eval_with<V>(&self, source: &str) -> Result<V>
    where
        V: for<'js> rquickjs::FromJs<'js>,
    {
        let eval_result = self
            .context
            .with(|ctx| ctx.eval::<V, _>(source.as_bytes().to_vec()));

        match eval_result {
            Ok(value) => Ok(value),
            Err(JsError::Exception) => {
                let message = self
                    .context
                    .with(|ctx| capture_exception_message(&ctx))
                    .unwrap_or_else(|| "QuickJS exception".to_string());
                Err(anyhow!(message))
            }
            Err(err) => Err(anyhow::Error::from(err)),
        }
    }

    /// Drains the engine's pending job queue (promise continuations and
    /// other microtasks a called expression may have scheduled).
    fn pump(&self) -> Result<()> {
        const MAX_JOBS: usize = 1000;

        let mut job_count = 0;
        while self.runtime.is_job_pending() {
            match self.runtime.execute_pending_job() {
                Ok(true) => {
                    job_count += 1;
                    if job_count >= MAX_JOBS {
                        tracing::warn!(
                            target: "flyweb::eval",
                            "stopped processing jobs after {} iterations (possible infinite loop)",
                            MAX_JOBS
                        );
                        break;
                    }
                }
                Ok(false) => break,
                Err(job_exception) => {
                    tracing::error!(
                        target: "flyweb::eval",
                        "job execution error: {:?}",
                        job_exception
                    );
                    break;
                }
            }
        }

        if job_count > 0 {
            debug!(target: "flyweb::eval", jobs = job_count, "executed pending jobs");
        }
        Ok(())
    }

    fn init_globals(&self) -> Result<()> {
        self.context
            .with(|ctx| {
                let global = ctx.globals();
                let log_fn = Function::new(ctx.clone(), log_from_js)?.with_name("__flyweb_log")?;
                global.set("__flyweb_log", log_fn)?;
                ctx.eval::<(), _>(CONSOLE_BOOTSTRAP.as_bytes())?;
                ctx.eval::<(), _>(REGISTRY_BOOTSTRAP.as_bytes())
            })
            .map_err(anyhow::Error::from)
    }
}

fn log_from_js(message: String) -> rquickjs::Result<()> {
    tracing::info!(target: "flyweb::eval", message = %message);
    Ok(())
}

fn capture_exception_message(ctx: &Ctx<'_>) -> Option<String> {
    let exception: Value = ctx.catch();

    if let Some(obj) = exception.as_object() {
        if let Ok(message) = obj.get::<_, String>("message") {
            if let Ok(stack) = obj.get::<_, String>("stack") {
                return Some(format!("Error: {}\nStack: {}", message, stack));
            }
            return Some(format!("Error: {}", message));
        }
    }

    Some(format!("{:?}", exception))
}

const REGISTRY_BOOTSTRAP: &str = r#"
globalThis.__flyweb_exprs = [];
"#;

const CONSOLE_BOOTSTRAP: &str = r#"
(() => {
    const global = globalThis;
    const stringify = (value) => {
        try {
            if (typeof value === 'string') {
                return value;
            }
            if (value === undefined) {
                return 'undefined';
            }
            if (value === null) {
                return 'null';
            }
            return String(value);
        } catch (err) {
            return '[unprintable]';
        }
    };

    const logImpl = (...args) => {
        try {
            const joined = args.map(stringify).join(' ');
            global.__flyweb_log(joined);
        } catch (err) {
            // Swallow logging errors; console must never throw.
        }
    };

    if (typeof global.console !== 'object' || global.console === null) {
        global.console = {};
    }

    global.console.log = logImpl;
    global.console.error = logImpl;
    global.console.warn = logImpl;
    global.console.info = logImpl;
    global.console.debug = logImpl;
})();
"#;
