//! Contexts handed to action and listener bodies.
//!
//! Application code never touches the processor directly; it receives
//! narrow capability values instead: [`ActionArgs`] for call arguments,
//! [`ActionCtx`] for deferred event emission and host request data.

use crate::event::{Event, EventEmit};
use jembe_types::{ExecName, JembeError};
use serde_json::{Map, Value};

/// Opaque per-request data maintained by the host.
///
/// The processor passes it through untouched; components may read the
/// session bag but the core never interprets it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Host-maintained session bag.
    pub session: Map<String, Value>,
    /// Debug mode, mirrored from the application config.
    pub debug: bool,
}

/// Positional and keyword arguments of a `CallAction` command.
#[derive(Debug, Clone, Default)]
pub struct ActionArgs {
    /// Positional arguments, in wire order.
    pub args: Vec<Value>,
    /// Keyword arguments.
    pub kwargs: Map<String, Value>,
}

impl ActionArgs {
    /// Creates empty arguments (plain `display` calls).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Positional argument at `idx`.
    #[must_use]
    pub fn arg(&self, idx: usize) -> Option<&Value> {
        self.args.get(idx)
    }

    /// Keyword argument by name.
    #[must_use]
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    /// Keyword argument as `i64`, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::BadRequest`] when present but not an integer.
    pub fn kwarg_i64(&self, name: &str, default: i64) -> Result<i64, JembeError> {
        match self.kwargs.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| JembeError::BadRequest(format!("kwarg {name:?} must be an integer"))),
        }
    }
}

/// Per-invocation context for actions and listeners.
///
/// Events emitted here are buffered and dispatched by the processor
/// only after the enclosing body returns.
#[derive(Debug)]
pub struct ActionCtx<'r> {
    owner: ExecName,
    request: &'r RequestContext,
    emits: Vec<Event>,
}

impl<'r> ActionCtx<'r> {
    /// Creates a context for the given instance.
    #[must_use]
    pub fn new(owner: ExecName, request: &'r RequestContext) -> Self {
        Self {
            owner,
            request,
            emits: Vec::new(),
        }
    }

    /// Host request data (session bag, debug flag).
    #[must_use]
    pub fn request(&self) -> &RequestContext {
        self.request
    }

    /// Buffers an event sourced at the owning instance.
    pub fn emit(&mut self, emit: EventEmit) {
        self.emits.push(emit.into_event(self.owner.clone()));
    }

    /// Drains the buffered events; called by the processor after the
    /// body returns.
    #[must_use]
    pub fn take_emits(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.emits)
    }
}

/// What an action body asks the processor to do next.
///
/// Either a rendered string, an explicit "do not redisplay", or the
/// default "enqueue display unless already rendered".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action rendered its own DOM; record it as this instance's
    /// output and fire `_display`.
    Dom(String),
    /// Enqueue `display` unless the instance already rendered this
    /// request. The usual outcome of state-mutating actions.
    Display,
    /// Explicit non-redisplay; suppress any enqueued display.
    Suppress,
}

/// What a listener body asks the processor to do for its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    /// Force a redisplay of the owner.
    Display,
    /// Explicitly suppress the owner's redisplay this request.
    Suppress,
    /// Replace the owner's DOM with the given string.
    Dom(String),
    /// No opinion; the redisplay policy decides.
    Pass,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_are_buffered_until_taken() {
        let request = RequestContext::default();
        let owner = ExecName::parse("/cpage/counter").unwrap();
        let mut ctx = ActionCtx::new(owner.clone(), &request);

        ctx.emit(EventEmit::new("increase").param("by", json!(1)));
        ctx.emit(EventEmit::new("saved"));

        let emits = ctx.take_emits();
        assert_eq!(emits.len(), 2);
        assert_eq!(emits[0].source, owner);
        assert_eq!(emits[0].name, "increase");
        assert!(ctx.take_emits().is_empty());
    }

    #[test]
    fn kwarg_i64_defaults_and_rejects() {
        let mut args = ActionArgs::empty();
        args.kwargs.insert("by".into(), json!(3));
        assert_eq!(args.kwarg_i64("by", 1).unwrap(), 3);
        assert_eq!(args.kwarg_i64("missing", 1).unwrap(), 1);

        args.kwargs.insert("by".into(), json!("x"));
        assert!(args.kwarg_i64("by", 1).is_err());
    }
}
