//! Events exchanged between live components.
//!
//! An [`Event`] is a named notification sourced at one instance and
//! routed to every listener whose filters match. Emission is deferred:
//! events raised inside an action are dispatched only after the action
//! body completes.
//!
//! # System events
//!
//! Names starting with `_` are reserved for the processor:
//!
//! | Event | Fired |
//! |-------|-------|
//! | [`system::INITIALISING`] | before guard/inject on a non-speculative initialise |
//! | [`system::CALLED`] | before an action body runs |
//! | [`system::DISPLAY`] | once per instance per request, right after its DOM is recorded |
//! | [`system::EXCEPTION`] | when an initialise or action fails |

use jembe_types::ExecName;
use serde_json::{Map, Value};

/// Reserved system event names.
pub mod system {
    /// An instance is about to be initialised.
    pub const INITIALISING: &str = "_initialising";
    /// An action is about to be invoked; params: `action`.
    pub const CALLED: &str = "_called";
    /// An instance's DOM was recorded this request.
    pub const DISPLAY: &str = "_display";
    /// An initialise or action failed; params: `code`, `status`, `message`.
    pub const EXCEPTION: &str = "_exception";
}

/// A dispatched event.
///
/// Listeners receive the event mutably and may set [`handled`] to stop
/// `_exception` propagation; for application events the flag is
/// informational.
///
/// [`handled`]: Event::handled
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name; `_`-prefixed names are system events.
    pub name: String,
    /// Exec name of the emitting instance.
    pub source: ExecName,
    /// Free-form payload.
    pub params: Map<String, Value>,
    /// Set by a listener that has fully handled the event.
    pub handled: bool,
    /// Optional destination glob pattern (`emit(..).to(..)`); matched
    /// against candidate exec names relative to the source.
    pub to: Option<String>,
}

impl Event {
    /// Creates an event with an empty payload.
    #[must_use]
    pub fn new(name: impl Into<String>, source: ExecName) -> Self {
        Self {
            name: name.into(),
            source,
            params: Map::new(),
            handled: false,
            to: None,
        }
    }

    /// Adds a payload entry.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Restricts delivery to exec names matching `pattern`.
    #[must_use]
    pub fn with_to(mut self, pattern: impl Into<String>) -> Self {
        self.to = Some(pattern.into());
        self
    }

    /// Reads a payload entry.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// `true` for `_`-prefixed processor events.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// Builder for events emitted from action and listener bodies.
///
/// The source exec name is filled in by the runtime when the emit is
/// flushed, so application code never spells its own address:
///
/// ```
/// use jembe_component::EventEmit;
/// use serde_json::json;
///
/// let emit = EventEmit::new("increase")
///     .param("by", json!(2))
///     .to("/cpage/counter.a");
/// assert_eq!(emit.name(), "increase");
/// ```
#[derive(Debug, Clone)]
pub struct EventEmit {
    name: String,
    params: Map<String, Value>,
    to: Option<String>,
}

impl EventEmit {
    /// Starts an emit with the given event name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
            to: None,
        }
    }

    /// Adds a payload entry.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Restricts delivery to exec names matching `pattern`.
    #[must_use]
    pub fn to(mut self, pattern: impl Into<String>) -> Self {
        self.to = Some(pattern.into());
        self
    }

    /// The event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finalises into an [`Event`] sourced at `source`.
    #[must_use]
    pub fn into_event(self, source: ExecName) -> Event {
        Event {
            name: self.name,
            source,
            params: self.params,
            handled: false,
            to: self.to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn system_detection() {
        let src = ExecName::parse("/p").unwrap();
        assert!(Event::new(system::DISPLAY, src.clone()).is_system());
        assert!(!Event::new("increase", src).is_system());
    }

    #[test]
    fn emit_finalises_with_source() {
        let src = ExecName::parse("/cpage/counter.b").unwrap();
        let event = EventEmit::new("increase")
            .param("by", json!(1))
            .to("/cpage/counter.a")
            .into_event(src.clone());

        assert_eq!(event.name, "increase");
        assert_eq!(event.source, src);
        assert_eq!(event.param("by"), Some(&json!(1)));
        assert_eq!(event.to.as_deref(), Some("/cpage/counter.a"));
        assert!(!event.handled);
    }
}
