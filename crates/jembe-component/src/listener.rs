//! Listener bindings.
//!
//! A listener binds a handler to `(event name filter, source patterns,
//! relation filter)`. Glob matching of source patterns lives in the
//! runtime's matcher; this module carries the binding itself plus the
//! structural [`Relation`] filter, which is applied after the glob.

use crate::context::{ActionCtx, ListenerOutcome};
use crate::event::Event;
use crate::instance::Instance;
use jembe_types::{ExecName, JembeError};
use std::fmt;
use std::sync::Arc;

/// Handler invoked when an event matches the binding.
pub type ListenerFn = Arc<
    dyn Fn(&mut Instance, &mut Event, &mut ActionCtx<'_>) -> Result<ListenerOutcome, JembeError>
        + Send
        + Sync,
>;

/// Structural constraint between the listener owner and the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Source is a direct child of the owner.
    Child,
    /// Source is any strict descendant of the owner.
    Children,
    /// Source is the direct parent of the owner.
    Parent,
    /// Source is any strict ancestor of the owner.
    Parents,
    /// Source shares the owner's parent and is a different instance.
    Siblings,
}

impl Relation {
    /// Tests the relation with the listener owner on the left.
    #[must_use]
    pub fn matches(&self, owner: &ExecName, source: &ExecName) -> bool {
        match self {
            Self::Child => owner.is_direct_child(source),
            Self::Children => owner.is_ancestor_of(source),
            Self::Parent => source.is_direct_child(owner),
            Self::Parents => source.is_ancestor_of(owner),
            Self::Siblings => owner != source && owner.parent() == source.parent(),
        }
    }
}

/// One listener binding on a component descriptor.
#[derive(Clone)]
pub struct ListenerDef {
    /// Event names this listener accepts; empty means any name.
    pub event_names: Vec<String>,
    /// Source glob patterns (matcher semantics); empty means any source.
    pub sources: Vec<String>,
    /// Optional structural filter applied after the glob.
    pub relation: Option<Relation>,
    /// The handler.
    pub handler: ListenerFn,
}

impl ListenerDef {
    /// `true` when the binding accepts the given event name.
    #[must_use]
    pub fn accepts_name(&self, name: &str) -> bool {
        self.event_names.is_empty() || self.event_names.iter().any(|n| n == name)
    }
}

impl fmt::Debug for ListenerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerDef")
            .field("event_names", &self.event_names)
            .field("sources", &self.sources)
            .field("relation", &self.relation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(s: &str) -> ExecName {
        ExecName::parse(s).unwrap()
    }

    #[test]
    fn child_and_children() {
        let owner = e("/page");
        assert!(Relation::Child.matches(&owner, &e("/page/counter.a")));
        assert!(!Relation::Child.matches(&owner, &e("/page/box/counter")));
        assert!(Relation::Children.matches(&owner, &e("/page/box/counter")));
        assert!(!Relation::Children.matches(&owner, &owner));
    }

    #[test]
    fn parent_and_parents() {
        let owner = e("/page/box/counter");
        assert!(Relation::Parent.matches(&owner, &e("/page/box")));
        assert!(!Relation::Parent.matches(&owner, &e("/page")));
        assert!(Relation::Parents.matches(&owner, &e("/page")));
        assert!(!Relation::Parents.matches(&owner, &e("/other")));
    }

    #[test]
    fn siblings_share_parent() {
        let owner = e("/page/counter.a");
        assert!(Relation::Siblings.matches(&owner, &e("/page/counter.b")));
        assert!(Relation::Siblings.matches(&owner, &e("/page/title")));
        assert!(!Relation::Siblings.matches(&owner, &owner));
        assert!(!Relation::Siblings.matches(&owner, &e("/page")));
    }
}
