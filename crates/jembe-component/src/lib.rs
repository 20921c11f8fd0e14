//! Component model: descriptors, instances, events, and listeners.
//!
//! This crate defines *what a component is*; driving components through
//! a request lives in `jembe-runtime`. The shape of the model:
//!
//! ```text
//!   ComponentDef ──(RegistryBuilder::build)──▶ ComponentConfig
//!        │                                          │
//!        │ builder-side description                 │ bound at a mount
//!        │ (state params, children,                 │ point, immutable,
//!        │  actions, listeners, policies)           │ shared via Arc
//!        │                                          ▼
//!        └──────────────────────────────▶ Instance (per request)
//! ```
//!
//! Everything is declared explicitly on the builder; there is no
//! reflection and no registration side effects at import time.

pub mod config;
pub mod context;
pub mod event;
pub mod instance;
pub mod listener;
pub mod redisplay;
pub mod registry;

pub use config::{
    ActionDef, ActionFn, ChildMount, ComponentConfig, ComponentDef, GuardFn, InjectChildrenFn,
    InjectFn, StateParam, UrlParam, DISPLAY_ACTION,
};
pub use context::{ActionArgs, ActionCtx, ActionOutcome, ListenerOutcome, RequestContext};
pub use event::{system, Event, EventEmit};
pub use instance::{InitSources, Instance};
pub use listener::{ListenerDef, ListenerFn, Relation};
pub use redisplay::Redisplay;
pub use registry::{Registry, RegistryBuilder};
