//! Foundation types for the Jembe component runtime.
//!
//! This crate is the bottom layer of the workspace:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  jembe-runtime   : processor, router, response, templates   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  jembe-component : descriptors, instances, events, registry │
//! ├─────────────────────────────────────────────────────────────┤
//! │  jembe-types     : names, state, params, errors  ◄── HERE   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`name`] | [`FullName`]/[`ExecName`] path model |
//! | [`state`] | closed-shape per-instance [`ComponentState`] |
//! | [`param`] | typed dump/load with coercions, [`ParamSupport`] hook |
//! | [`error`] | [`JembeError`] with stable codes and HTTP mapping |

pub mod error;
pub mod name;
pub mod param;
pub mod state;

pub use error::{assert_error_codes, ErrorCode, JembeError};
pub use name::{ExecName, FullName, Segment};
pub use param::{dump_record, load_record, ParamSupport, ParamType};
pub use state::ComponentState;
