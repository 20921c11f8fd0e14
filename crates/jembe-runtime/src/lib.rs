//! Server-side component runtime: request processing, event dispatch,
//! routing, and response assembly.
//!
//! The shape of a request through this crate:
//!
//! ```text
//!   host adapter
//!        │  path / JSON body
//!        ▼
//!   JembeApp ──▶ Router ──▶ Processor ──▶ Response builder
//!                              │
//!                  command queue over live instances
//!                  (initialise / call action / emit)
//! ```
//!
//! Everything is per request; state lives with the client between
//! requests. Descriptors and the registry come from `jembe-component`.

pub mod app;
pub mod command;
pub mod matcher;
pub mod processor;
pub mod response;
pub mod router;
pub mod template;
pub mod testing;
pub mod upload;

pub use app::{AppConfig, JembeApp, X_JEMBE_HEADER};
pub use command::{Command, WireCommand, WireComponent, XRequest};
pub use matcher::{glob_match, Matcher};
pub use processor::Processor;
pub use response::{page_response, partial_response, PatchEntry};
pub use router::{url_of, RouteMatch, Router};
pub use template::{placeholder_markup, ComponentRef, RenderContext, RenderServices, Renderer};
pub use testing::{TemplateFn, TestRenderer};
pub use upload::{handle_upload, FileStorage, StoredFile, UploadPart, UploadResponse, UPLOAD_MARKER};
