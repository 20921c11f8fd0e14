//! Application facade.
//!
//! [`JembeApp`] ties a registry, a router, and a renderer together and
//! exposes the two request entry points the host adapter calls: full
//! pages and partial (header-marked) JSON requests. The host owns the
//! HTTP layer; this type owns everything between parsing and response
//! assembly.
//!
//! # Example
//!
//! ```no_run
//! use jembe_component::{ComponentDef, RegistryBuilder};
//! use jembe_runtime::{AppConfig, JembeApp};
//! # fn renderer() -> std::sync::Arc<dyn jembe_runtime::Renderer> { unimplemented!() }
//!
//! let registry = RegistryBuilder::new()
//!     .page(ComponentDef::new("cpage"))
//!     .build()?;
//! let app = JembeApp::new(registry, renderer(), AppConfig::default())?;
//! # Ok::<(), jembe_types::JembeError>(())
//! ```

use crate::command::XRequest;
use crate::processor::Processor;
use crate::response::{page_response, partial_response, PatchEntry};
use crate::router::Router;
use crate::template::Renderer;
use jembe_component::{Registry, RequestContext};
use jembe_types::{ErrorCode, JembeError};
use std::sync::Arc;

/// Name of the distinguishing AJAX header.
pub const X_JEMBE_HEADER: &str = "X-Jembe";

/// Application-level settings.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Mirrored into every [`RequestContext`]; components may render
    /// extra diagnostics when set.
    pub debug: bool,
}

/// A configured application: registry, routes, and renderer.
pub struct JembeApp {
    registry: Arc<Registry>,
    router: Router,
    renderer: Arc<dyn Renderer>,
    config: AppConfig,
}

impl JembeApp {
    /// Builds the app, deriving the route table from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::Internal`] on route collisions.
    pub fn new(
        registry: Registry,
        renderer: Arc<dyn Renderer>,
        config: AppConfig,
    ) -> Result<Self, JembeError> {
        let router = Router::build(&registry)?;
        Ok(Self {
            registry: Arc::new(registry),
            router,
            renderer,
            config,
        })
    }

    /// The registry backing this app.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The route table.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Creates the per-request context, mirroring app settings.
    #[must_use]
    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            session: serde_json::Map::new(),
            debug: self.config.debug,
        }
    }

    /// Serves a full-page GET.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::NotFound`] when no route matches and any
    /// error left unhandled by `_exception` listeners.
    pub fn handle_page(
        &self,
        path: &str,
        query: &str,
        request: RequestContext,
    ) -> Result<String, JembeError> {
        let mut matched = self
            .router
            .match_path(path)
            .ok_or_else(|| JembeError::NotFound(format!("no route for {path:?}")))?;
        self.router.apply_query(&self.registry, &mut matched, query);
        tracing::debug!(path, target = %matched.exec_name, "page request");

        let mut processor = Processor::new(&self.registry, self.renderer.as_ref(), request);
        processor.run_page(&matched)?;
        page_response(&processor)
    }

    /// Serves a partial (header-marked) request.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::BadRequest`] for malformed bodies and any
    /// error left unhandled by `_exception` listeners.
    pub fn handle_partial(
        &self,
        body: &str,
        request: RequestContext,
    ) -> Result<Vec<PatchEntry>, JembeError> {
        let parsed = XRequest::from_json(body)?;
        tracing::debug!(
            components = parsed.components.len(),
            commands = parsed.commands.len(),
            "partial request"
        );
        let mut processor = Processor::new(&self.registry, self.renderer.as_ref(), request);
        processor.run_partial(parsed)?;
        partial_response(&processor)
    }

    /// HTTP status for an error escaping the processor.
    #[must_use]
    pub fn error_status(err: &JembeError) -> u16 {
        err.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestRenderer;
    use jembe_component::{ComponentDef, RegistryBuilder};

    #[test]
    fn unknown_path_is_not_found() {
        let registry = RegistryBuilder::new()
            .page(ComponentDef::new("cpage"))
            .build()
            .expect("registry");
        let renderer = TestRenderer::new().template("cpage.html", |_| Ok("<div>hi</div>".into()));
        let app = JembeApp::new(registry, Arc::new(renderer), AppConfig::default())
            .expect("app");

        let err = app
            .handle_page("/nowhere", "", app.request_context())
            .expect_err("missing route");
        assert!(matches!(err, JembeError::NotFound(_)));
        assert_eq!(JembeApp::error_status(&err), 404);
    }
}
