//! Closure-backed renderer for tests.
//!
//! Production hosts plug a real template engine into [`Renderer`];
//! tests register one closure per template id instead, keeping full
//! access to the [`RenderContext`] helpers.

use crate::template::{RenderContext, Renderer};
use jembe_types::JembeError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One registered template body.
pub type TemplateFn =
    Arc<dyn Fn(&mut RenderContext<'_>) -> Result<String, JembeError> + Send + Sync>;

/// In-memory renderer keyed by template id.
#[derive(Clone, Default)]
pub struct TestRenderer {
    templates: BTreeMap<String, TemplateFn>,
}

impl TestRenderer {
    /// Starts an empty renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template body.
    #[must_use]
    pub fn template<F>(mut self, id: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut RenderContext<'_>) -> Result<String, JembeError> + Send + Sync + 'static,
    {
        self.templates.insert(id.into(), Arc::new(body));
        self
    }
}

impl Renderer for TestRenderer {
    fn render(&self, template: &str, ctx: &mut RenderContext<'_>) -> Result<String, JembeError> {
        let body = self
            .templates
            .get(template)
            .ok_or_else(|| JembeError::NotFound(format!("no template {template:?}")))?;
        body(ctx)
    }
}
