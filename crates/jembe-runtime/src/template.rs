//! Template collaborators.
//!
//! The processor does not bundle a template language; hosts implement
//! [`Renderer`] over whatever engine they use. During a render the
//! engine receives a [`RenderContext`], which exposes the instance's
//! state and the two composition helpers: [`RenderContext::component`]
//! and [`RenderContext::placeholder`].
//!
//! A [`ComponentRef`] is a single-use fluent value. Nothing happens
//! until it is finalised with [`ComponentRef::html`], which enqueues
//! the initialise/call pair and returns the placeholder markup; probes
//! like [`ComponentRef::is_accessible`] never commit anything. Because
//! `html` consumes the value, a ref cannot be reused across template
//! expansions.

use crate::command::Command;
use jembe_component::{ActionArgs, Instance, DISPLAY_ACTION};
use jembe_types::{ExecName, JembeError};
use serde_json::{Map, Value};

/// Host-provided template engine.
pub trait Renderer: Send + Sync {
    /// Renders `template` for the instance behind `ctx`.
    ///
    /// # Errors
    ///
    /// Implementations map missing templates and engine failures onto
    /// [`JembeError`] variants.
    fn render(&self, template: &str, ctx: &mut RenderContext<'_>) -> Result<String, JembeError>;
}

/// Processor services reachable from inside a template.
///
/// Passed explicitly; there is no ambient "current processor".
pub trait RenderServices {
    /// Speculatively initialises `exec_name` with the given params and
    /// reports whether access would succeed. Never commits an instance
    /// and never propagates the denial.
    fn is_accessible(&mut self, exec_name: &ExecName, params: &Map<String, Value>) -> bool;

    /// Browser URL for the component at `exec_name`, with `params`
    /// overriding its current or default state.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::NotFound`] for unregistered mount points.
    fn url_for(
        &mut self,
        exec_name: &ExecName,
        params: &Map<String, Value>,
    ) -> Result<String, JembeError>;
}

/// Everything a template sees while rendering one instance.
pub struct RenderContext<'a> {
    instance: &'a Instance,
    services: &'a mut dyn RenderServices,
    commands: Vec<Command>,
}

impl<'a> RenderContext<'a> {
    /// Creates a context for one render.
    #[must_use]
    pub fn new(instance: &'a Instance, services: &'a mut dyn RenderServices) -> Self {
        Self {
            instance,
            services,
            commands: Vec::new(),
        }
    }

    /// The instance being rendered.
    #[must_use]
    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Exec name of the instance being rendered.
    #[must_use]
    pub fn exec_name(&self) -> &ExecName {
        self.instance.exec_name()
    }

    /// Reads one state value.
    #[must_use]
    pub fn state(&self, key: &str) -> Option<&Value> {
        self.instance.state.get(key)
    }

    /// Starts a reference to the child component `name`.
    #[must_use]
    pub fn component(&mut self, name: impl Into<String>) -> ComponentRef<'a, '_> {
        ComponentRef {
            ctx: self,
            name: name.into(),
            key: String::new(),
            params: Map::new(),
            action: None,
        }
    }

    /// Emits a bare placeholder for child `name` without enqueuing its
    /// initialisation. The child appears only if something else summons
    /// it.
    #[must_use]
    pub fn placeholder(&self, name: &str) -> String {
        match self.exec_name().child(name, "") {
            Ok(exec) => placeholder_markup(&exec),
            Err(_) => String::new(),
        }
    }

    /// Commands enqueued by finalised component refs, in emission order.
    #[must_use]
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

/// Placeholder markup for one exec name.
#[must_use]
pub fn placeholder_markup(exec_name: &ExecName) -> String {
    format!("<div jmb-placeholder=\"{exec_name}\"></div>")
}

/// Single-use fluent reference to a child component.
pub struct ComponentRef<'a, 'c> {
    ctx: &'c mut RenderContext<'a>,
    name: String,
    key: String,
    params: Map<String, Value>,
    action: Option<(String, ActionArgs)>,
}

impl ComponentRef<'_, '_> {
    /// Sets the instance key.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Adds an init param.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Overrides the default display action.
    #[must_use]
    pub fn call(mut self, action: impl Into<String>, args: ActionArgs) -> Self {
        self.action = Some((action.into(), args));
        self
    }

    fn exec_name(&self) -> Result<ExecName, JembeError> {
        self.ctx.exec_name().child(&self.name, &self.key)
    }

    /// Probes whether initialising this child would pass its guard.
    ///
    /// The probe is speculative: no instance is committed and access
    /// denials are swallowed into `false`.
    #[must_use]
    pub fn is_accessible(&mut self) -> bool {
        match self.exec_name() {
            Ok(exec) => self.ctx.services.is_accessible(&exec, &self.params),
            Err(_) => false,
        }
    }

    /// Browser URL for navigating to this child.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::NotFound`] for unregistered mount points
    /// and [`JembeError::InvalidName`] for malformed names.
    pub fn url(&mut self) -> Result<String, JembeError> {
        let exec = self.exec_name()?;
        self.ctx.services.url_for(&exec, &self.params)
    }

    /// Client-side directive calling this child's action.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] for malformed names.
    pub fn jrl(&self) -> Result<String, JembeError> {
        let exec = self.exec_name()?;
        let (action, args) = match &self.action {
            Some((action, args)) => (action.as_str(), args.clone()),
            None => (DISPLAY_ACTION, ActionArgs::empty()),
        };
        let mut call_args = vec![Value::String(action.to_string())];
        call_args.extend(args.args.iter().cloned());
        if !args.kwargs.is_empty() {
            call_args.push(Value::Object(args.kwargs.clone()));
        }
        let rendered: Vec<String> = call_args
            .iter()
            .map(|v| match v {
                Value::String(s) => format!("'{s}'"),
                other => other.to_string(),
            })
            .collect();
        Ok(format!(
            "$jmb.component('{exec}').call({})",
            rendered.join(", ")
        ))
    }

    /// Finalises the reference: enqueues the initialise/call pair and
    /// returns the placeholder markup to splice into the parent's DOM.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::InvalidName`] for malformed names.
    pub fn html(self) -> Result<String, JembeError> {
        let exec = self.exec_name()?;
        let (action, args) = match self.action {
            Some((action, args)) => (action, args),
            None => (DISPLAY_ACTION.to_string(), ActionArgs::empty()),
        };
        self.ctx.commands.push(Command::Init {
            target: exec.clone(),
            params: self.params,
            merge_existing: true,
        });
        self.ctx.commands.push(Command::Call {
            target: exec.clone(),
            action,
            args,
        });
        Ok(placeholder_markup(&exec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jembe_component::{ComponentDef, InitSources, RegistryBuilder, RequestContext};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    struct NoServices;

    impl RenderServices for NoServices {
        fn is_accessible(&mut self, _: &ExecName, _: &Map<String, Value>) -> bool {
            false
        }

        fn url_for(
            &mut self,
            exec_name: &ExecName,
            _: &Map<String, Value>,
        ) -> Result<String, JembeError> {
            Ok(exec_name.to_string())
        }
    }

    fn page_instance() -> Instance {
        let registry = RegistryBuilder::new()
            .page(ComponentDef::new("cpage"))
            .build()
            .expect("registry");
        let config = Arc::clone(registry.lookup_str("/cpage").expect("page"));
        Instance::build(
            config,
            ExecName::parse("/cpage").expect("exec"),
            &InitSources::default(),
            &RequestContext::default(),
        )
        .expect("build")
    }

    #[test]
    fn html_enqueues_init_and_call() {
        let instance = page_instance();
        let mut services = NoServices;
        let mut ctx = RenderContext::new(&instance, &mut services);

        let markup = ctx
            .component("counter")
            .key("first")
            .param("value", json!(0))
            .html()
            .expect("html");

        assert_eq!(
            markup,
            "<div jmb-placeholder=\"/cpage/counter.first\"></div>"
        );
        let commands = ctx.take_commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(&commands[0], Command::Init { target, .. }
            if target.as_str() == "/cpage/counter.first"));
        assert!(matches!(&commands[1], Command::Call { action, .. }
            if action == "display"));
    }

    #[test]
    fn inaccessible_probe_enqueues_nothing() {
        let instance = page_instance();
        let mut services = NoServices;
        let mut ctx = RenderContext::new(&instance, &mut services);

        let accessible = ctx.component("delete").param("task_id", json!(999)).is_accessible();
        assert!(!accessible);
        assert!(ctx.take_commands().is_empty());
    }

    #[test]
    fn placeholder_helper_does_not_enqueue() {
        let instance = page_instance();
        let mut services = NoServices;
        let mut ctx = RenderContext::new(&instance, &mut services);

        let markup = ctx.placeholder("modal");
        assert_eq!(markup, "<div jmb-placeholder=\"/cpage/modal\"></div>");
        assert!(ctx.take_commands().is_empty());
    }

    #[test]
    fn jrl_directive_spells_the_call() {
        let instance = page_instance();
        let mut services = NoServices;
        let mut ctx = RenderContext::new(&instance, &mut services);

        let jrl = ctx
            .component("edit")
            .key("5")
            .call("save", ActionArgs::empty())
            .jrl()
            .expect("jrl");
        assert_eq!(jrl, "$jmb.component('/cpage/edit.5').call('save')");
    }
}
