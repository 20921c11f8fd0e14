//! Component descriptors.
//!
//! A [`ComponentDef`] is the builder-side description of a component
//! class: its state params, children, actions, listeners, and policies.
//! Registry build *binds* each def at its mount point, producing an
//! immutable [`ComponentConfig`] with a resolved full name, template,
//! and URL param identifiers. The same def mounted twice yields two
//! configs with distinct full names.
//!
//! Configuration is explicit throughout: there is no signature
//! reflection and no import-time registration. What the builder is
//! told is exactly what the descriptor contains.
//!
//! # Example
//!
//! ```
//! use jembe_component::{ActionOutcome, ComponentDef};
//! use jembe_types::ParamType;
//! use serde_json::json;
//!
//! let counter = ComponentDef::new("counter")
//!     .state_param_default("value", ParamType::Int, json!(0))
//!     .action("increase", |inst, _args, _ctx| {
//!         let value = inst.state.get_i64("value").unwrap_or(0) + 1;
//!         inst.state.set("value", json!(value))?;
//!         Ok(ActionOutcome::Display)
//!     });
//!
//! let page = ComponentDef::new("cpage").child(counter);
//! ```

use crate::context::{ActionArgs, ActionCtx, ActionOutcome, RequestContext};
use crate::instance::Instance;
use crate::listener::{ListenerDef, ListenerFn, Relation};
use crate::redisplay::Redisplay;
use jembe_types::{FullName, JembeError, ParamType};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Handler for a named action.
pub type ActionFn = Arc<
    dyn Fn(&mut Instance, &ActionArgs, &mut ActionCtx<'_>) -> Result<ActionOutcome, JembeError>
        + Send
        + Sync,
>;

/// Access guard run after instance construction.
///
/// Returning an access-denial error ([`JembeError::is_access_denial`])
/// denies the component; under speculative initialisation the denial
/// becomes a plain `false` accessibility answer.
pub type GuardFn = Arc<dyn Fn(&Instance, &RequestContext) -> Result<(), JembeError> + Send + Sync>;

/// Server-side param injection, run on every initialise.
pub type InjectFn = Arc<dyn Fn(&RequestContext) -> Map<String, Value> + Send + Sync>;

/// Param injection applied when initialising any descendant.
pub type InjectChildrenFn =
    Arc<dyn Fn(&Instance, &RequestContext) -> Map<String, Value> + Send + Sync>;

/// The action name invoked when a component is (re)rendered.
pub const DISPLAY_ACTION: &str = "display";

/// One state param of a component.
#[derive(Debug, Clone)]
pub struct StateParam {
    /// Param name; also the state key.
    pub name: String,
    /// Declared wire type.
    pub ty: ParamType,
    /// Default value; params without one are required at initialise.
    pub default: Option<Value>,
    /// Computed by `inject()`; never serialised to or accepted from
    /// the client.
    pub injected: bool,
}

/// One URL path param of a component (a typed route segment).
#[derive(Debug, Clone)]
pub struct UrlParam {
    /// State param it feeds.
    pub name: String,
    /// One of the URL types: string, int, float, uuid, path.
    pub ty: ParamType,
    /// Route identifier: the name at level 0, `name.N` deeper.
    pub identifier: String,
}

/// Configuration of one action.
#[derive(Clone)]
pub struct ActionDef {
    /// Run after the non-deferred backlog drains.
    pub deferred: bool,
    /// Among deferred actions of this component, run after the named one.
    pub deferred_after: Option<String>,
    /// Among deferred actions of this component, run before the named one.
    pub deferred_before: Option<String>,
    /// The handler.
    pub handler: ActionFn,
}

impl fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDef")
            .field("deferred", &self.deferred)
            .field("deferred_after", &self.deferred_after)
            .field("deferred_before", &self.deferred_before)
            .finish_non_exhaustive()
    }
}

/// Builder-side description of a component class.
#[derive(Clone, Default)]
pub struct ComponentDef {
    name: String,
    template: Option<String>,
    state_params: Vec<StateParam>,
    url_param_names: Vec<String>,
    children: Vec<(ComponentDef, Map<String, Value>)>,
    redisplay: Option<Redisplay>,
    changes_url: Option<bool>,
    query_params: Vec<(String, String)>,
    actions: BTreeMap<String, ActionDef>,
    listeners: Vec<ListenerDef>,
    inject: Option<InjectFn>,
    inject_into_children: Option<InjectChildrenFn>,
    guard: Option<GuardFn>,
}

impl ComponentDef {
    /// Starts a def for a component named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Overrides the template identifier (default is derived from the
    /// mount point: `/cpage/counter` renders `cpage/counter.html`).
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Adds a required state param.
    #[must_use]
    pub fn state_param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.state_params.push(StateParam {
            name: name.into(),
            ty,
            default: None,
            injected: false,
        });
        self
    }

    /// Adds a state param with a default value.
    #[must_use]
    pub fn state_param_default(
        mut self,
        name: impl Into<String>,
        ty: ParamType,
        default: Value,
    ) -> Self {
        self.state_params.push(StateParam {
            name: name.into(),
            ty,
            default: Some(default),
            injected: false,
        });
        self
    }

    /// Adds an injected param: computed server-side by `inject()` on
    /// every request, invisible on the wire.
    #[must_use]
    pub fn injected_param(mut self, name: impl Into<String>) -> Self {
        self.state_params.push(StateParam {
            name: name.into(),
            ty: ParamType::Json,
            default: Some(Value::Null),
            injected: true,
        });
        self
    }

    /// Adds a required state param that is also a typed URL segment.
    #[must_use]
    pub fn url_param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        let name = name.into();
        self.url_param_names.push(name.clone());
        self.state_params.push(StateParam {
            name,
            ty,
            default: None,
            injected: false,
        });
        self
    }

    /// Mounts a child component.
    #[must_use]
    pub fn child(mut self, def: ComponentDef) -> Self {
        self.children.push((def, Map::new()));
        self
    }

    /// Mounts a child with param-default overrides applied at its
    /// initialisation.
    #[must_use]
    pub fn child_with_defaults(mut self, def: ComponentDef, defaults: Map<String, Value>) -> Self {
        self.children.push((def, defaults));
        self
    }

    /// Sets the redisplay policy (default: `WHEN_STATE_CHANGED`).
    #[must_use]
    pub fn redisplay(mut self, policy: Redisplay) -> Self {
        self.redisplay = Some(policy);
        self
    }

    /// Sets whether this component contributes to the browser URL
    /// (default: `true`).
    #[must_use]
    pub fn changes_url(mut self, flag: bool) -> Self {
        self.changes_url = Some(flag);
        self
    }

    /// Aliases a short query key to a state param.
    #[must_use]
    pub fn query_param(mut self, short: impl Into<String>, param: impl Into<String>) -> Self {
        self.query_params.push((short.into(), param.into()));
        self
    }

    /// Registers an action.
    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Instance, &ActionArgs, &mut ActionCtx<'_>) -> Result<ActionOutcome, JembeError>
            + Send
            + Sync
            + 'static,
    {
        self.actions.insert(
            name.into(),
            ActionDef {
                deferred: false,
                deferred_after: None,
                deferred_before: None,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Registers an action that runs after the non-deferred backlog
    /// drains.
    #[must_use]
    pub fn deferred_action<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Instance, &ActionArgs, &mut ActionCtx<'_>) -> Result<ActionOutcome, JembeError>
            + Send
            + Sync
            + 'static,
    {
        self.action_def(
            name,
            ActionDef {
                deferred: true,
                deferred_after: None,
                deferred_before: None,
                handler: Arc::new(handler),
            },
        )
    }

    /// Registers an action with full ordering configuration.
    #[must_use]
    pub fn action_def(mut self, name: impl Into<String>, def: ActionDef) -> Self {
        self.actions.insert(name.into(), def);
        self
    }

    /// Registers a listener.
    ///
    /// `event_names` empty means any name; `sources` empty means any
    /// source; `relation` further constrains after the glob match.
    #[must_use]
    pub fn listener<F>(
        mut self,
        event_names: &[&str],
        sources: &[&str],
        relation: Option<Relation>,
        handler: F,
    ) -> Self
    where
        F: Fn(
                &mut Instance,
                &mut crate::event::Event,
                &mut ActionCtx<'_>,
            ) -> Result<crate::context::ListenerOutcome, JembeError>
            + Send
            + Sync
            + 'static,
    {
        self.listeners.push(ListenerDef {
            event_names: event_names.iter().map(ToString::to_string).collect(),
            sources: sources.iter().map(ToString::to_string).collect(),
            relation,
            handler: Arc::new(handler) as ListenerFn,
        });
        self
    }

    /// Sets the per-request injection hook.
    #[must_use]
    pub fn inject<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.inject = Some(Arc::new(hook));
        self
    }

    /// Sets the hook whose params apply to every descendant's
    /// initialisation (transitive; nearer ancestors win).
    #[must_use]
    pub fn inject_into_children<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance, &RequestContext) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.inject_into_children = Some(Arc::new(hook));
        self
    }

    /// Sets the access guard.
    #[must_use]
    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Instance, &RequestContext) -> Result<(), JembeError> + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Binds this def at a mount point, recursively binding children.
    ///
    /// `level` is the depth of the mount (0 for pages); it feeds URL
    /// param identifiers (`name` at level 0, `name.N` deeper).
    ///
    /// # Errors
    ///
    /// Returns a config error for invalid names, non-URL param types in
    /// URL position, duplicate children, unresolved deferred ordering
    /// references, or deferred ordering cycles.
    pub(crate) fn bind(
        self,
        parent: Option<&FullName>,
        level: usize,
    ) -> Result<Arc<ComponentConfig>, JembeError> {
        let full_name = match parent {
            Some(p) => p.child(&self.name)?,
            None => FullName::page(&self.name)?,
        };
        if self.name.starts_with('_') {
            return Err(JembeError::Internal(format!(
                "component name {:?} must not start with '_'",
                self.name
            )));
        }

        let mut seen = BTreeSet::new();
        for param in &self.state_params {
            if param.name.starts_with('_') || param.name.is_empty() {
                return Err(JembeError::Internal(format!(
                    "{full_name}: state param {:?} is reserved (leading underscore) or empty",
                    param.name
                )));
            }
            if !seen.insert(param.name.clone()) {
                return Err(JembeError::Internal(format!(
                    "{full_name}: duplicate state param {:?}",
                    param.name
                )));
            }
            if let Some(default) = &param.default {
                if !default.is_null() {
                    param.ty.load(&param.name, default).map_err(|err| {
                        JembeError::Internal(format!("{full_name}: bad default: {err}"))
                    })?;
                }
            }
        }

        let mut url_params = Vec::new();
        for (pos, name) in self.url_param_names.iter().enumerate() {
            let param = self
                .state_params
                .iter()
                .find(|p| &p.name == name)
                .ok_or_else(|| {
                    JembeError::Internal(format!("{full_name}: unknown url param {name:?}"))
                })?;
            if !param.ty.is_url_type() {
                return Err(JembeError::UnsupportedParamType {
                    param: name.clone(),
                    type_name: format!("{:?} (url params are string/int/float/uuid/path)", param.ty),
                });
            }
            // Only the final param may swallow the rest of the path.
            if param.ty == ParamType::UrlPath && pos + 1 != self.url_param_names.len() {
                return Err(JembeError::Internal(format!(
                    "{full_name}: path param {name:?} must be last"
                )));
            }
            let identifier = if level == 0 {
                name.clone()
            } else {
                format!("{name}.{level}")
            };
            url_params.push(UrlParam {
                name: name.clone(),
                ty: param.ty.clone(),
                identifier,
            });
        }

        for (short, param) in &self.query_params {
            if !self.state_params.iter().any(|p| &p.name == param) {
                return Err(JembeError::Internal(format!(
                    "{full_name}: query param {short:?} aliases unknown state param {param:?}"
                )));
            }
        }

        let deferred_order = deferred_order(&full_name, &self.actions)?;

        let mut children = BTreeMap::new();
        for (child_def, defaults) in self.children {
            let child_name = child_def.name.clone();
            let bound = child_def.bind(Some(&full_name), level + 1)?;
            if children
                .insert(child_name.clone(), ChildMount { config: bound, defaults })
                .is_some()
            {
                return Err(JembeError::Internal(format!(
                    "{full_name}: duplicate child {child_name:?}"
                )));
            }
        }

        let template = self
            .template
            .unwrap_or_else(|| format!("{}.html", &full_name.as_str()[1..]));

        Ok(Arc::new(ComponentConfig {
            name: self.name,
            full_name,
            template,
            state_params: self.state_params,
            url_params,
            children,
            redisplay: self.redisplay.unwrap_or_default(),
            changes_url: self.changes_url.unwrap_or(true),
            query_params: self.query_params,
            actions: self.actions,
            deferred_order,
            listeners: self.listeners,
            inject: self.inject,
            inject_into_children: self.inject_into_children,
            guard: self.guard,
        }))
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Topological order of the deferred actions, honoring
/// `deferred_after`/`deferred_before`. Cycles are a configuration error.
fn deferred_order(
    full_name: &FullName,
    actions: &BTreeMap<String, ActionDef>,
) -> Result<Vec<String>, JembeError> {
    let deferred: Vec<&String> = actions
        .iter()
        .filter(|(_, a)| a.deferred)
        .map(|(n, _)| n)
        .collect();
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut indegree: BTreeMap<&str, usize> = deferred.iter().map(|n| (n.as_str(), 0)).collect();

    let mut check = |target: &String| -> Result<(), JembeError> {
        if !deferred.iter().any(|n| *n == target) {
            return Err(JembeError::Internal(format!(
                "{full_name}: deferred ordering references unknown deferred action {target:?}"
            )));
        }
        Ok(())
    };
    for (name, action) in actions.iter().filter(|(_, a)| a.deferred) {
        if let Some(after) = &action.deferred_after {
            check(after)?;
            edges.entry(after.as_str()).or_default().push(name.as_str());
            *indegree.entry(name.as_str()).or_default() += 1;
        }
        if let Some(before) = &action.deferred_before {
            check(before)?;
            edges.entry(name.as_str()).or_default().push(before.as_str());
            *indegree.entry(before.as_str()).or_default() += 1;
        }
    }

    // Kahn's algorithm; BTreeMap iteration keeps ties deterministic.
    let mut ready: Vec<&str> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    let mut order = Vec::with_capacity(deferred.len());
    while let Some(name) = ready.pop() {
        order.push(name.to_string());
        for next in edges.get(name).into_iter().flatten() {
            let d = indegree
                .get_mut(next)
                .ok_or_else(|| JembeError::Internal(format!("{full_name}: broken order graph")))?;
            *d -= 1;
            if *d == 0 {
                ready.push(next);
            }
        }
        ready.sort_unstable();
    }
    if order.len() != deferred.len() {
        return Err(JembeError::Internal(format!(
            "{full_name}: deferred action ordering cycle"
        )));
    }
    Ok(order)
}

/// A child descriptor plus the param defaults its mount point applies.
#[derive(Debug, Clone)]
pub struct ChildMount {
    /// The bound child descriptor.
    pub config: Arc<ComponentConfig>,
    /// Param defaults applied at the child's initialisation.
    pub defaults: Map<String, Value>,
}

/// Immutable, bound descriptor of a component class at one mount point.
#[derive(Clone)]
pub struct ComponentConfig {
    name: String,
    full_name: FullName,
    template: String,
    state_params: Vec<StateParam>,
    url_params: Vec<UrlParam>,
    children: BTreeMap<String, ChildMount>,
    redisplay: Redisplay,
    changes_url: bool,
    query_params: Vec<(String, String)>,
    actions: BTreeMap<String, ActionDef>,
    deferred_order: Vec<String>,
    listeners: Vec<ListenerDef>,
    inject: Option<InjectFn>,
    inject_into_children: Option<InjectChildrenFn>,
    guard: Option<GuardFn>,
}

impl ComponentConfig {
    /// Component name within its parent.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mount-point full name.
    #[must_use]
    pub fn full_name(&self) -> &FullName {
        &self.full_name
    }

    /// Template identifier handed to the renderer.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Declared state params.
    #[must_use]
    pub fn state_params(&self) -> &[StateParam] {
        &self.state_params
    }

    /// Looks up one state param.
    #[must_use]
    pub fn state_param(&self, name: &str) -> Option<&StateParam> {
        self.state_params.iter().find(|p| p.name == name)
    }

    /// Typed URL path params, in route order.
    #[must_use]
    pub fn url_params(&self) -> &[UrlParam] {
        &self.url_params
    }

    /// Child mounts by name.
    #[must_use]
    pub fn children(&self) -> &BTreeMap<String, ChildMount> {
        &self.children
    }

    /// Redisplay policy.
    #[must_use]
    pub fn redisplay(&self) -> Redisplay {
        self.redisplay
    }

    /// Whether this component contributes to the browser URL.
    #[must_use]
    pub fn changes_url(&self) -> bool {
        self.changes_url
    }

    /// Query-key ↔ state-param aliases, `(short, param)` pairs.
    #[must_use]
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    /// Looks up an action.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.get(name)
    }

    /// Topological order for this component's deferred actions.
    #[must_use]
    pub fn deferred_order(&self) -> &[String] {
        &self.deferred_order
    }

    /// Listener bindings.
    #[must_use]
    pub fn listeners(&self) -> &[ListenerDef] {
        &self.listeners
    }

    /// Runs the access guard, if any.
    ///
    /// # Errors
    ///
    /// Propagates whatever the guard raises; access-denial variants are
    /// given special treatment by the processor.
    pub fn run_guard(
        &self,
        instance: &Instance,
        request: &RequestContext,
    ) -> Result<(), JembeError> {
        match &self.guard {
            Some(guard) => guard(instance, request),
            None => Ok(()),
        }
    }

    /// Runs `inject()`, returning the injected param values.
    #[must_use]
    pub fn run_inject(&self, request: &RequestContext) -> Map<String, Value> {
        match &self.inject {
            Some(hook) => hook(request),
            None => Map::new(),
        }
    }

    /// Runs `inject_into_children()` on this instance, if configured.
    #[must_use]
    pub fn run_inject_into_children(
        &self,
        instance: &Instance,
        request: &RequestContext,
    ) -> Map<String, Value> {
        match &self.inject_into_children {
            Some(hook) => hook(instance, request),
            None => Map::new(),
        }
    }

    /// This component's contribution to the route, as a pattern:
    /// `/name{key}` plus one `/{type:identifier}` per URL param.
    #[must_use]
    pub fn url_path(&self) -> String {
        let mut path = format!("/{}{{key}}", self.name);
        for p in &self.url_params {
            path.push_str(&format!("/{{{:?}:{}}}", p.ty, p.identifier));
        }
        path
    }
}

impl fmt::Debug for ComponentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentConfig")
            .field("full_name", &self.full_name)
            .field("template", &self.template)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("changes_url", &self.changes_url)
            .field("redisplay", &self.redisplay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bind_page(def: ComponentDef) -> Arc<ComponentConfig> {
        def.bind(None, 0).unwrap()
    }

    #[test]
    fn bind_resolves_full_names_and_templates() {
        let page = bind_page(
            ComponentDef::new("cpage").child(
                ComponentDef::new("counter").state_param_default("value", ParamType::Int, json!(0)),
            ),
        );

        assert_eq!(page.full_name().as_str(), "/cpage");
        assert_eq!(page.template(), "cpage.html");

        let counter = &page.children()["counter"].config;
        assert_eq!(counter.full_name().as_str(), "/cpage/counter");
        assert_eq!(counter.template(), "cpage/counter.html");
    }

    #[test]
    fn url_param_identifiers_carry_depth() {
        let page = bind_page(
            ComponentDef::new("tasks")
                .url_param("project_id", ParamType::Int)
                .child(ComponentDef::new("view").url_param("task_id", ParamType::Int)),
        );

        assert_eq!(page.url_params()[0].identifier, "project_id");
        let view = &page.children()["view"].config;
        assert_eq!(view.url_params()[0].identifier, "task_id.1");
    }

    #[test]
    fn url_params_must_use_url_types() {
        let err = ComponentDef::new("p")
            .url_param("when", ParamType::Date)
            .bind(None, 0)
            .unwrap_err();
        assert!(matches!(err, JembeError::UnsupportedParamType { .. }));
    }

    #[test]
    fn underscore_params_are_rejected() {
        let err = ComponentDef::new("p")
            .state_param("_cache", ParamType::Json)
            .bind(None, 0)
            .unwrap_err();
        assert!(matches!(err, JembeError::Internal(_)));
    }

    #[test]
    fn duplicate_children_are_rejected() {
        let err = ComponentDef::new("p")
            .child(ComponentDef::new("c"))
            .child(ComponentDef::new("c"))
            .bind(None, 0)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate child"));
    }

    #[test]
    fn deferred_ordering_is_topological() {
        let noop = |_: &mut Instance, _: &ActionArgs, _: &mut ActionCtx<'_>| {
            Ok(ActionOutcome::Suppress)
        };
        let page = bind_page(
            ComponentDef::new("p")
                .deferred_action("b", noop)
                .action_def(
                    "a",
                    ActionDef {
                        deferred: true,
                        deferred_after: Some("b".into()),
                        deferred_before: None,
                        handler: Arc::new(noop),
                    },
                ),
        );
        assert_eq!(page.deferred_order(), ["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn deferred_cycle_is_a_config_error() {
        let noop = |_: &mut Instance, _: &ActionArgs, _: &mut ActionCtx<'_>| {
            Ok(ActionOutcome::Suppress)
        };
        let err = ComponentDef::new("p")
            .action_def(
                "a",
                ActionDef {
                    deferred: true,
                    deferred_after: Some("b".into()),
                    deferred_before: None,
                    handler: Arc::new(noop),
                },
            )
            .action_def(
                "b",
                ActionDef {
                    deferred: true,
                    deferred_after: Some("a".into()),
                    deferred_before: None,
                    handler: Arc::new(noop),
                },
            )
            .bind(None, 0)
            .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn query_alias_must_resolve() {
        let err = ComponentDef::new("p")
            .query_param("q", "query")
            .bind(None, 0)
            .unwrap_err();
        assert!(err.to_string().contains("unknown state param"));
    }

    #[test]
    fn url_path_pattern() {
        let page = bind_page(
            ComponentDef::new("tasks")
                .url_param("project_id", ParamType::Int)
                .state_param_default("order", ParamType::Str, json!("asc")),
        );
        assert_eq!(page.url_path(), "/tasks{key}/{Int:project_id}");
    }
}
