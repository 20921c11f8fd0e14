//! Live component instances.
//!
//! An [`Instance`] is one materialised component at one exec name,
//! holding its descriptor and its state record. Instances live for a
//! single request; nothing survives between requests except what the
//! client echoes back as state.
//!
//! # Initialisation precedence
//!
//! State is assembled from layered sources, later layers winning:
//!
//! 1. param defaults declared on the descriptor
//! 2. mount defaults from the parent's child declaration
//! 3. `inject_into_children()` values inherited from ancestors
//!    (nearer ancestors win; collected root-down by the processor)
//! 4. client-reported state (typed, closed shape; values for injected
//!    keys are ignored with a debug log, `inject()` re-supplies them)
//! 5. explicit init params from the command
//! 6. the component's own `inject()` hook
//!
//! A param with no default that no layer supplies is a missing required
//! param and fails the initialise with a bad-request error.

use crate::config::ComponentConfig;
use crate::context::RequestContext;
use jembe_types::{ComponentState, ExecName, JembeError};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Param sources for one initialise, in precedence order.
///
/// All maps are keyed by state param name. `client_state` is `None`
/// when the client did not report this instance.
#[derive(Debug, Clone, Copy)]
pub struct InitSources<'a> {
    /// Defaults from the parent's child declaration.
    pub mount_defaults: &'a Map<String, Value>,
    /// Inherited `inject_into_children()` values, already merged
    /// root-down so nearer ancestors won.
    pub inherited: &'a Map<String, Value>,
    /// State echoed by the client for this exec name, if any.
    pub client_state: Option<&'a Map<String, Value>>,
    /// Explicit init params from the initialise command.
    pub explicit: &'a Map<String, Value>,
}

impl Default for InitSources<'_> {
    fn default() -> Self {
        let empty = empty_map();
        Self {
            mount_defaults: empty,
            inherited: empty,
            client_state: None,
            explicit: empty,
        }
    }
}

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

/// One live component.
#[derive(Debug, Clone)]
pub struct Instance {
    exec_name: ExecName,
    config: Arc<ComponentConfig>,
    /// The state record; actions mutate it through
    /// [`ComponentState::set`], which enforces the closed shape.
    pub state: ComponentState,
}

impl Instance {
    /// Materialises an instance at `exec_name`, assembling state from
    /// the layered sources.
    ///
    /// # Errors
    ///
    /// * [`JembeError::BadRequest`] for unknown keys in the client
    ///   state, type mismatches, or missing required params.
    /// * [`JembeError::Internal`] when `exec_name` does not address
    ///   this descriptor's mount point.
    pub fn build(
        config: Arc<ComponentConfig>,
        exec_name: ExecName,
        sources: &InitSources<'_>,
        request: &RequestContext,
    ) -> Result<Self, JembeError> {
        if &exec_name.full_name() != config.full_name() {
            return Err(JembeError::Internal(format!(
                "exec name {exec_name} does not address {}",
                config.full_name()
            )));
        }

        let param_names: Vec<String> = config
            .state_params()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let mut state = ComponentState::new(exec_name.to_string(), param_names);
        let mut assigned = BTreeSet::new();

        for param in config.state_params() {
            if param.injected {
                state.mark_injected(&param.name)?;
            }
            if let Some(default) = &param.default {
                state.set(&param.name, param.ty.load(&param.name, default)?)?;
                assigned.insert(param.name.clone());
            }
        }

        for (key, value) in sources.mount_defaults {
            let param = config.state_param(key).ok_or_else(|| {
                JembeError::Internal(format!(
                    "{exec_name}: mount default for unknown param {key:?}"
                ))
            })?;
            state.set(key, param.ty.load(key, value)?)?;
            assigned.insert(key.clone());
        }

        // Inherited injection applies only where the param is declared.
        for (key, value) in sources.inherited {
            if let Some(param) = config.state_param(key) {
                state.set(key, param.ty.load(key, value)?)?;
                assigned.insert(key.clone());
            }
        }

        if let Some(client) = sources.client_state {
            for (key, value) in client {
                let param = config.state_param(key).ok_or_else(|| {
                    JembeError::BadRequest(format!(
                        "{exec_name}: unknown state param {key:?} from client"
                    ))
                })?;
                if param.injected {
                    tracing::debug!(
                        exec_name = %exec_name,
                        param = %key,
                        "client attempted to set injected param, ignoring"
                    );
                    continue;
                }
                state.set(key, param.ty.load(key, value)?)?;
                assigned.insert(key.clone());
            }
        }

        for (key, value) in sources.explicit {
            let param = config.state_param(key).ok_or_else(|| {
                JembeError::BadRequest(format!("{exec_name}: unknown init param {key:?}"))
            })?;
            state.set(key, param.ty.load(key, value)?)?;
            assigned.insert(key.clone());
        }

        for (key, value) in config.run_inject(request) {
            if config.state_param(&key).is_some() {
                state.set(&key, value)?;
                assigned.insert(key);
            }
        }

        for param in config.state_params() {
            if !assigned.contains(&param.name) {
                return Err(JembeError::BadRequest(format!(
                    "{exec_name}: missing required param {:?}",
                    param.name
                )));
            }
        }

        Ok(Self {
            exec_name,
            config,
            state,
        })
    }

    /// Exec name this instance lives at.
    #[must_use]
    pub fn exec_name(&self) -> &ExecName {
        &self.exec_name
    }

    /// Bound descriptor.
    #[must_use]
    pub fn config(&self) -> &Arc<ComponentConfig> {
        &self.config
    }

    /// Component name within its parent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// Key of the leaf segment; empty for keyless instances.
    #[must_use]
    pub fn key(&self) -> &str {
        self.exec_name.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentDef;
    use jembe_types::ParamType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn counter_config() -> Arc<ComponentConfig> {
        ComponentDef::new("counter")
            .state_param_default("value", ParamType::Int, json!(0))
            .state_param("label", ParamType::Str)
            .bind(None, 0)
            .expect("bind")
    }

    fn obj(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn defaults_then_explicit_params() {
        let config = counter_config();
        let exec = ExecName::parse("/counter").expect("exec");
        let explicit = obj(&[("label", json!("clicks"))]);
        let sources = InitSources {
            explicit: &explicit,
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");

        assert_eq!(inst.state.get("value").expect("value"), &json!(0));
        assert_eq!(inst.state.get("label").expect("label"), &json!("clicks"));
    }

    #[test]
    fn missing_required_param_is_bad_request() {
        let config = counter_config();
        let exec = ExecName::parse("/counter").expect("exec");
        let err = Instance::build(
            config,
            exec,
            &InitSources::default(),
            &RequestContext::default(),
        )
        .expect_err("label is required");
        assert!(matches!(err, JembeError::BadRequest(_)));
    }

    #[test]
    fn client_state_overrides_defaults_with_typed_load() {
        let config = counter_config();
        let exec = ExecName::parse("/counter").expect("exec");
        let client = obj(&[("value", json!("7")), ("label", json!("a"))]);
        let sources = InitSources {
            client_state: Some(&client),
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");
        assert_eq!(inst.state.get("value").expect("value"), &json!(7));
    }

    #[test]
    fn explicit_params_beat_client_state() {
        let config = counter_config();
        let exec = ExecName::parse("/counter").expect("exec");
        let client = obj(&[("value", json!(3)), ("label", json!("a"))]);
        let explicit = obj(&[("value", json!(9))]);
        let sources = InitSources {
            client_state: Some(&client),
            explicit: &explicit,
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");
        assert_eq!(inst.state.get("value").expect("value"), &json!(9));
    }

    #[test]
    fn client_injected_value_loses_to_inject_hook() {
        let config = ComponentDef::new("profile")
            .injected_param("user")
            .inject(|_req| {
                let mut m = Map::new();
                m.insert("user".into(), json!("alice"));
                m
            })
            .bind(None, 0)
            .expect("bind");
        let exec = ExecName::parse("/profile").expect("exec");
        let client = obj(&[("user", json!("mallory"))]);
        let sources = InitSources {
            client_state: Some(&client),
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");
        assert_eq!(inst.state.get("user").expect("user"), &json!("alice"));
    }

    #[test]
    fn client_injected_value_is_ignored_without_a_hook() {
        let config = ComponentDef::new("profile")
            .injected_param("user")
            .bind(None, 0)
            .expect("bind");
        let exec = ExecName::parse("/profile").expect("exec");
        let client = obj(&[("user", json!({"id": 1}))]);
        let sources = InitSources {
            client_state: Some(&client),
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");
        assert_eq!(inst.state.get("user").expect("user"), &Value::Null);
    }

    #[test]
    fn inject_hook_wins_over_everything() {
        let config = ComponentDef::new("profile")
            .injected_param("user")
            .inject(|_req| {
                let mut m = Map::new();
                m.insert("user".into(), json!("alice"));
                m
            })
            .bind(None, 0)
            .expect("bind");
        let exec = ExecName::parse("/profile").expect("exec");
        let explicit = obj(&[("user", json!("mallory"))]);
        let sources = InitSources {
            explicit: &explicit,
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");
        assert_eq!(inst.state.get("user").expect("user"), &json!("alice"));
        assert_eq!(inst.state.to_json(), json!({}));
    }

    #[test]
    fn inherited_values_apply_only_to_declared_params() {
        let config = counter_config();
        let exec = ExecName::parse("/counter").expect("exec");
        let inherited = obj(&[("value", json!(5)), ("project_id", json!(9))]);
        let explicit = obj(&[("label", json!("x"))]);
        let sources = InitSources {
            inherited: &inherited,
            explicit: &explicit,
            ..InitSources::default()
        };
        let inst = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect("build");
        assert_eq!(inst.state.get("value").expect("value"), &json!(5));
        assert!(inst.state.get("project_id").is_none());
    }

    #[test]
    fn unknown_client_key_is_refused() {
        let config = counter_config();
        let exec = ExecName::parse("/counter").expect("exec");
        let client = obj(&[("bogus", json!(1))]);
        let sources = InitSources {
            client_state: Some(&client),
            ..InitSources::default()
        };
        let err = Instance::build(config, exec, &sources, &RequestContext::default())
            .expect_err("closed shape");
        assert!(matches!(err, JembeError::BadRequest(_)));
    }
}
