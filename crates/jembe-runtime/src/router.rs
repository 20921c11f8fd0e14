//! URL routing derived from the component hierarchy.
//!
//! At startup the registry is walked depth-first and every mount point
//! gets a route: the concatenation of its ancestors' contributions,
//! where each component contributes `/<name>[.<key>]` plus one typed
//! segment per URL param. Matching a request path yields the target
//! descriptor (the *primary* component whose `display` runs), the keys
//! captured along the way, and the URL-supplied param values per depth.
//!
//! URLs are built the other way, bottom-up from an exec name, skipping
//! components with `changes_url = false`.

use jembe_component::{ComponentConfig, Registry};
use jembe_types::{ExecName, FullName, JembeError, ParamType};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum RouteSeg {
    /// Matches `name` or `name.<key>`, capturing the key.
    Component { name: String },
    /// Matches one typed value segment (or the rest of the path for
    /// [`ParamType::UrlPath`]).
    Param {
        param: String,
        ty: ParamType,
        owner: FullName,
    },
}

#[derive(Debug, Clone)]
struct Route {
    target: FullName,
    segments: Vec<RouteSeg>,
    static_count: usize,
}

impl Route {
    fn pattern(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                RouteSeg::Component { name, .. } => {
                    out.push('/');
                    out.push_str(name);
                    out.push_str("{key}");
                }
                RouteSeg::Param { ty, .. } => {
                    out.push_str(&format!("/{{{ty:?}}}"));
                }
            }
        }
        out
    }
}

/// URL-supplied values captured by one path match.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Exec name of the primary component, keys filled in.
    pub exec_name: ExecName,
    /// URL param values per mount point on the branch.
    pub params: BTreeMap<FullName, Map<String, Value>>,
}

/// Route table over one registry.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Builds the route table.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::Internal`] when two mount points would
    /// register the same path shape.
    pub fn build(registry: &Registry) -> Result<Self, JembeError> {
        let mut routes = Vec::new();
        for page in registry.pages() {
            collect_routes(page, Vec::new(), &mut routes);
        }

        let mut seen: BTreeMap<String, FullName> = BTreeMap::new();
        for route in &routes {
            if let Some(other) = seen.insert(route.pattern(), route.target.clone()) {
                return Err(JembeError::Internal(format!(
                    "route collision between {other} and {}",
                    route.target
                )));
            }
        }
        tracing::debug!(routes = routes.len(), "route table built");
        Ok(Self { routes })
    }

    /// Matches a request path, preferring routes with more static
    /// segments, then longer ones.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let segments: Vec<&str> = if path == "/" {
            Vec::new()
        } else {
            path.trim_start_matches('/').split('/').collect()
        };
        self.routes
            .iter()
            .filter_map(|route| match_route(route, &segments).map(|m| (route, m)))
            .max_by_key(|(route, _)| (route.static_count, route.segments.len()))
            .map(|(_, m)| m)
    }

    /// Merges aliased query params into a match's per-depth values.
    ///
    /// Each component on the branch maps its `(short, param)` aliases
    /// against the query pairs; unknown keys are ignored.
    pub fn apply_query(
        &self,
        registry: &Registry,
        matched: &mut RouteMatch,
        query: &str,
    ) {
        let pairs: Vec<(&str, &str)> = query
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| p.split_once('=').unwrap_or((p, "")))
            .collect();
        if pairs.is_empty() {
            return;
        }
        for prefix in matched.exec_name.prefixes() {
            let full_name = prefix.full_name();
            let Some(config) = registry.lookup(&full_name) else {
                continue;
            };
            for (short, param) in config.query_params() {
                for (qk, qv) in &pairs {
                    if qk == short {
                        matched
                            .params
                            .entry(full_name.clone())
                            .or_default()
                            .insert(param.clone(), Value::String((*qv).to_string()));
                    }
                }
            }
        }
    }
}

fn collect_routes(
    config: &Arc<ComponentConfig>,
    prefix: Vec<RouteSeg>,
    into: &mut Vec<Route>,
) {
    let mut segments = prefix;
    segments.push(RouteSeg::Component {
        name: config.name().to_string(),
    });
    for p in config.url_params() {
        segments.push(RouteSeg::Param {
            param: p.name.clone(),
            ty: p.ty.clone(),
            owner: config.full_name().clone(),
        });
    }
    let static_count = segments
        .iter()
        .filter(|s| matches!(s, RouteSeg::Component { .. }))
        .count();
    into.push(Route {
        target: config.full_name().clone(),
        segments: segments.clone(),
        static_count,
    });
    for mount in config.children().values() {
        collect_routes(&mount.config, segments.clone(), into);
    }
}

fn match_route(route: &Route, segments: &[&str]) -> Option<RouteMatch> {
    let mut exec = String::new();
    let mut params: BTreeMap<FullName, Map<String, Value>> = BTreeMap::new();
    let mut idx = 0;

    for seg in &route.segments {
        match seg {
            RouteSeg::Component { name } => {
                let raw = segments.get(idx)?;
                let (seg_name, key) = match raw.split_once('.') {
                    Some((n, k)) => (n, k),
                    None => (*raw, ""),
                };
                if seg_name != name {
                    return None;
                }
                exec.push('/');
                exec.push_str(name);
                if !key.is_empty() {
                    exec.push('.');
                    exec.push_str(key);
                }
                idx += 1;
            }
            RouteSeg::Param { param, ty, owner } => {
                let value = if *ty == ParamType::UrlPath {
                    if idx >= segments.len() {
                        return None;
                    }
                    let rest = segments[idx..].join("/");
                    idx = segments.len();
                    Value::String(rest)
                } else {
                    let raw = segments.get(idx)?;
                    idx += 1;
                    Value::String((*raw).to_string())
                };
                let typed = ty.load(param, &value).ok()?;
                params.entry(owner.clone()).or_default().insert(param.clone(), typed);
            }
        }
    }
    if idx != segments.len() {
        return None;
    }
    let exec_name = ExecName::parse(exec).ok()?;
    Some(RouteMatch { exec_name, params })
}

/// Builds the browser URL of `exec_name`, reading URL param values
/// through `value`, which receives the prefix exec name and the param
/// name.
///
/// Components with `changes_url = false` contribute no path segments.
/// Query-aliased params whose current value differs from the declared
/// default are appended as `?short=value` pairs.
///
/// # Errors
///
/// Returns [`JembeError::NotFound`] for unregistered mount points and
/// [`JembeError::Internal`] when a URL param has no value.
pub fn url_of<F>(
    registry: &Registry,
    exec_name: &ExecName,
    mut value: F,
) -> Result<String, JembeError>
where
    F: FnMut(&ExecName, &str) -> Option<Value>,
{
    let mut url = String::new();
    for prefix in exec_name.prefixes() {
        let full_name = prefix.full_name();
        let config = registry.require(&full_name)?;
        if !config.changes_url() {
            continue;
        }
        url.push('/');
        url.push_str(config.name());
        let key = prefix.key();
        if !key.is_empty() {
            url.push('.');
            url.push_str(key);
        }
        for p in config.url_params() {
            let raw = value(&prefix, &p.name).ok_or_else(|| {
                JembeError::Internal(format!(
                    "{full_name}: no value for url param {:?}",
                    p.name
                ))
            })?;
            url.push('/');
            url.push_str(&p.ty.to_url_segment(&p.name, &raw)?);
        }
    }
    if url.is_empty() {
        url.push('/');
    }
    let mut query = String::new();
    for prefix in exec_name.prefixes() {
        let config = registry.require(&prefix.full_name())?;
        for (short, param) in config.query_params() {
            let Some(raw) = value(&prefix, param) else {
                continue;
            };
            let default = config.state_param(param).and_then(|p| p.default.as_ref());
            if default == Some(&raw) {
                continue;
            }
            let rendered = match &raw {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            query.push(if query.is_empty() { '?' } else { '&' });
            query.push_str(short);
            query.push('=');
            query.push_str(&rendered);
        }
    }
    url.push_str(&query);
    Ok(url)
}
