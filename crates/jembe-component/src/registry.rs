//! The component registry.
//!
//! All pages are registered explicitly on a [`RegistryBuilder`]; `build`
//! binds every descriptor tree and validates the whole hierarchy once,
//! up front. The resulting [`Registry`] is immutable and cheap to share
//! between requests.
//!
//! # Example
//!
//! ```
//! use jembe_component::{ComponentDef, RegistryBuilder};
//!
//! let registry = RegistryBuilder::new()
//!     .page(ComponentDef::new("cpage").child(ComponentDef::new("counter")))
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.lookup_str("/cpage/counter").is_some());
//! ```

use crate::config::{ComponentConfig, ComponentDef};
use jembe_types::{FullName, JembeError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable map of every mount point in the application.
#[derive(Debug, Clone)]
pub struct Registry {
    pages: Vec<Arc<ComponentConfig>>,
    by_full_name: BTreeMap<FullName, Arc<ComponentConfig>>,
}

impl Registry {
    /// Registered pages, in registration order.
    #[must_use]
    pub fn pages(&self) -> &[Arc<ComponentConfig>] {
        &self.pages
    }

    /// Looks up a mount point by full name.
    #[must_use]
    pub fn lookup(&self, full_name: &FullName) -> Option<&Arc<ComponentConfig>> {
        self.by_full_name.get(full_name)
    }

    /// Looks up a mount point by its textual full name.
    #[must_use]
    pub fn lookup_str(&self, full_name: &str) -> Option<&Arc<ComponentConfig>> {
        let parsed = FullName::parse(full_name).ok()?;
        self.by_full_name.get(&parsed)
    }

    /// Resolves a mount point, mapping absence to a not-found error.
    ///
    /// # Errors
    ///
    /// Returns [`JembeError::NotFound`] for unregistered full names.
    pub fn require(&self, full_name: &FullName) -> Result<&Arc<ComponentConfig>, JembeError> {
        self.lookup(full_name)
            .ok_or_else(|| JembeError::NotFound(format!("no component at {full_name}")))
    }

    /// Every mount point, in depth-first registration order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentConfig>> {
        self.by_full_name.values()
    }
}

/// Builder collecting page descriptors.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    pages: Vec<ComponentDef>,
}

impl RegistryBuilder {
    /// Starts an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a page (a root component).
    #[must_use]
    pub fn page(mut self, def: ComponentDef) -> Self {
        self.pages.push(def);
        self
    }

    /// Binds and validates the whole hierarchy.
    ///
    /// # Errors
    ///
    /// Propagates descriptor binding errors and rejects duplicate page
    /// names and an empty registry.
    pub fn build(self) -> Result<Registry, JembeError> {
        if self.pages.is_empty() {
            return Err(JembeError::Internal(
                "registry has no pages".to_string(),
            ));
        }
        let mut pages = Vec::with_capacity(self.pages.len());
        let mut by_full_name = BTreeMap::new();
        for def in self.pages {
            let bound = def.bind(None, 0)?;
            if by_full_name.contains_key(bound.full_name()) {
                return Err(JembeError::Internal(format!(
                    "duplicate page {}",
                    bound.full_name()
                )));
            }
            collect(&bound, &mut by_full_name);
            pages.push(bound);
        }
        tracing::debug!(mount_points = by_full_name.len(), "registry built");
        Ok(Registry {
            pages,
            by_full_name,
        })
    }
}

fn collect(
    config: &Arc<ComponentConfig>,
    into: &mut BTreeMap<FullName, Arc<ComponentConfig>>,
) {
    into.insert(config.full_name().clone(), Arc::clone(config));
    for mount in config.children().values() {
        collect(&mount.config, into);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_indexes_the_whole_tree() {
        let registry = RegistryBuilder::new()
            .page(
                ComponentDef::new("cpage")
                    .child(ComponentDef::new("counter"))
                    .child(ComponentDef::new("title")),
            )
            .page(ComponentDef::new("login"))
            .build()
            .expect("build");

        assert_eq!(registry.pages().len(), 2);
        assert!(registry.lookup_str("/cpage").is_some());
        assert!(registry.lookup_str("/cpage/counter").is_some());
        assert!(registry.lookup_str("/cpage/title").is_some());
        assert!(registry.lookup_str("/login").is_some());
        assert!(registry.lookup_str("/cpage/missing").is_none());
    }

    #[test]
    fn duplicate_pages_are_rejected() {
        let err = RegistryBuilder::new()
            .page(ComponentDef::new("cpage"))
            .page(ComponentDef::new("cpage"))
            .build()
            .expect_err("duplicate");
        assert!(err.to_string().contains("duplicate page"));
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(RegistryBuilder::new().build().is_err());
    }

    #[test]
    fn require_maps_absence_to_not_found() {
        let registry = RegistryBuilder::new()
            .page(ComponentDef::new("cpage"))
            .build()
            .expect("build");
        let missing = FullName::parse("/other").expect("name");
        assert!(matches!(
            registry.require(&missing),
            Err(JembeError::NotFound(_))
        ));
    }
}
