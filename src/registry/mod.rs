//! Path resolution and typed value access over a [`StoreProvider`].

mod builder;

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::path::{segments_match, KeyPath};
use crate::provider::{BitnessView, NodeGuard, ProviderError, RootScope, StoreProvider};
use crate::value::{parse_bool, Value};
use crate::Error;

pub use builder::RegistryBuilder;

/// Stateless access to a hierarchical store.
///
/// Holds only the provider and the default scope and view. Every operation
/// opens the root fresh and releases each handle it acquires before it
/// returns, including on errors.
///
/// ## Example
///
/// ```
/// use keyhive::{MemoryProvider, Registry};
///
/// let registry = Registry::new(MemoryProvider::new());
///
/// registry.set_value("Software\\Tool", "Theme", "dark")?;
/// assert_eq!(
///     registry.get_value("software\\tool", "Theme", "", false)?,
///     Some("dark".to_string())
/// );
/// # Ok::<(), keyhive::Error>(())
/// ```
#[derive(Debug)]
pub struct Registry<P> {
    provider: P,
    scope: RootScope,
    view: BitnessView,
}

impl<P> Registry<P> {
    /// Creates a registry over the current user scope and the native view.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            scope: RootScope::default(),
            view: BitnessView::native(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn into_provider(self) -> P {
        self.provider
    }

    pub fn scope(&self) -> RootScope {
        self.scope
    }

    pub fn view(&self) -> BitnessView {
        self.view
    }

    pub fn with_scope(mut self, scope: RootScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_view(mut self, view: BitnessView) -> Self {
        self.view = view;
        self
    }
}

impl Registry<()> {
    /// Creates a new builder for constructing a `Registry`.
    pub fn builder() -> RegistryBuilder<()> {
        RegistryBuilder::new()
    }
}

impl<P: StoreProvider> Registry<P> {
    /// Opens the root of `scope` in this registry's view.
    pub fn open_root(&self, scope: RootScope) -> Result<NodeGuard<'_, P>, Error> {
        let root = self.provider.open_root(scope, self.view)?;
        Ok(NodeGuard::new(&self.provider, root))
    }

    /// Walks `path` below `base`, creating every missing segment.
    ///
    /// Existing children are matched case-insensitively; new children get
    /// the segment name exactly as written. Each intermediate handle is
    /// released as soon as the next one is open. `base` stays owned by the
    /// caller.
    ///
    /// Nodes created before a failing step are left in place.
    pub fn ensure_node(&self, base: &P::Node, path: &KeyPath) -> Result<NodeGuard<'_, P>, Error> {
        if path.is_root() {
            return Err(Error::InvalidPath(path.to_string()));
        }

        let mut current: Option<NodeGuard<'_, P>> = None;
        for segment in path.segments() {
            let parent: &P::Node = current.as_deref().unwrap_or(base);
            let children = self.provider.list_children(parent)?;

            let next = if children.iter().any(|child| segments_match(child, segment)) {
                trace!(%segment, "opening existing segment");
                self.provider
                    .open_child(parent, segment, true)?
                    .ok_or_else(|| ProviderError::NotFound(path.to_string()))?
            } else {
                debug!(%segment, %path, "creating segment");
                self.provider.create_child(parent, segment)?
            };
            current = Some(NodeGuard::new(&self.provider, next));
        }

        current.ok_or_else(|| Error::InvalidPath(path.to_string()))
    }

    /// Opens `path` read-only in `scope` without creating anything.
    ///
    /// Returns `Ok(None)` if any segment is missing. The root path opens the
    /// scope's root.
    pub fn open_path(&self, scope: RootScope, path: &KeyPath) -> Result<Option<NodeGuard<'_, P>>, Error> {
        let mut current = self.open_root(scope)?;
        for segment in path.segments() {
            match self.provider.open_child(&current, segment, false)? {
                Some(child) => current = NodeGuard::new(&self.provider, child),
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Reads a value as text.
    ///
    /// With `create_if_missing` and a non-empty `default`, the node chain is
    /// created and `default` is stored if the value is absent; the stored
    /// value is returned. With `create_if_missing` and an empty `default`,
    /// nothing is created and a missing node or value is `None`. Without
    /// `create_if_missing`, a missing node or value yields `default`.
    pub fn get_value(
        &self,
        path: impl Into<KeyPath>,
        name: &str,
        default: &str,
        create_if_missing: bool,
    ) -> Result<Option<String>, Error> {
        let path = path.into();

        if create_if_missing {
            if !default.is_empty() {
                let root = self.open_root(self.scope)?;
                let node = self.ensure_node(&root, &path)?;
                return self.ensure_value(&node, &path, name, default).map(Some);
            }

            let Some(node) = self.open_path(self.scope, &path)? else {
                return Ok(None);
            };
            return Ok(self
                .provider
                .get_raw_value(&node, name)?
                .map(|value| value.to_string()));
        }

        let Some(node) = self.open_path(self.scope, &path)? else {
            return Ok(Some(default.to_string()));
        };
        let value = self.provider.get_raw_value(&node, name)?;
        Ok(Some(match value {
            Some(value) => value.to_string(),
            None => default.to_string(),
        }))
    }

    /// [`get_value`](Self::get_value) with an empty default and creation
    /// requested, which reads without creating anything.
    pub fn get_value_or_none(&self, path: impl Into<KeyPath>, name: &str) -> Result<Option<String>, Error> {
        self.get_value(path, name, "", true)
    }

    /// Reads a value as a boolean.
    ///
    /// `None` if the value is absent or is not `true`/`false`.
    pub fn get_bool(
        &self,
        path: impl Into<KeyPath>,
        name: &str,
        default: &str,
        create_if_missing: bool,
    ) -> Result<Option<bool>, Error> {
        let value = self.get_value(path, name, default, create_if_missing)?;
        Ok(value.as_deref().and_then(parse_bool))
    }

    /// Writes a value, creating the node chain as needed.
    pub fn set_value(&self, path: impl Into<KeyPath>, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let path = path.into();
        let root = self.open_root(self.scope)?;
        let node = self.ensure_node(&root, &path)?;
        self.provider.set_raw_value(&node, name, value.into())?;
        Ok(())
    }

    /// Deletes the node at `path` and all of its descendants.
    ///
    /// A missing path is an error, not a no-op.
    pub fn delete_subtree(&self, path: impl Into<KeyPath>) -> Result<(), Error> {
        let path = path.into();
        if path.is_root() {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let root = self.open_root(self.scope)?;
        self.provider.delete_subtree(&root, &path)?;
        debug!(%path, "deleted subtree");
        Ok(())
    }

    /// Names of the direct children of `path` in `scope`.
    ///
    /// A missing node has no children.
    pub fn child_names(&self, path: impl Into<KeyPath>, scope: RootScope) -> Result<BTreeSet<String>, Error> {
        let path = path.into();
        match self.open_path(scope, &path)? {
            Some(node) => Ok(self.provider.list_children(&node)?),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Names of the values stored at `path`; empty if the node is missing.
    pub fn value_names(&self, path: impl Into<KeyPath>) -> Result<BTreeSet<String>, Error> {
        let path = path.into();
        match self.open_path(self.scope, &path)? {
            Some(node) => Ok(self.provider.value_names(&node)?),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Stores `default` under `name` unless a value exists, then reads back
    /// whatever the provider now holds.
    fn ensure_value(&self, node: &P::Node, path: &KeyPath, name: &str, default: &str) -> Result<String, Error> {
        if self.provider.get_raw_value(node, name)?.is_none() {
            debug!(%path, name, "writing default value");
            self.provider.set_raw_value(node, name, Value::from(default))?;
        }

        match self.provider.get_raw_value(node, name)? {
            Some(value) => Ok(value.to_string()),
            None => Err(ProviderError::NotFound(format!("{path}\\{name}")).into()),
        }
    }
}
