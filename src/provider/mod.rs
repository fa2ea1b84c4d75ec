//! The store capability consumed by [`Registry`](crate::Registry).
//!
//! A provider owns the persistent medium: how nodes are stored, how names are
//! case-folded and how handles are tracked. The registry only walks nodes
//! through this trait and releases every handle it opens.

mod error;
mod file;
mod guard;
mod memory;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::KeyPath;
use crate::value::Value;

pub use error::ProviderError;
pub use file::TomlFileProvider;
pub use guard::NodeGuard;
pub use memory::{MemoryNode, MemoryProvider};

/// The logical root a caller starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootScope {
    ClassesRoot,
    #[default]
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl RootScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootScope::ClassesRoot => "classes_root",
            RootScope::CurrentUser => "current_user",
            RootScope::LocalMachine => "local_machine",
            RootScope::Users => "users",
            RootScope::CurrentConfig => "current_config",
        }
    }
}

impl fmt::Display for RootScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which architecture view of the store to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitnessView {
    Registry32,
    Registry64,
}

impl BitnessView {
    /// The view matching the platform this crate was built for.
    pub fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            BitnessView::Registry64
        } else {
            BitnessView::Registry32
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BitnessView::Registry32 => "registry32",
            BitnessView::Registry64 => "registry64",
        }
    }
}

impl Default for BitnessView {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for BitnessView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hierarchical store of nodes holding child nodes and named values.
///
/// Every handle returned by `open_root`, `open_child` or `create_child` must
/// be handed back to [`release`](Self::release). [`NodeGuard`] does this on
/// drop. Methods take `&self` so several handles can be alive at once.
pub trait StoreProvider {
    type Node;

    fn open_root(&self, scope: RootScope, view: BitnessView) -> Result<Self::Node, ProviderError>;

    /// Direct child names, as stored.
    fn list_children(&self, node: &Self::Node) -> Result<BTreeSet<String>, ProviderError>;

    /// Opens an existing child, or `Ok(None)` if there is none by that name.
    fn open_child(
        &self,
        node: &Self::Node,
        name: &str,
        writable: bool,
    ) -> Result<Option<Self::Node>, ProviderError>;

    /// Creates a child with exactly `name` and opens it for writing.
    fn create_child(&self, node: &Self::Node, name: &str) -> Result<Self::Node, ProviderError>;

    fn get_raw_value(&self, node: &Self::Node, name: &str) -> Result<Option<Value>, ProviderError>;

    fn value_names(&self, node: &Self::Node) -> Result<BTreeSet<String>, ProviderError>;

    fn set_raw_value(&self, node: &Self::Node, name: &str, value: Value) -> Result<(), ProviderError>;

    /// Deletes the node at `path` below `node` together with all descendants.
    ///
    /// A missing path is [`ProviderError::NotFound`].
    fn delete_subtree(&self, node: &Self::Node, path: &KeyPath) -> Result<(), ProviderError>;

    fn release(&self, node: Self::Node);
}
