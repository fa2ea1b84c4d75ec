//! In-memory store provider.
//!
//! Names are matched case-insensitively and stored with the case they were
//! created with. Open handles are counted so callers can assert that every
//! handle was released.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{BitnessView, ProviderError, RootScope, StoreProvider};
use crate::path::{segments_match, KeyPath};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct NodeData {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) values: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) children: BTreeMap<String, NodeData>,
}

/// Root nodes keyed by scope name, then by view name.
pub(crate) type Hives = BTreeMap<String, BTreeMap<String, NodeData>>;

/// Handle to a node in a [`MemoryProvider`].
#[derive(Debug)]
pub struct MemoryNode {
    id: u64,
    scope: RootScope,
    view: BitnessView,
    path: Vec<String>,
    writable: bool,
}

impl MemoryNode {
    /// Stored names from the root down to this node.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn describe(&self) -> String {
        let mut out = self.scope.as_str().to_string();
        for segment in &self.path {
            out.push('\\');
            out.push_str(segment);
        }
        out
    }
}

#[derive(Debug, Default)]
struct State {
    hives: Hives,
    open: BTreeSet<u64>,
    next_id: u64,
    denied: Vec<String>,
    read_only: bool,
}

impl State {
    fn handle(
        &mut self,
        scope: RootScope,
        view: BitnessView,
        path: Vec<String>,
        writable: bool,
    ) -> MemoryNode {
        let id = self.next_id;
        self.next_id += 1;
        self.open.insert(id);
        trace!(id, scope = %scope, depth = path.len(), writable, "opened node handle");
        MemoryNode {
            id,
            scope,
            view,
            path,
            writable,
        }
    }

    fn check_open(&self, node: &MemoryNode) -> Result<(), ProviderError> {
        if self.open.contains(&node.id) {
            Ok(())
        } else {
            Err(ProviderError::HandleClosed)
        }
    }

    fn check_writable(&self, node: &MemoryNode) -> Result<(), ProviderError> {
        if self.read_only || !node.writable {
            return Err(ProviderError::PermissionDenied(node.describe()));
        }
        Ok(())
    }

    fn node(&self, node: &MemoryNode) -> Result<&NodeData, ProviderError> {
        self.check_open(node)?;
        let not_found = || ProviderError::NotFound(node.describe());
        let mut current = self
            .hives
            .get(node.scope.as_str())
            .and_then(|views| views.get(node.view.as_str()))
            .ok_or_else(not_found)?;
        for name in &node.path {
            current = current.children.get(name).ok_or_else(not_found)?;
        }
        Ok(current)
    }

    fn node_mut(&mut self, node: &MemoryNode) -> Result<&mut NodeData, ProviderError> {
        self.check_open(node)?;
        let not_found = || ProviderError::NotFound(node.describe());
        let mut current = self
            .hives
            .get_mut(node.scope.as_str())
            .and_then(|views| views.get_mut(node.view.as_str()))
            .ok_or_else(not_found)?;
        for name in &node.path {
            current = current.children.get_mut(name).ok_or_else(not_found)?;
        }
        Ok(current)
    }
}

/// Finds the stored key matching `name`, preferring an exact match.
fn find_key<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a String> {
    map.get_key_value(name)
        .map(|(key, _)| key)
        .or_else(|| map.keys().find(|key| segments_match(key, name)))
}

/// A store that lives only as long as the provider.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: RefCell<State>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_hives(hives: Hives) -> Self {
        Self {
            state: RefCell::new(State {
                hives,
                ..State::default()
            }),
        }
    }

    pub(crate) fn hives(&self) -> Hives {
        self.state.borrow().hives.clone()
    }

    /// Replaces the stored tree, leaving open handles untouched.
    pub(crate) fn restore_hives(&self, hives: Hives) {
        self.state.borrow_mut().hives = hives;
    }

    /// Number of handles opened and not yet released.
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open.len()
    }

    /// Makes every later attempt to create a child called `name` fail with
    /// [`ProviderError::PermissionDenied`].
    pub fn deny_create(&self, name: impl Into<String>) {
        self.state.borrow_mut().denied.push(name.into());
    }

    /// Rejects all writes while set.
    pub fn set_read_only(&self, read_only: bool) {
        self.state.borrow_mut().read_only = read_only;
    }

    /// Whether a node exists at `path`, matched case-insensitively.
    pub fn exists(&self, scope: RootScope, view: BitnessView, path: &KeyPath) -> bool {
        let state = self.state.borrow();
        let Some(mut current) = state
            .hives
            .get(scope.as_str())
            .and_then(|views| views.get(view.as_str()))
        else {
            return false;
        };
        for segment in path.segments() {
            match find_key(&current.children, segment).and_then(|k| current.children.get(k)) {
                Some(child) => current = child,
                None => return false,
            }
        }
        true
    }

    /// Writes a value directly, creating nodes as needed, without opening
    /// handles or honoring write restrictions. Intended for seeding state in
    /// tests.
    #[doc(hidden)]
    pub fn insert_raw(
        &self,
        scope: RootScope,
        view: BitnessView,
        path: &KeyPath,
        name: &str,
        value: impl Into<Value>,
    ) {
        let mut state = self.state.borrow_mut();
        let mut current = state
            .hives
            .entry(scope.as_str().to_string())
            .or_default()
            .entry(view.as_str().to_string())
            .or_default();
        for segment in path.segments() {
            let key = find_key(&current.children, segment)
                .cloned()
                .unwrap_or_else(|| segment.clone());
            current = current.children.entry(key).or_default();
        }
        current.values.insert(name.to_string(), value.into());
    }
}

impl StoreProvider for MemoryProvider {
    type Node = MemoryNode;

    fn open_root(&self, scope: RootScope, view: BitnessView) -> Result<MemoryNode, ProviderError> {
        let mut state = self.state.borrow_mut();
        state
            .hives
            .entry(scope.as_str().to_string())
            .or_default()
            .entry(view.as_str().to_string())
            .or_default();
        Ok(state.handle(scope, view, Vec::new(), true))
    }

    fn list_children(&self, node: &MemoryNode) -> Result<BTreeSet<String>, ProviderError> {
        let state = self.state.borrow();
        Ok(state.node(node)?.children.keys().cloned().collect())
    }

    fn open_child(
        &self,
        node: &MemoryNode,
        name: &str,
        writable: bool,
    ) -> Result<Option<MemoryNode>, ProviderError> {
        let mut state = self.state.borrow_mut();
        let Some(actual) = find_key(&state.node(node)?.children, name).cloned() else {
            return Ok(None);
        };
        let mut path = node.path.clone();
        path.push(actual);
        Ok(Some(state.handle(node.scope, node.view, path, writable)))
    }

    fn create_child(&self, node: &MemoryNode, name: &str) -> Result<MemoryNode, ProviderError> {
        let mut state = self.state.borrow_mut();
        state.check_writable(node)?;
        if state.denied.iter().any(|denied| segments_match(denied, name)) {
            return Err(ProviderError::PermissionDenied(format!(
                "{}\\{name}",
                node.describe()
            )));
        }

        let data = state.node_mut(node)?;
        // Creating an existing child opens it, as the native stores do.
        let actual = match find_key(&data.children, name) {
            Some(existing) => existing.clone(),
            None => {
                data.children.insert(name.to_string(), NodeData::default());
                name.to_string()
            }
        };
        let mut path = node.path.clone();
        path.push(actual);
        Ok(state.handle(node.scope, node.view, path, true))
    }

    fn get_raw_value(&self, node: &MemoryNode, name: &str) -> Result<Option<Value>, ProviderError> {
        let state = self.state.borrow();
        let data = state.node(node)?;
        Ok(find_key(&data.values, name)
            .and_then(|key| data.values.get(key))
            .cloned())
    }

    fn value_names(&self, node: &MemoryNode) -> Result<BTreeSet<String>, ProviderError> {
        let state = self.state.borrow();
        Ok(state.node(node)?.values.keys().cloned().collect())
    }

    fn set_raw_value(&self, node: &MemoryNode, name: &str, value: Value) -> Result<(), ProviderError> {
        let mut state = self.state.borrow_mut();
        state.check_writable(node)?;
        let data = state.node_mut(node)?;
        let key = find_key(&data.values, name)
            .cloned()
            .unwrap_or_else(|| name.to_string());
        data.values.insert(key, value);
        Ok(())
    }

    fn delete_subtree(&self, node: &MemoryNode, path: &KeyPath) -> Result<(), ProviderError> {
        let mut state = self.state.borrow_mut();
        state.check_writable(node)?;
        let missing = || ProviderError::NotFound(format!("{}\\{path}", node.describe()));
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(missing());
        };

        let mut current = state.node_mut(node)?;
        for segment in parents {
            let key = find_key(&current.children, segment)
                .cloned()
                .ok_or_else(missing)?;
            current = current.children.get_mut(&key).ok_or_else(missing)?;
        }
        let key = find_key(&current.children, last)
            .cloned()
            .ok_or_else(missing)?;
        current.children.remove(&key);
        Ok(())
    }

    fn release(&self, node: MemoryNode) {
        trace!(id = node.id, "released node handle");
        self.state.borrow_mut().open.remove(&node.id);
    }
}
