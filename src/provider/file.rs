//! File-backed store provider.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::memory::Hives;
use super::{BitnessView, MemoryNode, MemoryProvider, ProviderError, RootScope, StoreProvider};
use crate::path::KeyPath;
use crate::value::Value;

/// A provider that keeps the whole store in one TOML document.
///
/// The document is read once when the provider is opened; a missing file is
/// an empty store. Every mutation rewrites the file through a temporary file
/// renamed over the target. A mutation whose write fails is undone in
/// memory too, so memory and disk never diverge.
///
/// ```toml
/// [current_user.registry64.children.Software.children.Tool.values]
/// Theme = { kind = "string", data = "dark" }
/// ```
#[derive(Debug)]
pub struct TomlFileProvider {
    path: PathBuf,
    inner: MemoryProvider,
}

impl TomlFileProvider {
    /// Opens the store at `path`, reading it if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref().to_path_buf();
        let hives = load_store_file(&path)?.unwrap_or_default();
        Ok(Self {
            inner: MemoryProvider::from_hives(hives),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open_handles(&self) -> usize {
        self.inner.open_handles()
    }

    /// Writes the current tree, or puts `before` back if the write fails.
    fn persist_or_restore(&self, before: Hives) -> Result<(), ProviderError> {
        if let Err(e) = self.persist() {
            warn!(path = %self.path.display(), error = %e, "store write failed, change undone");
            self.inner.restore_hives(before);
            return Err(e);
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), ProviderError> {
        let contents = toml::to_string(&self.inner.hives())?;
        let write_error = |source| ProviderError::WriteError {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
        file.write_all(contents.as_bytes()).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&self.path).map_err(|e| write_error(e.error))?;

        debug!(path = %self.path.display(), "store file written");
        Ok(())
    }
}

/// Loads and parses a store file.
///
/// Returns `Ok(None)` if the file doesn't exist.
fn load_store_file(path: &Path) -> Result<Option<Hives>, ProviderError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let hives = toml::from_str(&contents).map_err(|e| ProviderError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(hives))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProviderError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

impl StoreProvider for TomlFileProvider {
    type Node = MemoryNode;

    fn open_root(&self, scope: RootScope, view: BitnessView) -> Result<MemoryNode, ProviderError> {
        self.inner.open_root(scope, view)
    }

    fn list_children(&self, node: &MemoryNode) -> Result<BTreeSet<String>, ProviderError> {
        self.inner.list_children(node)
    }

    fn open_child(
        &self,
        node: &MemoryNode,
        name: &str,
        writable: bool,
    ) -> Result<Option<MemoryNode>, ProviderError> {
        self.inner.open_child(node, name, writable)
    }

    fn create_child(&self, node: &MemoryNode, name: &str) -> Result<MemoryNode, ProviderError> {
        let before = self.inner.hives();
        let child = self.inner.create_child(node, name)?;
        if let Err(e) = self.persist_or_restore(before) {
            self.inner.release(child);
            return Err(e);
        }
        Ok(child)
    }

    fn get_raw_value(&self, node: &MemoryNode, name: &str) -> Result<Option<Value>, ProviderError> {
        self.inner.get_raw_value(node, name)
    }

    fn value_names(&self, node: &MemoryNode) -> Result<BTreeSet<String>, ProviderError> {
        self.inner.value_names(node)
    }

    fn set_raw_value(&self, node: &MemoryNode, name: &str, value: Value) -> Result<(), ProviderError> {
        let before = self.inner.hives();
        self.inner.set_raw_value(node, name, value)?;
        self.persist_or_restore(before)
    }

    fn delete_subtree(&self, node: &MemoryNode, path: &KeyPath) -> Result<(), ProviderError> {
        let before = self.inner.hives();
        self.inner.delete_subtree(node, path)?;
        self.persist_or_restore(before)
    }

    fn release(&self, node: MemoryNode) {
        self.inner.release(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VIEW: BitnessView = BitnessView::Registry64;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let provider = TomlFileProvider::open(dir.path().join("store.toml")).unwrap();
        let root = provider.open_root(RootScope::CurrentUser, VIEW).unwrap();

        assert!(provider.list_children(&root).unwrap().is_empty());
        provider.release(root);
    }

    #[test]
    fn test_mutations_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.toml");

        {
            let provider = TomlFileProvider::open(&path).unwrap();
            let root = provider.open_root(RootScope::CurrentUser, VIEW).unwrap();
            let app = provider.create_child(&root, "App Settings").unwrap();
            provider.set_raw_value(&app, "Theme", Value::from("dark")).unwrap();
            provider.set_raw_value(&app, "Blob", Value::from(vec![1u8, 2, 255])).unwrap();
            provider.release(app);
            provider.release(root);
        }

        let provider = TomlFileProvider::open(&path).unwrap();
        let root = provider.open_root(RootScope::CurrentUser, VIEW).unwrap();
        let app = provider.open_child(&root, "app settings", false).unwrap().unwrap();
        assert_eq!(
            provider.get_raw_value(&app, "Theme").unwrap(),
            Some(Value::from("dark"))
        );
        assert_eq!(
            provider.get_raw_value(&app, "Blob").unwrap(),
            Some(Value::Binary(vec![1, 2, 255]))
        );
        provider.release(app);
        provider.release(root);
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_reads_hand_written_document() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [local_machine.registry32.children.Software.values]
            Count = {{ kind = "dword", data = 3 }}
            "#
        )
        .unwrap();

        let provider = TomlFileProvider::open(file.path()).unwrap();
        let root = provider
            .open_root(RootScope::LocalMachine, BitnessView::Registry32)
            .unwrap();
        let software = provider.open_child(&root, "software", false).unwrap().unwrap();
        assert_eq!(
            provider.get_raw_value(&software, "count").unwrap(),
            Some(Value::DWord(3))
        );
        provider.release(software);
        provider.release(root);
    }

    #[test]
    fn test_invalid_document() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not = = toml").unwrap();

        let result = TomlFileProvider::open(file.path());
        assert!(matches!(result, Err(ProviderError::ParseError { .. })));
    }

    #[test]
    fn test_unserializable_value_is_undone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.toml");
        let provider = TomlFileProvider::open(&path).unwrap();
        let root = provider.open_root(RootScope::CurrentUser, VIEW).unwrap();
        let a = provider.create_child(&root, "A").unwrap();
        provider.set_raw_value(&a, "small", Value::QWord(7)).unwrap();
        let on_disk = std::fs::read_to_string(&path).unwrap();

        let result = provider.set_raw_value(&a, "big", Value::QWord(u64::MAX));
        assert!(matches!(result, Err(ProviderError::SerializeError(_))));
        assert_eq!(provider.get_raw_value(&a, "big").unwrap(), None);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), on_disk);

        // Later, unrelated writes still reach disk.
        let b = provider.create_child(&root, "B").unwrap();
        provider.set_raw_value(&b, "x", Value::from("unrelated")).unwrap();
        provider.release(a);
        provider.release(b);
        provider.release(root);
        assert_eq!(provider.open_handles(), 0);

        let reopened = TomlFileProvider::open(&path).unwrap();
        let root = reopened.open_root(RootScope::CurrentUser, VIEW).unwrap();
        let b = reopened.open_child(&root, "B", false).unwrap().unwrap();
        assert_eq!(
            reopened.get_raw_value(&b, "x").unwrap(),
            Some(Value::from("unrelated"))
        );
        let a = reopened.open_child(&root, "A", false).unwrap().unwrap();
        assert_eq!(reopened.get_raw_value(&a, "big").unwrap(), None);
        reopened.release(a);
        reopened.release(b);
        reopened.release(root);
    }

    #[test]
    fn test_failed_write_is_undone() {
        let dir = TempDir::new().unwrap();
        let store_dir = dir.path().join("store");
        std::fs::create_dir(&store_dir).unwrap();
        let provider = TomlFileProvider::open(store_dir.join("store.toml")).unwrap();
        let root = provider.open_root(RootScope::CurrentUser, VIEW).unwrap();
        let app = provider.create_child(&root, "App").unwrap();
        std::fs::remove_dir_all(&store_dir).unwrap();

        let result = provider.set_raw_value(&app, "Theme", Value::from("dark"));
        assert!(matches!(result, Err(ProviderError::WriteError { .. })));
        assert_eq!(provider.get_raw_value(&app, "Theme").unwrap(), None);

        let result = provider.create_child(&root, "Other");
        assert!(matches!(result, Err(ProviderError::WriteError { .. })));
        assert_eq!(provider.list_children(&root).unwrap().len(), 1);

        provider.release(app);
        provider.release(root);
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.toml");
        let provider = TomlFileProvider::open(&path).unwrap();
        let root = provider.open_root(RootScope::CurrentUser, VIEW).unwrap();
        let app = provider.create_child(&root, "App").unwrap();
        provider.set_raw_value(&app, "Theme", Value::from("dark")).unwrap();
        provider.release(app);
        provider.release(root);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries, [std::ffi::OsString::from("store.toml")]);
    }
}
