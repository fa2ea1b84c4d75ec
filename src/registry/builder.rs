use crate::config::Settings;
use crate::provider::{BitnessView, RootScope, TomlFileProvider};
use crate::{Error, Registry};

/// Builder for constructing a [`Registry`].
///
/// The builder starts without a provider (`RegistryBuilder<()>`) and
/// transitions to `RegistryBuilder<P>` when
/// [`with_provider`](Self::with_provider) is called.
///
/// ```no_run
/// use keyhive::{Registry, Settings};
///
/// let settings = Settings::builder()
///     .with_file("keyhive.toml", false)
///     .with_env("KEYHIVE", "__")
///     .build()?;
///
/// let registry = Registry::builder()
///     .with_settings(&settings)
///     .with_store_file()?
///     .build()?;
///
/// let theme = registry.get_value("Software\\Tool", "Theme", "light", true)?;
/// # Ok::<(), keyhive::Error>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct RegistryBuilder<P> {
    provider: Option<P>,
    settings: Settings,
}

impl RegistryBuilder<()> {
    pub(super) fn new() -> Self {
        Self {
            provider: None,
            settings: Settings::default(),
        }
    }

    /// Attaches the store the registry will operate on.
    pub fn with_provider<P>(self, provider: P) -> RegistryBuilder<P> {
        RegistryBuilder {
            provider: Some(provider),
            settings: self.settings,
        }
    }

    /// Opens the TOML store named by the settings' `store_file`.
    ///
    /// Fails with [`Error::MissingProvider`] if no file is configured.
    pub fn with_store_file(self) -> Result<RegistryBuilder<TomlFileProvider>, Error> {
        let path = self
            .settings
            .store_file
            .as_ref()
            .ok_or(Error::MissingProvider)?;
        let provider = TomlFileProvider::open(path)?;
        Ok(RegistryBuilder {
            provider: Some(provider),
            settings: self.settings,
        })
    }
}

impl<P> RegistryBuilder<P> {
    /// Takes the default scope and view from `settings`.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.settings = settings.clone();
        self
    }

    pub fn with_scope(mut self, scope: RootScope) -> Self {
        self.settings.scope = scope;
        self
    }

    pub fn with_view(mut self, view: BitnessView) -> Self {
        self.settings.view = view;
        self
    }

    /// Builds the `Registry`.
    ///
    /// Returns an error if no provider was attached.
    pub fn build(self) -> Result<Registry<P>, Error> {
        let provider = self.provider.ok_or(Error::MissingProvider)?;
        Ok(Registry::new(provider)
            .with_scope(self.settings.scope)
            .with_view(self.settings.view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryProvider;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_build_applies_settings() {
        let settings = Settings {
            scope: RootScope::Users,
            view: BitnessView::Registry32,
            store_file: None,
        };

        let registry = Registry::builder()
            .with_settings(&settings)
            .with_provider(MemoryProvider::new())
            .build()
            .unwrap();

        assert_eq!(registry.scope(), RootScope::Users);
        assert_eq!(registry.view(), BitnessView::Registry32);
    }

    #[test]
    fn test_explicit_scope_overrides_settings() {
        let registry = Registry::builder()
            .with_provider(MemoryProvider::new())
            .with_settings(&Settings::default())
            .with_scope(RootScope::LocalMachine)
            .build()
            .unwrap();

        assert_eq!(registry.scope(), RootScope::LocalMachine);
        assert_eq!(registry.view(), BitnessView::native());
    }

    #[test]
    fn test_missing_provider() {
        let result = Registry::builder().build();
        assert!(matches!(result, Err(Error::MissingProvider)));
    }

    #[test]
    fn test_store_file_without_path_is_rejected() {
        let result = Registry::builder()
            .with_settings(&Settings::default())
            .with_store_file();
        assert!(matches!(result, Err(Error::MissingProvider)));
    }

    #[test]
    fn test_store_file_from_settings() {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("store.toml");
        let settings = Settings {
            store_file: Some(path.clone()),
            ..Settings::default()
        };

        let registry = Registry::builder()
            .with_settings(&settings)
            .with_store_file()
            .unwrap()
            .build()
            .unwrap();
        registry.set_value("Software\\Tool", "Theme", "dark").unwrap();

        assert!(path.exists());
        let reopened = Registry::builder()
            .with_settings(&settings)
            .with_store_file()
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            reopened.get_value("SOFTWARE\\tool", "theme", "", false).unwrap(),
            Some("dark".to_string())
        );
        assert_eq!(reopened.provider().path(), path.as_path());
    }
}
