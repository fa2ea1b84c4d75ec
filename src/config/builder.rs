use std::path::{Path, PathBuf};

use tracing::debug;

use super::env::merge_env_vars;
use super::{ConfigError, Settings};

#[derive(Debug)]
enum SettingsSource {
    File { path: PathBuf, required: bool },
    Env { prefix: String, separator: String },
}

/// Builder for loading [`Settings`] from TOML files and the environment.
///
/// Sources are applied in registration order, later ones overriding earlier
/// ones. Tables are merged recursively; other values are replaced.
///
/// ```no_run
/// use keyhive::Settings;
///
/// // defaults file -> env overrides -> local file overrides env
/// let settings = Settings::builder()
///     .with_file("keyhive.toml", true)
///     .with_env("KEYHIVE", "__")
///     .with_file("keyhive.local.toml", false)
///     .build()?;
/// # Ok::<(), keyhive::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SettingsBuilder {
    sources: Vec<SettingsSource>,
}

impl SettingsBuilder {
    /// Adds a TOML file to be loaded.
    ///
    /// If `required` is `true`, the build will fail if the file doesn't exist.
    /// Optional files that are missing are silently skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.sources.push(SettingsSource::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Reads variables named `PREFIX<separator>FIELD`, e.g. `KEYHIVE__SCOPE`.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.sources.push(SettingsSource::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.build_with_vars(std::env::vars())
    }

    fn build_with_vars<I>(self, vars: I) -> Result<Settings, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let mut merged = toml::Table::new();

        for source in self.sources {
            match source {
                SettingsSource::File { path, required } => {
                    if let Some(table) = load_settings_file(&path, required)? {
                        debug!(path = %path.display(), "loaded settings file");
                        deep_merge(&mut merged, table);
                    }
                }
                SettingsSource::Env { prefix, separator } => {
                    merge_env_vars(&mut merged, &prefix, &separator, vars.iter().cloned());
                }
            }
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(ConfigError::DeserializeError)
    }
}

/// Loads and parses a TOML settings file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_settings_file(path: &Path, required: bool) -> Result<Option<toml::Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BitnessView, RootScope};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[test]
    fn test_no_sources_gives_defaults() {
        let settings = Settings::builder().build_with_vars(Vec::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.scope, RootScope::CurrentUser);
        assert_eq!(settings.view, BitnessView::native());
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let base = settings_file("scope = \"local_machine\"\nview = \"registry32\"\n");
        let local = settings_file("scope = \"users\"\n");

        let settings = Settings::builder()
            .with_file(base.path(), true)
            .with_file(local.path(), true)
            .build_with_vars(Vec::new())
            .unwrap();

        assert_eq!(settings.scope, RootScope::Users);
        assert_eq!(settings.view, BitnessView::Registry32);
    }

    #[test]
    fn test_env_overrides_file() {
        let base = settings_file("scope = \"local_machine\"\n");
        let vars = vec![
            ("KH__SCOPE".to_string(), "current_config".to_string()),
            ("KH__STORE_FILE".to_string(), "/tmp/store.toml".to_string()),
        ];

        let settings = Settings::builder()
            .with_file(base.path(), true)
            .with_env("KH", "__")
            .build_with_vars(vars)
            .unwrap();

        assert_eq!(settings.scope, RootScope::CurrentConfig);
        assert_eq!(settings.store_file, Some(PathBuf::from("/tmp/store.toml")));
    }

    #[test]
    fn test_required_file_missing() {
        let result = Settings::builder()
            .with_file("/nonexistent/keyhive.toml", true)
            .build_with_vars(Vec::new());
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_optional_file_missing() {
        let settings = Settings::builder()
            .with_file("/nonexistent/keyhive.toml", false)
            .build_with_vars(Vec::new())
            .unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let file = settings_file("scope = \"everywhere\"\n");
        let result = Settings::builder()
            .with_file(file.path(), true)
            .build_with_vars(Vec::new());
        assert!(matches!(result, Err(ConfigError::DeserializeError(_))));
    }

    #[test]
    fn test_malformed_file() {
        let file = settings_file("scope = \n");
        let result = Settings::builder()
            .with_file(file.path(), true)
            .build_with_vars(Vec::new());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
