use std::path::PathBuf;

use serde::Deserialize;

use super::SettingsBuilder;
use crate::provider::{BitnessView, RootScope};

/// Where a [`Registry`](crate::Registry) reads and writes by default.
///
/// ```toml
/// scope = "local_machine"
/// view = "registry32"
/// store_file = "/var/lib/tool/store.toml"
/// ```
///
/// Every field is optional; omitted fields fall back to the current user
/// scope, the native view and no backing file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub scope: RootScope,
    pub view: BitnessView,
    pub store_file: Option<PathBuf>,
}

impl Settings {
    /// Creates a builder that layers settings files and environment variables.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }
}
