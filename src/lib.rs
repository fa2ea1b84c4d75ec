//! Access to a hierarchical, persistent key/value store.
//!
//! Paths such as `Software\Vendor\Tool` name nodes that hold child nodes and
//! named typed values. [`Registry`] resolves paths one segment at a time,
//! creating missing nodes on write and falling back to defaults on read. The
//! storage itself sits behind the [`StoreProvider`] trait.

pub mod config;
pub mod path;
pub mod provider;
pub mod registry;
pub mod value;
mod error;

pub use config::{ConfigError, Settings, SettingsBuilder};
pub use error::Error;
pub use path::KeyPath;
pub use provider::{
    BitnessView, MemoryProvider, NodeGuard, ProviderError, RootScope, StoreProvider,
    TomlFileProvider,
};
pub use registry::{Registry, RegistryBuilder};
pub use value::{Value, ValueKind};
