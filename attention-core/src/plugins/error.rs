//! Plugin loader, manager and store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading one plugin unit
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Plugin directory has no recognised entry point
    #[error("No plugin entry point in {dir}")]
    EntryPointNotFound { dir: PathBuf },

    /// Plugin directory has both a library and a manifest
    #[error("Ambiguous plugin unit {dir}: found both {library} and plugin.toml")]
    AmbiguousEntryPoint { dir: PathBuf, library: PathBuf },

    /// API version mismatch between attention and plugin
    #[error("API version mismatch: attention expects {expected}, plugin has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Failed to load dynamic library or resolve a symbol
    #[error("Failed to load plugin library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// Manifest names a factory that is not compiled in
    #[error("Unknown built-in plugin '{factory}'")]
    UnknownBuiltin { factory: String },

    /// Manifest could not be parsed
    #[error("Invalid plugin manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// Plugin panicked while being created
    #[error("Plugin panicked during creation: {message}")]
    Panicked { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading or writing the persisted plugin configuration
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by plugin manager operations
#[derive(Error, Debug)]
pub enum PluginManagerError {
    /// Plugin not found
    #[error("Plugin '{name}' not found")]
    NotFound { name: String },

    /// A plugin with the same name is already registered
    #[error("Plugin '{name}' is already registered")]
    NameCollision { name: String },

    /// Plugin panicked while reporting its metadata or defaults
    #[error("Plugin unit '{name}' could not be registered: {message}")]
    RegistrationFailed { name: String, message: String },

    /// Plugin returned an error or panicked in `activate`
    #[error("Plugin '{name}' failed to activate: {message}")]
    ActivationFailed { name: String, message: String },

    /// Persisted configuration could not be written
    #[error("Config store error: {0}")]
    Store(#[from] StoreError),
}
