//! PluginLoader - discovers plugin units and instantiates their plugin

use libloading::Library;
use serde::Deserialize;
use std::collections::HashMap;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use attention_plugin_api::{
    API_VERSION, API_VERSION_SYMBOL, ApiVersionFn, CREATE_SYMBOL, CreateFn, Plugin, PluginFactory,
};

use super::error::LoaderError;

/// Manifest file marking a built-in plugin unit
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Stem of the dynamic library inside a unit directory
const LIBRARY_STEM: &str = "plugin";

/// `plugin.toml` contents
#[derive(Debug, Deserialize)]
struct UnitManifest {
    /// Name the factory was registered under with [`PluginLoader::with_builtin`]
    factory: String,
}

/// A unit directory that may hold a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Subdirectory name; dynamic units load in a library namespace keyed by it
    pub namespace: String,
    pub dir: PathBuf,
}

/// How a unit provides its plugin
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryPoint {
    Library(PathBuf),
    Builtin(PathBuf),
}

/// A loaded plugin instance plus whatever keeps its code mapped.
pub struct LoadedUnit {
    pub namespace: String,
    pub dir: PathBuf,
    /// Declared before `library` so the instance drops first
    pub(crate) instance: Box<dyn Plugin>,
    library: Option<Library>,
}

impl LoadedUnit {
    /// Wrap a plugin compiled into the host
    pub fn in_process(
        namespace: impl Into<String>,
        dir: impl Into<PathBuf>,
        instance: Box<dyn Plugin>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            dir: dir.into(),
            instance,
            library: None,
        }
    }

    pub fn plugin(&self) -> &dyn Plugin {
        self.instance.as_ref()
    }

    /// Whether the plugin came from a dynamic library
    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }
}

impl std::fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("namespace", &self.namespace)
            .field("dir", &self.dir)
            .field("dynamic", &self.is_dynamic())
            .finish_non_exhaustive()
    }
}

/// Finds plugin units in directories and creates one plugin per unit.
///
/// A unit is an immediate subdirectory holding either
/// - `plugin.so` / `libplugin.so` (platform suffix), built with `export_plugin!`
/// - `plugin.toml` with `factory = "<name>"` naming a built-in factory
#[derive(Default)]
pub struct PluginLoader {
    builtins: HashMap<String, PluginFactory>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a compiled-in plugin loadable through `plugin.toml`
    pub fn with_builtin(mut self, factory: impl Into<String>, create: PluginFactory) -> Self {
        self.builtins.insert(factory.into(), create);
        self
    }

    /// List unit directories under `directories`, in order, each sorted by
    /// name. Missing or unreadable directories are skipped.
    pub fn candidates(&self, directories: &[PathBuf]) -> Vec<Candidate> {
        let mut found = Vec::new();

        for base_dir in directories {
            if !base_dir.is_dir() {
                tracing::debug!(dir = %base_dir.display(), "Plugin directory does not exist");
                continue;
            }

            let entries = match std::fs::read_dir(base_dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        dir = %base_dir.display(),
                        error = %e,
                        "Cannot read plugin directory"
                    );
                    continue;
                }
            };

            let mut units: Vec<Candidate> = entries
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .filter_map(|path| {
                    let namespace = path.file_name()?.to_str()?.to_string();
                    if namespace.starts_with('_') || namespace.starts_with('.') {
                        return None;
                    }
                    Some(Candidate {
                        namespace,
                        dir: path,
                    })
                })
                .collect();
            units.sort_by(|a, b| a.namespace.cmp(&b.namespace));
            found.extend(units);
        }

        found
    }

    /// Instantiate the plugin of one unit.
    pub fn load(&self, candidate: &Candidate) -> Result<LoadedUnit, LoaderError> {
        match self.entry_point(&candidate.dir)? {
            EntryPoint::Library(path) => self.load_library(candidate, &path),
            EntryPoint::Builtin(manifest) => self.load_builtin(candidate, &manifest),
        }
    }

    /// Load every unit, logging and skipping failures.
    pub fn discover(&self, directories: &[PathBuf]) -> Vec<LoadedUnit> {
        self.candidates(directories)
            .iter()
            .filter_map(|candidate| self.load_logged(candidate))
            .collect()
    }

    /// [`load`](Self::load) with failures logged. Directories without an
    /// entry point are skipped quietly.
    pub fn load_logged(&self, candidate: &Candidate) -> Option<LoadedUnit> {
        match self.load(candidate) {
            Ok(unit) => Some(unit),
            Err(LoaderError::EntryPointNotFound { dir }) => {
                tracing::debug!(dir = %dir.display(), "No plugin entry point, skipping");
                None
            }
            Err(e) => {
                tracing::error!(plugin = %candidate.namespace, error = %e, "Failed to load plugin");
                None
            }
        }
    }

    fn entry_point(&self, dir: &Path) -> Result<EntryPoint, LoaderError> {
        let library = find_library(dir);
        let manifest = dir.join(MANIFEST_FILE);

        match (library, manifest.is_file()) {
            (Some(library), true) => Err(LoaderError::AmbiguousEntryPoint {
                dir: dir.to_path_buf(),
                library,
            }),
            (Some(library), false) => Ok(EntryPoint::Library(library)),
            (None, true) => Ok(EntryPoint::Builtin(manifest)),
            (None, false) => Err(LoaderError::EntryPointNotFound {
                dir: dir.to_path_buf(),
            }),
        }
    }

    fn load_builtin(
        &self,
        candidate: &Candidate,
        manifest_path: &Path,
    ) -> Result<LoadedUnit, LoaderError> {
        let content = std::fs::read_to_string(manifest_path)?;
        let manifest: UnitManifest = toml::from_str(&content).map_err(|e| LoaderError::Manifest {
            path: manifest_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let create = *self
            .builtins
            .get(&manifest.factory)
            .ok_or_else(|| LoaderError::UnknownBuiltin {
                factory: manifest.factory.clone(),
            })?;

        let instance = catch_unwind(create).map_err(|payload| LoaderError::Panicked {
            message: panic_message(payload.as_ref()),
        })?;

        Ok(LoadedUnit::in_process(&candidate.namespace, &candidate.dir, instance))
    }

    fn load_library(
        &self,
        candidate: &Candidate,
        lib_path: &Path,
    ) -> Result<LoadedUnit, LoaderError> {
        // SAFETY: Loading code the user placed in a plugin directory. The
        // library is expected to be built with `export_plugin!`.
        let library = unsafe { Library::new(lib_path)? };

        let instance = {
            // SAFETY: We're calling a C function exported by the plugin.
            let api_version_fn: libloading::Symbol<ApiVersionFn> =
                unsafe { library.get(API_VERSION_SYMBOL)? };

            let plugin_api_version = api_version_fn();
            if plugin_api_version != API_VERSION {
                return Err(LoaderError::ApiVersionMismatch {
                    expected: API_VERSION,
                    found: plugin_api_version,
                });
            }

            // A missing create symbol means the unit exports no plugin.
            let create_fn: libloading::Symbol<CreateFn> = unsafe { library.get(CREATE_SYMBOL)? };

            // `export_plugin!` catches constructor panics itself and returns
            // null; a hand-written create function may still unwind.
            let raw = catch_unwind(AssertUnwindSafe(|| create_fn())).map_err(|payload| {
                LoaderError::Panicked {
                    message: panic_message(payload.as_ref()),
                }
            })?;
            if raw.is_null() {
                return Err(LoaderError::Panicked {
                    message: format!("{} returned no instance", lib_path.display()),
                });
            }

            // SAFETY: Non-null pointers come from `Box::into_raw` in `export_plugin!`.
            unsafe { Box::from_raw(raw) }
        };

        tracing::debug!(
            plugin = %candidate.namespace,
            library = %lib_path.display(),
            "Plugin library loaded"
        );

        Ok(LoadedUnit {
            namespace: candidate.namespace.clone(),
            dir: candidate.dir.clone(),
            instance,
            library: Some(library),
        })
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut builtins: Vec<&str> = self.builtins.keys().map(String::as_str).collect();
        builtins.sort_unstable();
        f.debug_struct("PluginLoader").field("builtins", &builtins).finish()
    }
}

/// Find the library file in a plugin directory
fn find_library(dir: &Path) -> Option<PathBuf> {
    [
        format!("{LIBRARY_STEM}{DLL_SUFFIX}"),
        format!("{DLL_PREFIX}{LIBRARY_STEM}{DLL_SUFFIX}"),
    ]
    .into_iter()
    .map(|file| dir.join(file))
    .find(|path| path.is_file())
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
