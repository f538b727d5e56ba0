//! Module Locator
//!
//! Turns a module name or path into the file the dynamic loader should open.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BridgeError, BridgeResult};

/// Resolves module names against a list of search directories
#[derive(Debug, Clone)]
pub struct ModuleLocator {
    /// Search paths for modules, in lookup order
    search_paths: Vec<PathBuf>,
}

impl ModuleLocator {
    /// Create a locator with the platform default search paths
    pub fn new() -> Self {
        Self {
            search_paths: default_search_paths(),
        }
    }

    /// Create a locator that only searches the given directories
    pub fn with_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_paths: paths.into_iter().collect(),
        }
    }

    /// Add a search path, searched after the existing ones
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.push(path.as_ref().to_path_buf());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find a module by path or by name.
    ///
    /// An existing path wins. Otherwise the platform file name for `name`
    /// is looked up in each search path.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_file() {
            return Some(path.to_path_buf());
        }

        let file_name = module_filename(name);
        self.search_paths
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Find a module and canonicalize its path.
    ///
    /// The canonical path is the identity used for the one-open-per-path rule.
    pub fn locate(&self, name: &str) -> BridgeResult<PathBuf> {
        let found = self.find(name).ok_or_else(|| BridgeError::Load {
            path: PathBuf::from(name),
            reason: "not found on any search path".to_string(),
        })?;
        let canonical = found.canonicalize().map_err(|e| BridgeError::Load {
            path: found.clone(),
            reason: e.to_string(),
        })?;
        debug!(module = name, path = %canonical.display(), "located module");
        Ok(canonical)
    }
}

impl Default for ModuleLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default module search paths for this platform
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(ld_path) = std::env::var("LD_LIBRARY_PATH") {
            paths.extend(ld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        paths.push(PathBuf::from("/usr/local/lib"));
        // Debian-style multiarch directories
        let multiarch = format!("{}-linux-gnu", std::env::consts::ARCH);
        paths.push(PathBuf::from("/usr/lib").join(&multiarch));
        paths.push(PathBuf::from("/lib").join(&multiarch));
        paths.push(PathBuf::from("/usr/lib64"));
        paths.push(PathBuf::from("/usr/lib"));
        paths.push(PathBuf::from("/lib64"));
        paths.push(PathBuf::from("/lib"));
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(dyld_path) = std::env::var("DYLD_LIBRARY_PATH") {
            paths.extend(dyld_path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        paths.push(PathBuf::from("/usr/local/lib"));
        paths.push(PathBuf::from("/opt/homebrew/lib"));
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(path) = std::env::var("PATH") {
            paths.extend(path.split(';').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
    }

    paths
}

/// Construct the platform-specific module filename
pub fn module_filename(name: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        if name.starts_with("lib") && name.ends_with(".dylib") {
            name.to_string()
        } else {
            format!("lib{}.dylib", name)
        }
    }

    #[cfg(target_os = "windows")]
    {
        if name.ends_with(".dll") {
            name.to_string()
        } else {
            format!("{}.dll", name)
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if name.starts_with("lib") && name.contains(".so") {
            name.to_string()
        } else {
            format!("lib{}.so", name)
        }
    }
}
