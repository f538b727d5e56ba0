//! Module Handles
//!
//! Safe wrapper around libloading for one loaded module.

use std::collections::HashSet;
use std::ffi::CString;
use std::mem;
use std::path::{Path, PathBuf};

use libloading::Library;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};

/// Canonical paths of modules currently held by a live handle
static OPEN_MODULES: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Exclusive ownership of one loaded module
#[derive(Debug)]
pub struct ModuleHandle {
    /// Canonical path of the module
    path: PathBuf,
    /// The loaded library, `None` once unloaded
    library: Option<Library>,
}

impl ModuleHandle {
    /// Load the module at `path`.
    ///
    /// The path is canonicalized first, so aliases of a module already held
    /// by a live handle are rejected with [`BridgeError::AlreadyOpen`].
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let path = path.canonicalize().map_err(|e| BridgeError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !OPEN_MODULES.lock().insert(path.clone()) {
            return Err(BridgeError::AlreadyOpen(path));
        }

        // Safety: loading runs the module's initializers. We trust the
        // integrator to point us at a well-behaved module.
        let library = match unsafe { Library::new(&path) } {
            Ok(library) => library,
            Err(e) => {
                OPEN_MODULES.lock().remove(&path);
                return Err(BridgeError::Load {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        info!(path = %path.display(), "module loaded");
        Ok(Self {
            path,
            library: Some(library),
        })
    }

    /// Get the path to this module
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.library.is_some()
    }

    /// Look up the raw address of an exported symbol.
    ///
    /// Exact, case-sensitive name match; no demangling.
    pub fn address(&self, name: &str) -> BridgeResult<*const ()> {
        let library = self.library.as_ref().ok_or(BridgeError::Closed)?;

        let c_name =
            CString::new(name).map_err(|_| BridgeError::InvalidSymbol(name.to_string()))?;

        // Safety: reading the symbol as a plain address, nothing is called.
        let symbol = unsafe { library.get::<*const ()>(c_name.as_bytes_with_nul()) };
        let addr = match symbol {
            Ok(symbol) => *symbol,
            Err(e) => {
                debug!(symbol = name, error = %e, "symbol lookup failed");
                return Err(self.missing(name));
            }
        };
        if addr.is_null() {
            return Err(self.missing(name));
        }
        Ok(addr)
    }

    /// Whether the module exports `name`
    pub fn exports(&self, name: &str) -> bool {
        self.address(name).is_ok()
    }

    /// Resolve an exported symbol as a value of type `T`, typically an
    /// `extern "C" fn` pointer.
    ///
    /// # Safety
    ///
    /// `T` must exactly match the signature the module exports under
    /// `name`. The returned value must not be used after this handle is
    /// closed or dropped.
    pub unsafe fn resolve<T: Copy>(&self, name: &str) -> BridgeResult<T> {
        if mem::size_of::<T>() != mem::size_of::<*const ()>() {
            return Err(BridgeError::InvalidSymbol(format!(
                "{}: declared type is not pointer-sized",
                name
            )));
        }
        let addr = self.address(name)?;
        Ok(mem::transmute_copy::<*const (), T>(&addr))
    }

    /// Unload the module.
    pub fn close(mut self) -> BridgeResult<()> {
        self.unload()
    }

    fn unload(&mut self) -> BridgeResult<()> {
        let library = self.library.take().ok_or(BridgeError::Closed)?;
        library.close().map_err(|e| BridgeError::Unload {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        info!(path = %self.path.display(), "module unloaded");
        Ok(())
    }

    fn missing(&self, name: &str) -> BridgeError {
        BridgeError::SymbolNotFound {
            symbol: name.to_string(),
            path: self.path.clone(),
        }
    }
}

impl Drop for ModuleHandle {
    fn drop(&mut self) {
        if self.library.is_some() {
            if let Err(e) = self.unload() {
                warn!(error = %e, "unload on drop failed");
            }
        }
        OPEN_MODULES.lock().remove(&self.path);
    }
}

/// Whether a live handle currently holds the module at `path`
pub fn is_open(path: &Path) -> bool {
    match path.canonicalize() {
        Ok(path) => OPEN_MODULES.lock().contains(&path),
        Err(_) => false,
    }
}
