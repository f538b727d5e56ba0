//! Module Contract
//!
//! The typed declaration of what a module exports. Resolving a symbol
//! reinterprets a raw address as a function pointer with no runtime check,
//! so the only way to build a [`ModuleContract`] is through an `unsafe`
//! constructor where the integrator asserts the module's real ABI.

use std::fmt;
use std::os::raw::c_char;

use tracing::debug;

use super::callback::HostCallback;
use super::module::ModuleHandle;
use crate::error::BridgeResult;

/// `int32_t init(char *(*callback)(const char *))`
pub type InitFn = unsafe extern "C" fn(HostCallback) -> i32;

/// `char *call(const char *request_tag)`
pub type CallFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;

/// `void release(char *response)`
pub type ReleaseFn = unsafe extern "C" fn(*mut c_char);

/// Default name of the init export
pub const DEFAULT_INIT_SYMBOL: &str = "init";
/// Default name of the call export
pub const DEFAULT_CALL_SYMBOL: &str = "call";

/// Symbol names a module is trusted to export with the
/// [`InitFn`] / [`CallFn`] / [`ReleaseFn`] signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleContract {
    init: String,
    call: String,
    release: Option<String>,
}

impl ModuleContract {
    /// Declare the module's exports.
    ///
    /// # Safety
    ///
    /// The module must export `init` as [`InitFn`], `call` as [`CallFn`]
    /// and, when given, `release` as [`ReleaseFn`], all with C linkage.
    /// Any mismatch makes every later call through the bridge undefined
    /// behavior. The module must not call the registered callback after
    /// it has been unloaded.
    pub unsafe fn trusted(
        init: impl Into<String>,
        call: impl Into<String>,
        release: Option<String>,
    ) -> Self {
        Self {
            init: init.into(),
            call: call.into(),
            release,
        }
    }

    /// The `init` / `call` contract with no release export.
    ///
    /// # Safety
    ///
    /// Same as [`ModuleContract::trusted`].
    pub unsafe fn standard() -> Self {
        Self::trusted(DEFAULT_INIT_SYMBOL, DEFAULT_CALL_SYMBOL, None)
    }

    pub fn init_symbol(&self) -> &str {
        &self.init
    }

    pub fn call_symbol(&self) -> &str {
        &self.call
    }

    pub fn release_symbol(&self) -> Option<&str> {
        self.release.as_deref()
    }

    /// All symbol names in resolution order
    pub fn symbols(&self) -> Vec<&str> {
        let mut names = vec![self.init.as_str(), self.call.as_str()];
        names.extend(self.release.as_deref());
        names
    }

    /// Resolve every contract symbol in `module`.
    ///
    /// Fails on the first missing symbol, naming it.
    pub(crate) fn resolve(&self, module: &ModuleHandle) -> BridgeResult<SymbolTable> {
        // SAFETY: construction of `self` asserted these signatures.
        let init = unsafe { module.resolve::<InitFn>(&self.init)? };
        debug!(symbol = %self.init, "resolved init symbol");
        let call = unsafe { module.resolve::<CallFn>(&self.call)? };
        debug!(symbol = %self.call, "resolved call symbol");
        let release = match &self.release {
            Some(name) => {
                let f = unsafe { module.resolve::<ReleaseFn>(name)? };
                debug!(symbol = %name, "resolved release symbol");
                Some(f)
            }
            None => None,
        };

        Ok(SymbolTable {
            init,
            call,
            release,
        })
    }
}

impl fmt::Display for ModuleContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i32 {}(callback), cstr {}(cstr)", self.init, self.call)?;
        if let Some(release) = &self.release {
            write!(f, ", void {}(cstr)", release)?;
        }
        Ok(())
    }
}

/// Typed entry points resolved from one module load.
///
/// Built once at open time and never modified. The pointers are only
/// valid while the module that produced them stays loaded.
#[derive(Clone, Copy)]
pub(crate) struct SymbolTable {
    pub(crate) init: InitFn,
    pub(crate) call: CallFn,
    pub(crate) release: Option<ReleaseFn>,
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("init", &(self.init as *const ()))
            .field("call", &(self.call as *const ()))
            .field("release", &self.release.map(|r| r as *const ()))
            .finish()
    }
}
