//! Dynamic Bridge
//!
//! Loads a shared module at runtime, resolves its C-linkage entry points
//! into typed function pointers, hands it a host callback and exchanges
//! null-terminated string payloads with it.
//!
//! # Architecture
//!
//! ```text
//! Host
//!   │  DynamicBridge::open(path, contract)
//!   ▼
//! ModuleLocator ──► ModuleHandle (libloading)
//!                        │  contract.resolve()
//!                        ▼
//!                   SymbolTable { init, call, release? }
//!                        │
//!   register_callback ───┤──► init(host_callback)
//!   invoke(tag) ─────────┘──► call(tag) ──► host_callback(..)*  (module's choice)
//! ```
//!
//! # Lifecycle
//!
//! `opened → initialized → (invoking)* → closed`. Transitions only move
//! forward; a failed `open` leaves nothing behind.
//!
//! # Response ownership
//!
//! By default the module owns the string `call` returns and keeps it valid
//! until its next `call`; the bridge copies it immediately. When the
//! contract names a `release` export, ownership moves to the bridge, which
//! hands the pointer back to `release` once the copy is taken.
//!
//! # Example
//!
//! ```ignore
//! dynbridge::host_callback! {
//!     fn on_echo(payload) {
//!         println!("module says {}", String::from_utf8_lossy(payload));
//!     }
//! }
//!
//! let contract = unsafe { ModuleContract::standard() };
//! let mut bridge = DynamicBridge::open("./libbinance.so", contract)?;
//! bridge.register_callback(on_echo)?;
//! let outcome = bridge.invoke("new_order")?;
//! bridge.close()?;
//! ```

pub mod callback;
mod contract;
mod locator;
mod module;
mod payload;

pub use callback::HostCallback;
pub use contract::{
    CallFn, InitFn, ModuleContract, ReleaseFn, DEFAULT_CALL_SYMBOL, DEFAULT_INIT_SYMBOL,
};
pub use locator::{module_filename, ModuleLocator};
pub use module::{is_open, ModuleHandle};
pub use payload::{CallOutcome, Payload};

use std::fmt;
use std::path::Path;

use parking_lot::ReentrantMutex;
use tracing::{debug, info, trace, warn};

use crate::error::{BridgeError, BridgeResult};
use contract::SymbolTable;

/// Where a bridge is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Module loaded and symbols resolved; no callback registered yet
    Opened,
    /// `init` accepted the host callback; `invoke` is allowed
    Initialized,
    /// Module unloaded
    Closed,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeState::Opened => write!(f, "opened"),
            BridgeState::Initialized => write!(f, "initialized"),
            BridgeState::Closed => write!(f, "closed"),
        }
    }
}

/// A loaded module with its resolved contract.
///
/// The bridge exclusively owns its module handle and symbol table.
/// `invoke` takes `&self` and is serialized by a re-entrant lock, so a
/// bridge can be shared across threads, and a callback running inside
/// `invoke` may call `invoke` again on the same thread.
pub struct DynamicBridge {
    module: Option<ModuleHandle>,
    contract: ModuleContract,
    symbols: SymbolTable,
    state: BridgeState,
    callback: Option<HostCallback>,
    call_lock: ReentrantMutex<()>,
}

impl DynamicBridge {
    /// Locate and load a module, then resolve its contract.
    ///
    /// `name` may be a path or a bare module name looked up on the default
    /// search paths.
    pub fn open(name: &str, contract: ModuleContract) -> BridgeResult<Self> {
        Self::open_with(&ModuleLocator::new(), name, contract)
    }

    /// Like [`DynamicBridge::open`] with an explicit locator
    pub fn open_with(
        locator: &ModuleLocator,
        name: &str,
        contract: ModuleContract,
    ) -> BridgeResult<Self> {
        let path = locator.locate(name)?;
        let module = ModuleHandle::load(&path)?;
        Self::from_module(module, contract)
    }

    /// Resolve `contract` against an already loaded module.
    ///
    /// On failure the module is unloaded before the error is returned.
    pub fn from_module(module: ModuleHandle, contract: ModuleContract) -> BridgeResult<Self> {
        let symbols = contract.resolve(&module)?;
        info!(path = %module.path().display(), contract = %contract, "bridge opened");
        Ok(Self {
            module: Some(module),
            contract,
            symbols,
            state: BridgeState::Opened,
            callback: None,
            call_lock: ReentrantMutex::new(()),
        })
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn contract(&self) -> &ModuleContract {
        &self.contract
    }

    /// Path of the loaded module, `None` once closed
    pub fn path(&self) -> Option<&Path> {
        self.module.as_ref().map(|m| m.path())
    }

    /// The underlying module handle, for resolving symbols outside the contract
    pub fn module(&self) -> BridgeResult<&ModuleHandle> {
        self.module.as_ref().ok_or(BridgeError::Closed)
    }

    /// The callback currently registered with the module
    pub fn callback(&self) -> Option<HostCallback> {
        self.callback
    }

    /// Register `callback` with the module through its `init` export.
    ///
    /// The module may keep the callback and call it during any later
    /// `invoke`, any number of times. A non-zero status from `init` is
    /// returned as [`BridgeError::Init`] and leaves the bridge unable to
    /// invoke. Registering again replaces the previous callback.
    pub fn register_callback(&mut self, callback: HostCallback) -> BridgeResult<()> {
        if self.state == BridgeState::Closed {
            return Err(BridgeError::Closed);
        }

        let _guard = self.call_lock.lock();
        // SAFETY: `init` was resolved under the contract's signature and the
        // module is still loaded (state is not Closed).
        let status = unsafe { (self.symbols.init)(callback) };
        if status != 0 {
            warn!(
                symbol = self.contract.init_symbol(),
                status, "module rejected callback registration"
            );
            self.state = BridgeState::Opened;
            self.callback = None;
            return Err(BridgeError::Init { status });
        }

        debug!(symbol = self.contract.init_symbol(), "callback registered");
        self.callback = Some(callback);
        self.state = BridgeState::Initialized;
        Ok(())
    }

    /// Call the module's `call` export with `request`.
    ///
    /// Blocks until the module returns; there is no timeout. A null return
    /// comes back as [`CallOutcome::NoResponse`].
    pub fn invoke(&self, request: impl AsRef<[u8]>) -> BridgeResult<CallOutcome> {
        match self.state {
            BridgeState::Closed => return Err(BridgeError::Closed),
            BridgeState::Opened => return Err(BridgeError::NotInitialized),
            BridgeState::Initialized => {}
        }

        let request = Payload::from(request.as_ref());
        let c_request = request.to_c_string()?;

        let _guard = self.call_lock.lock();
        // SAFETY: `call` was resolved under the contract's signature, the
        // module is loaded, and `c_request` outlives the call.
        let raw = unsafe { (self.symbols.call)(c_request.as_ptr()) };

        // SAFETY: the module guarantees a non-null result stays valid until
        // its next `call` (or until released), and we hold the call lock.
        let outcome = match unsafe { Payload::from_raw(raw) } {
            Some(response) => {
                if let Some(release) = self.symbols.release {
                    // SAFETY: ownership of `raw` was transferred to us by
                    // the contract; it is released exactly once.
                    unsafe { release(raw) };
                }
                CallOutcome::Response(response)
            }
            None => CallOutcome::NoResponse,
        };

        trace!(
            symbol = self.contract.call_symbol(),
            request = %request,
            response = %outcome,
            "invoke complete"
        );
        Ok(outcome)
    }

    /// Unload the module.
    ///
    /// The registered callback must not be called by the module after this
    /// point. A second `close` returns [`BridgeError::Closed`].
    pub fn close(&mut self) -> BridgeResult<()> {
        if self.state == BridgeState::Closed {
            return Err(BridgeError::Closed);
        }
        let _guard = self.call_lock.lock();
        self.state = BridgeState::Closed;
        self.callback = None;
        match self.module.take() {
            Some(module) => module.close(),
            None => Err(BridgeError::Closed),
        }
    }
}

impl fmt::Debug for DynamicBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicBridge")
            .field("path", &self.path())
            .field("contract", &self.contract)
            .field("symbols", &self.symbols)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests;
