//! Dynbridge - Typed Dynamic Module Bridge
//!
//! Loads a shared module at runtime, resolves its C-linkage entry points by
//! name and exchanges null-terminated string payloads with it, including a
//! host callback the module may call back into.
//!
//! # Module contract
//!
//! ```text
//! int32_t init(char *(*callback)(const char *));   // 0 = accepted
//! char   *call(const char *request_tag);           // response or NULL
//! void    release(char *response);                 // optional
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dynbridge::{CallOutcome, DynamicBridge, ModuleContract};
//!
//! dynbridge::host_callback! {
//!     fn print_echo(payload) {
//!         println!("Received String From Module: {}", String::from_utf8_lossy(payload));
//!     }
//! }
//!
//! # fn main() -> Result<(), dynbridge::BridgeError> {
//! // SAFETY: libbinance.so exports `init` and `call` with the standard signatures.
//! let contract = unsafe { ModuleContract::standard() };
//! let mut bridge = DynamicBridge::open("./libbinance.so", contract)?;
//! bridge.register_callback(print_echo)?;
//!
//! if let CallOutcome::Response(body) = bridge.invoke("exchange_info")? {
//!     println!("{}", body);
//! }
//! bridge.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use bridge::{
    module_filename, BridgeState, CallFn, CallOutcome, DynamicBridge, HostCallback, InitFn,
    ModuleContract, ModuleHandle, ModuleLocator, Payload, ReleaseFn,
};
pub use config::{BridgeConfig, ConfigError, ConfigResult};
pub use error::{BridgeError, BridgeResult};

#[doc(hidden)]
pub use tracing;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
