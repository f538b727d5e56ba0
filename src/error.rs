//! Bridge Errors
//!
//! Load, resolve and init failures abort a bridge session. Module-level
//! call failures are not errors; they come back as [`crate::CallOutcome`].

use std::path::PathBuf;

use thiserror::Error;

/// Error type for bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The module file is missing or the dynamic loader refused it
    #[error("Failed to load module '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    /// The module at this path is already held by a live bridge
    #[error("Module '{}' is already open", .0.display())]
    AlreadyOpen(PathBuf),

    /// A contract symbol is missing from the module's export table
    #[error("Symbol '{symbol}' not found in '{}'", path.display())]
    SymbolNotFound { symbol: String, path: PathBuf },

    /// Symbol name cannot be expressed as a C string
    #[error("Invalid symbol name: {0:?}")]
    InvalidSymbol(String),

    /// The module's init routine rejected the callback
    #[error("Module init rejected callback registration (status {status})")]
    Init { status: i32 },

    /// `invoke` attempted before a successful `register_callback`
    #[error("Module not initialized: register a callback before invoking")]
    NotInitialized,

    /// The bridge was already closed
    #[error("Module handle is closed")]
    Closed,

    /// Request payload cannot cross the boundary as a C string
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// The dynamic loader failed to unload the module
    #[error("Failed to unload module '{}': {reason}", path.display())]
    Unload { path: PathBuf, reason: String },
}

impl BridgeError {
    /// Whether this error ends the bridge session.
    ///
    /// Only payload errors leave the bridge usable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BridgeError::InvalidPayload(_))
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
