//! Payloads
//!
//! Request tags and responses crossing the boundary as null-terminated
//! byte sequences. The bridge never looks inside them.

use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::c_char;

use crate::error::{BridgeError, BridgeResult};

/// An opaque byte payload (request tag or module response)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    /// Create a payload from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Copy a payload out of a foreign null-terminated string.
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a valid null-terminated string that
    /// stays alive for the duration of this call.
    pub unsafe fn from_raw(ptr: *const c_char) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        Some(Self::new(CStr::from_ptr(ptr).to_bytes()))
    }

    /// Raw bytes, without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The payload as UTF-8 text, if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Build the C string handed to the module.
    ///
    /// Interior NUL bytes would silently truncate the tag, so they are rejected.
    pub fn to_c_string(&self) -> BridgeResult<CString> {
        CString::new(self.bytes.clone()).map_err(|e| {
            BridgeError::InvalidPayload(format!(
                "interior NUL byte at offset {}",
                e.nul_position()
            ))
        })
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Self::new(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Self::new(b)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

/// Result of a module `call`.
///
/// A null return is not treated as a failure; whether it means one is up
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The module returned a string
    Response(Payload),
    /// The module returned null
    NoResponse,
}

impl CallOutcome {
    pub fn response(&self) -> Option<&Payload> {
        match self {
            CallOutcome::Response(p) => Some(p),
            CallOutcome::NoResponse => None,
        }
    }

    pub fn into_response(self) -> Option<Payload> {
        match self {
            CallOutcome::Response(p) => Some(p),
            CallOutcome::NoResponse => None,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, CallOutcome::Response(_))
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOutcome::Response(p) => write!(f, "{}", p),
            CallOutcome::NoResponse => write!(f, "(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_null() {
        assert!(unsafe { Payload::from_raw(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_from_raw_copies_bytes() {
        let raw = CString::new("exchange_info").unwrap();
        let payload = unsafe { Payload::from_raw(raw.as_ptr()) }.unwrap();
        drop(raw);
        assert_eq!(payload.as_str(), Some("exchange_info"));
        assert_eq!(payload.len(), 13);
    }

    #[test]
    fn test_interior_nul_rejected() {
        let err = Payload::from(&b"new\0order"[..]).to_c_string().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPayload(ref m) if m.contains("offset 3")));
        assert!(Payload::from("new_order").to_c_string().is_ok());
    }

    #[test]
    fn test_non_utf8_payload() {
        let payload = Payload::new(vec![0x66, 0xff, 0x6f]);
        assert!(payload.as_str().is_none());
        assert_eq!(payload.to_string(), "f\u{fffd}o");
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = CallOutcome::Response(Payload::from("pong"));
        assert!(outcome.is_response());
        assert_eq!(outcome.to_string(), "pong");
        assert_eq!(outcome.into_response(), Some(Payload::from("pong")));

        assert!(CallOutcome::NoResponse.response().is_none());
        assert_eq!(CallOutcome::NoResponse.to_string(), "(null)");
    }
}
