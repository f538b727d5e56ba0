//! Dynbridge Reference Module
//!
//! The module side of the dynbridge contract, built as the `libbinance`
//! shared library:
//!
//! ```text
//! int32_t init(char *(*callback)(const char *));
//! char   *call(const char *request_tag);
//! void    release(char *response);
//! ```
//!
//! Every request tag is printed and echoed back to the host callback.
//! `"ping"` is answered with `"pong"`; other tags get a null response.
//!
//! The module owns its responses. The last one stays valid until the next
//! `call`, which frees it. Hosts that declare `release` may hand it back
//! earlier; a pointer that is not the current response is ignored.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::sync::Mutex;

/// Host callback signature
pub type HostCallback = extern "C" fn(*const c_char) -> *mut c_char;

/// Callback registered by the host, valid until the module is unloaded
static CALLBACK: Mutex<Option<HostCallback>> = Mutex::new(None);

/// Most recent response, freed by the next `call` or by `release`
static LAST_RESPONSE: Mutex<Option<CString>> = Mutex::new(None);

/// Register the host callback. Always accepts it.
#[no_mangle]
pub extern "C" fn init(callback: HostCallback) -> i32 {
    match CALLBACK.lock() {
        Ok(mut slot) => {
            *slot = Some(callback);
            0
        }
        Err(_) => 1,
    }
}

/// Handle one request tag.
///
/// # Safety
///
/// `request_tag` must be null or a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn call(request_tag: *const c_char) -> *mut c_char {
    if request_tag.is_null() {
        return ptr::null_mut();
    }
    let tag = CStr::from_ptr(request_tag);
    println!("Received String From Host: {}", tag.to_string_lossy());

    // Copy out before calling: the host may re-enter `call` from the callback.
    let callback = CALLBACK.lock().ok().and_then(|slot| *slot);
    if let Some(callback) = callback {
        callback(request_tag);
    }

    let Ok(mut last) = LAST_RESPONSE.lock() else {
        return ptr::null_mut();
    };
    *last = respond(tag.to_bytes());
    match last.as_ref() {
        Some(response) => response.as_ptr() as *mut c_char,
        None => ptr::null_mut(),
    }
}

/// Free a response returned by [`call`] ahead of the next call.
///
/// # Safety
///
/// `response` must be null or a pointer returned by `call`. It must not be
/// read after this returns.
#[no_mangle]
pub unsafe extern "C" fn release(response: *mut c_char) {
    if response.is_null() {
        return;
    }
    if let Ok(mut last) = LAST_RESPONSE.lock() {
        let current = last.as_ref().map(|r| r.as_ptr() as *mut c_char);
        if current == Some(response) {
            *last = None;
        }
    }
}

/// Response for a request tag, if any
fn respond(tag: &[u8]) -> Option<CString> {
    match tag {
        b"ping" => CString::new("pong").ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ECHOES: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_echo(_payload: *const c_char) -> *mut c_char {
        ECHOES.fetch_add(1, Ordering::SeqCst);
        ptr::null_mut()
    }

    fn holds_response() -> bool {
        LAST_RESPONSE.lock().unwrap().is_some()
    }

    #[test]
    fn test_respond() {
        assert_eq!(respond(b"ping").unwrap().as_bytes(), b"pong");
        assert!(respond(b"new_order").is_none());
        assert!(respond(b"exchange_info").is_none());
    }

    // One test drives the module globals so parallel tests cannot interleave.
    #[test]
    fn test_contract_round_trip() {
        assert_eq!(init(count_echo), 0);

        // Module-owned: valid until the next call, which frees it.
        let ping = CString::new("ping").unwrap();
        let response = unsafe { call(ping.as_ptr()) };
        assert!(!response.is_null());
        assert_eq!(unsafe { CStr::from_ptr(response) }.to_bytes(), b"pong");
        assert!(holds_response());

        let order = CString::new("new_order").unwrap();
        assert!(unsafe { call(order.as_ptr()) }.is_null());
        assert!(!holds_response());

        // Released early: the slot is emptied, a stale pointer is ignored.
        let response = unsafe { call(ping.as_ptr()) };
        unsafe { release(response) };
        assert!(!holds_response());
        unsafe { release(response) };

        let response = unsafe { call(ping.as_ptr()) };
        unsafe { release(ptr::null_mut()) };
        assert!(holds_response());
        assert_eq!(unsafe { CStr::from_ptr(response) }.to_bytes(), b"pong");

        assert!(unsafe { call(ptr::null()) }.is_null());
        assert_eq!(ECHOES.load(Ordering::SeqCst), 4);
    }
}
