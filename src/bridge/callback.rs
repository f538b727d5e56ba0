//! Host Callbacks
//!
//! The callback handed to a module through `init`. The module keeps a
//! non-owning reference and may call it any number of times while the
//! module is loaded, so host callbacks are plain `'static` functions.

use std::ffi::CStr;
use std::os::raw::c_char;

/// Host callback signature: `char *(*)(const char *)`.
///
/// The return value is reserved; host callbacks return null.
pub type HostCallback = extern "C" fn(*const c_char) -> *mut c_char;

/// Borrow the bytes a module passed to a host callback.
///
/// A null pointer reads as an empty payload.
///
/// # Safety
///
/// A non-null `ptr` must point to a null-terminated string that outlives
/// the returned slice. Modules only guarantee this for the duration of the
/// callback invocation.
pub unsafe fn payload_bytes<'a>(ptr: *const c_char) -> &'a [u8] {
    if ptr.is_null() {
        return &[];
    }
    CStr::from_ptr(ptr).to_bytes()
}

/// Define a host callback from a body that receives the payload bytes.
///
/// The generated function has the [`HostCallback`] ABI, treats a null
/// argument as an empty payload, keeps panics from unwinding into the
/// module, and always returns null.
///
/// ```
/// dynbridge::host_callback! {
///     /// Print whatever the module sends back.
///     fn print_echo(payload) {
///         println!("Received String From Module: {}", String::from_utf8_lossy(payload));
///     }
/// }
///
/// let _cb: dynbridge::HostCallback = print_echo;
/// ```
#[macro_export]
macro_rules! host_callback {
    ($(#[$meta:meta])* $vis:vis fn $name:ident($payload:ident) $body:block) => {
        $(#[$meta])*
        $vis extern "C" fn $name(
            raw: *const ::std::os::raw::c_char,
        ) -> *mut ::std::os::raw::c_char {
            // SAFETY: the module passes a string valid for this invocation.
            let $payload: &[u8] = unsafe { $crate::bridge::callback::payload_bytes(raw) };
            let outcome = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| $body));
            if outcome.is_err() {
                $crate::tracing::error!(callback = stringify!($name), "host callback panicked");
            }
            ::std::ptr::null_mut()
        }
    };
}
