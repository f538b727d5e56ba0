//! Bridge Module Tests

use super::*;
use crate::error::BridgeError;

crate::host_callback! {
    fn ignore(_payload) {}
}

#[test]
fn test_open_nonexistent_module() {
    let contract = unsafe { ModuleContract::standard() };
    let locator = ModuleLocator::with_paths(Vec::new());
    let err = DynamicBridge::open_with(&locator, "./no/such/libbinance.so", contract).unwrap_err();
    assert!(matches!(err, BridgeError::Load { .. }));
    assert!(err.to_string().contains("libbinance.so"));
}

#[test]
fn test_load_non_module_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(module_filename("garbage"));
    std::fs::write(&file, b"this is not an object file").unwrap();

    let path = file.canonicalize().unwrap();
    let err = ModuleHandle::load(&path).unwrap_err();
    assert!(matches!(err, BridgeError::Load { .. }));
    // A failed load must not leave the path marked as open
    assert!(!is_open(&path));
}

#[test]
fn test_load_missing_path_is_load_error() {
    let err = ModuleHandle::load("./no/such/dir/libbinance.so").unwrap_err();
    match err {
        BridgeError::Load { path, .. } => {
            assert_eq!(path, std::path::Path::new("./no/such/dir/libbinance.so"))
        }
        other => panic!("expected Load, got {other:?}"),
    }
}

#[test]
fn test_state_display() {
    assert_eq!(BridgeState::Opened.to_string(), "opened");
    assert_eq!(BridgeState::Initialized.to_string(), "initialized");
    assert_eq!(BridgeState::Closed.to_string(), "closed");
}

/// Uses libc as a module that is always present. Its symbols stand in for
/// the contract entry points and are resolved but never called.
#[cfg(target_os = "linux")]
#[test]
fn test_libc_lifecycle() {
    let locator = ModuleLocator::new();
    let Ok(path) = locator.locate("libc.so.6") else {
        return;
    };

    let module = ModuleHandle::load(&path).expect("Failed to load libc");
    assert!(module.exports("getpid"));
    assert!(!module.exports("GETPID"));
    assert!(matches!(
        module.address("no_such_export_abc"),
        Err(BridgeError::SymbolNotFound { ref symbol, .. }) if symbol == "no_such_export_abc"
    ));
    assert!(matches!(
        module.address("bad\0name"),
        Err(BridgeError::InvalidSymbol(_))
    ));

    // One live handle per path
    assert!(matches!(
        ModuleHandle::load(&path),
        Err(BridgeError::AlreadyOpen(_))
    ));

    let contract = unsafe { ModuleContract::trusted("getpid", "getenv", None) };
    let mut bridge = DynamicBridge::from_module(module, contract).expect("contract resolves");
    assert_eq!(bridge.state(), BridgeState::Opened);
    assert_eq!(bridge.path(), Some(path.as_path()));
    assert!(matches!(
        bridge.invoke("new_order"),
        Err(BridgeError::NotInitialized)
    ));

    bridge.close().expect("close succeeds");
    assert_eq!(bridge.state(), BridgeState::Closed);
    assert!(!is_open(&path));
    assert!(matches!(bridge.close(), Err(BridgeError::Closed)));
    assert!(matches!(bridge.invoke("new_order"), Err(BridgeError::Closed)));
    assert!(matches!(
        bridge.register_callback(ignore),
        Err(BridgeError::Closed)
    ));
    assert!(bridge.module().is_err());
    assert!(bridge.path().is_none());

    // A missing contract symbol aborts the open and releases the module
    let contract = unsafe { ModuleContract::trusted("getpid", "no_such_call_export", None) };
    let err = DynamicBridge::open_with(&locator, "libc.so.6", contract).unwrap_err();
    match err {
        BridgeError::SymbolNotFound { symbol, path: p } => {
            assert_eq!(symbol, "no_such_call_export");
            assert_eq!(p, path);
        }
        other => panic!("expected SymbolNotFound, got {other:?}"),
    }
    assert!(!is_open(&path));
}
