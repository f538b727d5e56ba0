//! Build script for the test-double modules
//!
//! Compiles `test/fixtures/echo_module.c` into shared objects with the host C
//! compiler so tests and benches have real modules to load. Each variant's
//! path is exported as a compile-time environment variable. When no compiler
//! is available the variables are left unset and module tests skip.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const FIXTURE: &str = "test/fixtures/echo_module.c";

/// (file stem, env var, extra defines)
const VARIANTS: &[(&str, &str, &[&str])] = &[
    ("echo_module", "DYNBRIDGE_ECHO_MODULE", &[]),
    (
        "rejecting_module",
        "DYNBRIDGE_REJECTING_MODULE",
        &["-DECHO_REJECT_INIT"],
    ),
    (
        "partial_module",
        "DYNBRIDGE_PARTIAL_MODULE",
        &["-DECHO_OMIT_CALL"],
    ),
    (
        "initless_module",
        "DYNBRIDGE_INITLESS_MODULE",
        &["-DECHO_OMIT_INIT"],
    ),
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed={}", FIXTURE);
    println!("cargo:rerun-if-env-changed=CC");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let target = env::var("TARGET").unwrap_or_default();
    let host = env::var("HOST").unwrap_or_default();

    if target != host || target.contains("windows") {
        println!("cargo:warning=Skipping test-double modules for target {}", target);
        return;
    }

    for (stem, var, defines) in VARIANTS {
        let output = out_dir.join(shared_object_name(stem, &target));
        if compile_module(&output, defines) {
            println!("cargo:rustc-env={}={}", var, output.display());
        } else {
            println!("cargo:warning=Failed to compile {}, module tests will skip", stem);
        }
    }
}

/// Compile the fixture into a shared object
fn compile_module(output: &Path, defines: &[&str]) -> bool {
    let cc = env::var("CC").unwrap_or_else(|_| "cc".to_string());
    let status = Command::new(&cc)
        .args(["-shared", "-fPIC", "-O2", "-Wall"])
        .args(defines)
        .arg("-o")
        .arg(output)
        .arg(FIXTURE)
        .status();

    matches!(status, Ok(s) if s.success())
}

fn shared_object_name(stem: &str, target: &str) -> String {
    if target.contains("apple") {
        format!("lib{}.dylib", stem)
    } else {
        format!("lib{}.so", stem)
    }
}
