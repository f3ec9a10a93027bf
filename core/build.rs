//! Build script for mxpredict.
//!
//! Only does work with the `mxnet` feature, where it locates `libmxnet`
//! and emits the link directives for the predict API.
//!
//! # Environment Variables
//!
//! - `MXNET_LIB_DIR`: Directory containing `libmxnet.so` (checked first)
//! - `MXNET_HOME`: MXNet installation prefix; `$MXNET_HOME/lib` is searched
//! - `MXNET_SKIP_LINK`: Set to "1" to skip linking (for development)
//!
//! Without either variable, `pkg-config --libs mxnet` is consulted.

use std::env;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=MXNET_LIB_DIR");
    println!("cargo:rerun-if-env-changed=MXNET_HOME");
    println!("cargo:rerun-if-env-changed=MXNET_SKIP_LINK");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");

    if env::var_os("CARGO_FEATURE_MXNET").is_none() {
        return;
    }
    link_mxnet();
}

/// Library directories reported by `pkg-config --libs-only-L mxnet`.
fn pkg_config_lib_dirs() -> Option<Vec<PathBuf>> {
    let output = Command::new("pkg-config")
        .args(["--libs-only-L", "mxnet"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    Some(
        stdout
            .split_whitespace()
            .filter_map(|flag| flag.strip_prefix("-L"))
            .map(PathBuf::from)
            .collect(),
    )
}

/// Find the directory holding libmxnet.
fn find_lib_dirs() -> Vec<PathBuf> {
    if let Ok(dir) = env::var("MXNET_LIB_DIR") {
        return vec![PathBuf::from(dir)];
    }
    if let Ok(home) = env::var("MXNET_HOME") {
        return vec![PathBuf::from(home).join("lib")];
    }
    if let Some(dirs) = pkg_config_lib_dirs() {
        return dirs;
    }
    println!(
        "cargo:warning=libmxnet not located (set MXNET_LIB_DIR or MXNET_HOME); \
         relying on the default linker search path"
    );
    Vec::new()
}

fn link_mxnet() {
    if env::var("MXNET_SKIP_LINK")
        .map(|v| v == "1")
        .unwrap_or(false)
    {
        println!("cargo:warning=Skipping libmxnet link (MXNET_SKIP_LINK=1)");
        return;
    }

    for dir in find_lib_dirs() {
        if !dir.exists() {
            panic!(
                "MXNet library directory does not exist: {}\n\
                 Check MXNET_LIB_DIR / MXNET_HOME.",
                dir.display()
            );
        }
        println!("cargo:rustc-link-search=native={}", dir.display());
        // Use RPATH so binaries find libmxnet on the build machine
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", dir.display());
    }

    println!("cargo:rustc-link-lib=dylib=mxnet");
}
