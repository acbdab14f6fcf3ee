//! Build script for the site crate.
//!
//! Hashes the static assets so templates can append `?v=<hash>` for
//! long-lived browser caching.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

const ASSETS: &[&str] = &["static/css/main.css", "static/js/admin.js"];

fn main() {
    hash_assets();
}

/// Hash every asset in [`ASSETS`] into a single version string.
///
/// Sets `ASSET_VERSION` for use with `env!("ASSET_VERSION")`.
fn hash_assets() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");

    let mut hasher = Sha256::new();
    for asset in ASSETS {
        let path = Path::new(&manifest_dir).join(asset);
        println!("cargo:rerun-if-changed={}", path.display());

        match fs::read(&path) {
            Ok(content) => hasher.update(&content),
            Err(e) => println!("cargo:warning=Could not read {asset}: {e}"),
        }
    }

    let hash = format!("{:x}", hasher.finalize());
    let short_hash = hash.get(..8).unwrap_or(&hash);

    println!("cargo:rustc-env=ASSET_VERSION={short_hash}");
}
