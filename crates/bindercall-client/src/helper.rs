//! Locating and installing the helper binary.
//!
//! Helper builds are shipped per OS range and CPU architecture under
//! `anycall/<sdk-dir>/<abi>/anycall`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CallError, Result};

/// File name of the helper binary inside an asset directory.
pub const HELPER_NAME: &str = "anycall";

/// Oldest supported SDK level.
pub const MIN_SDK: u32 = 19;

/// Pick the helper architecture for a device's supported ABI list.
///
/// Preference is x86_64, x86, arm64, then 32-bit arm.
pub fn select_abi<S: AsRef<str>>(supported: &[S]) -> Option<&'static str> {
    let has = |name: &str| supported.iter().any(|abi| abi.as_ref() == name);
    if has("x86_64") {
        Some("x86_64")
    } else if has("x86") {
        Some("x86")
    } else if has("arm64-v8a") {
        Some("arm64")
    } else if has("armeabi") || has("armeabi-v7a") {
        Some("arm")
    } else {
        None
    }
}

/// ABI list of the machine this process runs on.
pub fn host_abis() -> &'static [&'static str] {
    match std::env::consts::ARCH {
        "x86_64" => &["x86_64", "x86"],
        "x86" => &["x86"],
        "aarch64" => &["arm64-v8a", "armeabi-v7a", "armeabi"],
        "arm" => &["armeabi-v7a", "armeabi"],
        _ => &[],
    }
}

/// Asset directory holding helpers for an SDK level.
pub fn sdk_dir(sdk: u32) -> Result<&'static str> {
    match sdk {
        23.. => Ok("sdk23-25"),
        MIN_SDK..=22 => Ok("sdk19-22"),
        _ => Err(CallError::UnsupportedSdk(sdk)),
    }
}

/// Relative asset path of the helper for an SDK level and architecture.
pub fn asset_path(sdk: u32, abi: &str) -> Result<String> {
    Ok(format!("{HELPER_NAME}/{}/{abi}/{HELPER_NAME}", sdk_dir(sdk)?))
}

/// Find the helper build for a device inside an asset root.
pub fn locate<S: AsRef<str>>(assets: &Path, sdk: u32, supported_abis: &[S]) -> Result<PathBuf> {
    let abi = select_abi(supported_abis).ok_or_else(|| {
        let list: Vec<&str> = supported_abis.iter().map(AsRef::as_ref).collect();
        CallError::UnsupportedAbi(list.join(","))
    })?;
    Ok(assets.join(asset_path(sdk, abi)?))
}

/// Copy `src` to `dst` unless `dst` already holds the same bytes.
///
/// Returns whether a copy was made.
pub fn install_if_changed(src: &Path, dst: &Path) -> Result<bool> {
    let install_err = |source| CallError::Install {
        path: dst.to_path_buf(),
        source,
    };

    let wanted = std::fs::read(src).map_err(|source| CallError::Install {
        path: src.to_path_buf(),
        source,
    })?;
    match std::fs::read(dst) {
        Ok(existing) if existing == wanted => {
            debug!(path = %dst.display(), "helper already up to date");
            return Ok(false);
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(install_err(err)),
    }

    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(install_err)?;
    }
    std::fs::write(dst, &wanted).map_err(install_err)?;
    info!(from = %src.display(), to = %dst.display(), size = wanted.len(), "installed helper");
    Ok(true)
}
