//! Where the plug-in finds its configuration

use ccbridge_core::{RequestConfig, Result};
use std::path::{Path, PathBuf};

/// Explicit path to the INI file
pub const CONFIG_PATH_VAR: &str = "CCBRIDGE_CONFIG";

/// File looked up next to the plug-in library
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Path of the INI file to load.
///
/// `CCBRIDGE_CONFIG` when set, else `config.ini` in the directory this library was loaded from,
/// else `config.ini` beside the host executable when the library path cannot be determined.
#[cfg_attr(feature = "static-config", allow(dead_code))]
pub fn config_path() -> Option<PathBuf> {
    resolve(
        std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from),
        process_path::get_dylib_path().as_deref(),
        std::env::current_exe().ok().as_deref(),
    )
}

#[cfg_attr(feature = "static-config", allow(dead_code))]
fn resolve(explicit: Option<PathBuf>, module: Option<&Path>, exe: Option<&Path>) -> Option<PathBuf> {
    let beside = |file: &Path| file.parent().map(|dir| dir.join(CONFIG_FILE_NAME));

    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| module.and_then(beside))
        .or_else(|| exe.and_then(beside))
}

/// Configuration for one call
#[cfg(not(feature = "static-config"))]
pub fn request_config() -> Result<RequestConfig> {
    match config_path() {
        Some(path) => RequestConfig::load(path),
        None => RequestConfig::from_env(),
    }
}

/// Configuration for one call, fixed at build time
#[cfg(feature = "static-config")]
pub fn request_config() -> Result<RequestConfig> {
    let config = RequestConfig::compiled();
    config.validate()?;
    Ok(config)
}
