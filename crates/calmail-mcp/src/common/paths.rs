//! Path Utilities
//!
//! Resolution of the calmail home directory and the files it holds.

use std::path::PathBuf;

use crate::config::Integration;

/// Environment variable overriding the calmail home directory.
pub const HOME_ENV: &str = "CALMAIL_HOME";

const CLIENT_SECRET_FILE: &str = "credentials.json";

/// Get the calmail base directory (`$CALMAIL_HOME` or `~/.calmail/`)
pub fn calmail_dir() -> Result<PathBuf, String> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or("Could not determine home directory")?;
    Ok(home.join(".calmail"))
}

/// Operator-provided OAuth client secret file.
pub fn client_secret_path(base: &std::path::Path) -> PathBuf {
    base.join(CLIENT_SECRET_FILE)
}

/// Cached token file for one integration.
pub fn token_path(base: &std::path::Path, integration: Integration) -> PathBuf {
    base.join(integration.token_file_name())
}
