//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the software root, which contains the
/// `params` directory and receives the `sessions` directory.
pub const SW_ROOT_ENV_VAR: &str = "TRAJ_EXEC_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root ({0}) does not exist or is not a directory")]
    InvalidSwRoot(PathBuf),

    #[error("Cannot get the current working directory: {0}")]
    NoWorkingDir(std::io::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software.
///
/// This is the value of `TRAJ_EXEC_ROOT` if it is set, otherwise the current
/// working directory.
pub fn get_sw_root() -> Result<PathBuf, HostError> {
    let root = match std::env::var_os(SW_ROOT_ENV_VAR) {
        Some(r) => PathBuf::from(r),
        None => std::env::current_dir().map_err(HostError::NoWorkingDir)?,
    };

    if !root.is_dir() {
        return Err(HostError::InvalidSwRoot(root));
    }

    Ok(root)
}
