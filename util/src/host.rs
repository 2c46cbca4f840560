//! Host platform utility functions

use std::env::{self, VarError};
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software
/// tree, the directory containing `params/` and `sessions/`.
pub const SW_ROOT_ENV: &str = "SRV_BOT_SW_ROOT";

/// Get the software root directory from the environment.
pub fn get_sw_root() -> Result<PathBuf, VarError> {
    env::var(SW_ROOT_ENV).map(PathBuf::from)
}
