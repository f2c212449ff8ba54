// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where gitpluck keeps its own files: the configuration file and
//! the repository store.

use std::path::PathBuf;

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/gitpluck/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("gitpluck").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to repository store directory.
///
/// Uses XDG Base Directory path `$XDG_CACHE_HOME/gitpluck`. Does not check if
/// the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if cache directory cannot be determined.
pub fn default_store_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|path| path.join("gitpluck"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine user directories, is $HOME set?")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("HOME", "/home/blah"), ("XDG_CONFIG_HOME", "/home/blah/.config"), ("XDG_CACHE_HOME", "/home/blah/.cache")])]
    fn xdg_paths() -> anyhow::Result<()> {
        if cfg!(target_os = "linux") {
            assert_eq!(
                default_config_path()?,
                PathBuf::from("/home/blah/.config/gitpluck/config.toml")
            );
            assert_eq!(default_store_dir()?, PathBuf::from("/home/blah/.cache/gitpluck"));
        }

        Ok(())
    }
}
