//! Path resolution for bookbound directories.
//!
//! Follows the XDG base directory layout.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "bookbound";

/// XDG data directory for bookbound: `~/.local/share/bookbound/`.
///
/// Falls back to the current directory when neither `XDG_DATA_HOME` nor
/// `HOME` is set.
pub fn get_data_dir() -> PathBuf {
    let data_home = env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(|home| PathBuf::from(home).join(".local/share"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });

    data_home.join(APP_DIR)
}

/// Database file path: `~/.local/share/bookbound/bookbound.db`
pub fn get_db_path() -> PathBuf {
    get_data_dir().join("bookbound.db")
}

/// Cover image directory: `~/.local/share/bookbound/covers/`
pub fn get_covers_dir() -> PathBuf {
    get_data_dir().join("covers")
}
