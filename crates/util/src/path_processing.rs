use std::path::PathBuf;

use dirs_next::{config_dir, home_dir};

/// Expand a leading `~` (Unix or Windows separator) to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}

/// Resolve a configuration file path.
///
/// A non-empty `override_var` environment variable wins (tilde-expanded);
/// otherwise the file lives at `<config_dir>/cogwork/<file_name>`.
pub fn config_file_path(override_var: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = std::env::var(override_var)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("cogwork").join(file_name)
}
