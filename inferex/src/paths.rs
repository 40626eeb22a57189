use std::path::PathBuf;

pub const HOME_ENV: &str = "INFEREX_HOME";

/// Resolve the inferex home directory (credentials live here).
///
/// A non-blank `INFEREX_HOME` value wins; otherwise `<config_dir>/inferex`,
/// falling back to `~/.inferex` on platforms without a config directory.
pub(crate) fn home_dir_from(override_value: Option<String>) -> Result<PathBuf, std::io::Error> {
    if let Some(v) = override_value
        && !v.trim().is_empty()
    {
        return Ok(PathBuf::from(v));
    }

    if let Some(config) = dirs::config_dir() {
        return Ok(config.join("inferex"));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        )
    })?;

    Ok(home.join(".inferex"))
}
