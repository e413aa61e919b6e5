use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// The current user's home: `%APPDATA%` on Windows, `$HOME` elsewhere.
pub fn user_home() -> Result<PathBuf> {
    let var = if cfg!(target_os = "windows") {
        "APPDATA"
    } else {
        "HOME"
    };
    match std::env::var_os(var) {
        Some(v) if !v.is_empty() => Ok(PathBuf::from(v)),
        _ => bail!("{var} is not set; cannot resolve the home directory"),
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(raw: &str) -> Result<PathBuf> {
    if raw == "~" {
        return user_home();
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => Ok(user_home()?.join(rest)),
        None => Ok(PathBuf::from(raw)),
    }
}

/// Resolve the server home directory to an absolute path.
///
/// `None` selects `<user home>/<default_subdir>`. Relative paths are taken from the
/// current working directory.
pub fn resolve_home_dir(configured: Option<String>, default_subdir: &str, create: bool) -> Result<PathBuf> {
    let path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => user_home()?.join(default_subdir),
    };

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("cannot read current directory")?
            .join(path)
    };

    if create {
        std::fs::create_dir_all(&path)
            .with_context(|| format!("cannot create home directory {}", path.display()))?;
    }
    Ok(path)
}

/// Join `file` onto `base` unless it is already absolute.
pub fn resolve_under(base: &Path, file: &str) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}
