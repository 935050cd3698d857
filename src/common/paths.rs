//! Configuration and log paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/webscenario/` and `~/.local/share/webscenario/`
//! - macOS: `~/Library/Application Support/webscenario/`
//! - Windows: `%APPDATA%\webscenario\`

use std::io;
use std::path::{Component, Path, PathBuf};

const APP_NAME: &str = "webscenario";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("logs"))
}

/// Ensure the log directory exists
pub fn ensure_log_dir() -> io::Result<Option<PathBuf>> {
    if let Some(dir) = log_dir() {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Some(dir))
    } else {
        Ok(None)
    }
}

/// Resolve a screenshot path against the artifacts directory
///
/// Absolute paths are kept as-is.
pub fn artifact_path(artifacts_dir: &Path, output: &Path) -> PathBuf {
    if output.is_absolute() {
        output.to_path_buf()
    } else {
        artifacts_dir.join(output)
    }
}

/// Whether a relative path climbs above its base with `..`
pub fn escapes_base(path: &Path) -> bool {
    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_valid() {
        let dir = config_dir();
        assert!(dir.is_some());
    }

    #[test]
    fn test_artifact_path_joins_relative() {
        let base = Path::new("/tmp/run");
        assert_eq!(
            artifact_path(base, Path::new("shots/a.png")),
            PathBuf::from("/tmp/run/shots/a.png")
        );
    }

    #[test]
    fn test_escapes_base() {
        assert!(escapes_base(Path::new("../a.png")));
        assert!(escapes_base(Path::new("shots/../../a.png")));
        assert!(!escapes_base(Path::new("shots/../a.png")));
        assert!(!escapes_base(Path::new("a.png")));
    }
}
