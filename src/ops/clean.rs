//! Destination cleaning

use crate::core::ConfigStore;
use crate::error::{BuildError, Result};
use crate::ops::OpOutcome;
use std::path::{Component, Path};
use tracing::debug;

/// Remove the destination root tree, if present.
///
/// Only the configured destination is ever removed; an absolute dest or one
/// reaching outside the working directory via `..` is rejected.
pub fn clean(config: &ConfigStore) -> Result<OpOutcome> {
    let dest = config.dest_root();
    guard(&dest)?;

    if dest.exists() {
        std::fs::remove_dir_all(&dest)
            .map_err(|e| BuildError::in_file(&dest, e.to_string()))?;
        debug!("removed {}", dest.display());
    }
    Ok(OpOutcome::default())
}

fn guard(dest: &Path) -> Result<()> {
    let escapes = dest.as_os_str().is_empty()
        || dest.is_absolute()
        || dest
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(BuildError::Path {
            path: dest.to_path_buf(),
            root: std::env::current_dir().unwrap_or_default(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_guard_rejects_escapes() {
        assert!(guard(&PathBuf::from("/")).is_err());
        assert!(guard(&PathBuf::from("../elsewhere")).is_err());
        assert!(guard(&PathBuf::from("")).is_err());
        assert!(guard(&PathBuf::from("site/dist")).is_ok());
    }
}
