//! File syncing into the destination root

use crate::core::{ConfigStore, TaskDefinition};
use crate::error::{BuildError, Result};
use crate::files;
use crate::ops::OpOutcome;
use std::path::Path;
use tracing::debug;

/// Copy matched source files into the destination root, preserving relative
/// structure. A copy is skipped when the destination is at least as new as
/// the source, so repeated runs only touch what changed.
pub fn sync(task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome> {
    let source_root = config.source_root();
    let dest_base = match &task.dest {
        Some(sub) => config.dest_root().join(sub),
        None => config.dest_root(),
    };

    let mut copied = Vec::new();
    for relative in files::expand(&source_root, &task.src)? {
        let source_path = source_root.join(&relative);
        let dest_path = files::rewrite_destination(&source_path, &source_root, &dest_base, None)?;

        if up_to_date(&source_path, &dest_path) {
            continue;
        }
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&source_path, &dest_path)
            .map_err(|e| BuildError::in_file(&source_path, e.to_string()))?;

        debug!("synced {} -> {}", source_path.display(), dest_path.display());
        copied.push(dest_path);
    }

    Ok(OpOutcome::files(copied))
}

fn up_to_date(source: &Path, dest: &Path) -> bool {
    let source_mtime = match std::fs::metadata(source).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    match std::fs::metadata(dest).and_then(|m| m.modified()) {
        Ok(dest_mtime) => dest_mtime >= source_mtime,
        Err(_) => false,
    }
}
