//! File resolution - glob expansion and destination re-rooting

use crate::error::{BuildError, Result};
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| BuildError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// A trailing `**` component globs to the directories themselves, not their
/// contents; widen the `dir/**` shorthand so it reaches the files below.
fn widened(pattern: &str) -> String {
    if pattern == "**" || pattern.ends_with("/**") {
        format!("{}/*", pattern)
    } else {
        pattern.to_string()
    }
}

/// Expand glob patterns against a source root into an ordered set of
/// relative source paths.
///
/// Patterns apply in declaration order. A `!`-prefixed pattern excludes
/// paths matched so far, and keeps excluding: a later inclusion never
/// resurrects a path an earlier exclusion removed.
pub fn expand(source_root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut included: Vec<PathBuf> = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut exclusions: Vec<Pattern> = Vec::new();

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            let exclusion = compile(negated)?;
            included.retain(|path| {
                let keep = !exclusion.matches_path(path);
                if !keep {
                    seen.remove(path);
                }
                keep
            });
            exclusions.push(exclusion);
            continue;
        }

        let full = source_root.join(widened(pattern));
        let full = full.to_string_lossy();
        let walk = glob::glob(&full).map_err(|e| BuildError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in walk {
            let path = entry.map_err(|e| BuildError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            if !path.is_file() {
                continue;
            }
            let relative = path
                .strip_prefix(source_root)
                .map_err(|_| BuildError::Path {
                    path: path.clone(),
                    root: source_root.to_path_buf(),
                })?
                .to_path_buf();

            if exclusions.iter().any(|ex| ex.matches_path(&relative)) {
                continue;
            }
            if seen.insert(relative.clone()) {
                included.push(relative);
            }
        }
    }

    Ok(included)
}

/// Re-root a source path into the destination root, preserving relative
/// structure. `extension` (without a dot) rewrites the file extension when a
/// task's rule asks for it, e.g. template sources becoming `.html`.
pub fn rewrite_destination(
    source_path: &Path,
    source_root: &Path,
    dest_root: &Path,
    extension: Option<&str>,
) -> Result<PathBuf> {
    let relative = source_path
        .strip_prefix(source_root)
        .map_err(|_| BuildError::Path {
            path: source_path.to_path_buf(),
            root: source_root.to_path_buf(),
        })?;

    let mut dest = dest_root.join(relative);
    if let Some(ext) = extension {
        dest.set_extension(ext.trim_start_matches('.'));
    }
    Ok(dest)
}
