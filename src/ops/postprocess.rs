//! Output post-processing - in-place transforms on generated files

use crate::core::{ConfigStore, TaskDefinition};
use crate::error::{BuildError, Result};
use crate::files;
use crate::ops::OpOutcome;
use regex::Regex;
use tracing::debug;

/// Transform already-generated files under the destination root in place.
/// The bundled transform tags `<pre><code>` blocks with a highlight class
/// so a client-side highlighter can pick them up.
pub fn apply(task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome> {
    let dest_root = config.dest_root();
    let class = task.str_option("class").unwrap_or("highlight").to_string();

    // Literal (non-glob) entries must exist: post-processing a file that was
    // never generated is a task failure, not a silent no-op.
    for pattern in &task.src {
        if pattern.starts_with('!') || is_glob(pattern) {
            continue;
        }
        if !dest_root.join(pattern).is_file() {
            return Err(BuildError::in_file(
                dest_root.join(pattern),
                "file to post-process does not exist",
            ));
        }
    }

    let open_tag = Regex::new(r"<pre>\s*<code>").expect("valid regex");

    let mut touched = Vec::new();
    for relative in files::expand(&dest_root, &task.src)? {
        let path = dest_root.join(&relative);
        let html = std::fs::read_to_string(&path)
            .map_err(|e| BuildError::in_file(&path, e.to_string()))?;

        let tagged = open_tag
            .replace_all(&html, format!("<pre class=\"{}\"><code>", class).as_str())
            .into_owned();
        if tagged != html {
            std::fs::write(&path, tagged)
                .map_err(|e| BuildError::in_file(&path, e.to_string()))?;
            debug!("highlighted {}", path.display());
            touched.push(path);
        }
    }

    Ok(OpOutcome::files(touched))
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{OperationKind, TaskConfig, TaskDefinition};
    use std::collections::BTreeMap;

    fn task(src: &[&str]) -> TaskDefinition {
        TaskDefinition::from_config(&TaskConfig {
            name: "highlight".to_string(),
            kind: OperationKind::PostProcessOutput,
            src: src.iter().map(|s| s.to_string()).collect(),
            dest: None,
            options: BTreeMap::new(),
        })
    }

    fn store(dest: &std::path::Path) -> ConfigStore {
        let mut entries = BTreeMap::new();
        entries.insert("source".to_string(), "src".to_string());
        entries.insert("dest".to_string(), dest.display().to_string());
        ConfigStore::from_entries(entries)
    }

    #[test]
    fn test_tags_code_blocks() {
        let dest = std::env::temp_dir().join(format!("sitebuild_hl_{}", std::process::id()));
        std::fs::create_dir_all(dest.join("download")).unwrap();
        std::fs::write(
            dest.join("download/index.html"),
            "<pre><code>let x = 1;</code></pre>",
        )
        .unwrap();

        let outcome = apply(&task(&["download/index.html"]), &store(&dest)).unwrap();
        assert_eq!(outcome.files.len(), 1);
        let html = std::fs::read_to_string(dest.join("download/index.html")).unwrap();
        assert!(html.contains("<pre class=\"highlight\"><code>"));

        std::fs::remove_dir_all(&dest).ok();
    }

    #[test]
    fn test_missing_literal_file_fails() {
        let dest = std::env::temp_dir().join(format!("sitebuild_hl_missing_{}", std::process::id()));
        std::fs::create_dir_all(&dest).unwrap();

        let err = apply(&task(&["download/index.html"]), &store(&dest)).unwrap_err();
        assert!(err.to_string().contains("download/index.html"));

        std::fs::remove_dir_all(&dest).ok();
    }
}
