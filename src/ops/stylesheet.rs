//! Stylesheet compilation - import inlining and minification

use crate::core::{ConfigStore, TaskDefinition};
use crate::error::{BuildError, Result};
use crate::files;
use crate::ops::OpOutcome;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Compile each matched entry file into one CSS file under the task's
/// destination folder. Options: `inline_imports` (default true) and
/// `minify` (default false).
pub fn compile(task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome> {
    let source_root = config.source_root();
    let dest_base = match &task.dest {
        Some(sub) => config.dest_root().join(sub),
        None => config.dest_root().join("css"),
    };
    let inline_imports = task.bool_option("inline_imports", true);
    let minify = task.bool_option("minify", false);

    let import = Regex::new(r#"@import\s+["']([^"']+)["']\s*;?"#).expect("valid regex");

    let mut produced = Vec::new();
    for relative in files::expand(&source_root, &task.src)? {
        let entry = source_root.join(&relative);
        let mut sheet = load(&entry)?;
        if inline_imports {
            let mut visited = HashSet::new();
            visited.insert(entry.clone());
            sheet = inline(&sheet, &entry, &import, &mut visited)?;
        }
        check_syntax(&sheet, &entry)?;
        if minify {
            sheet = minified(&sheet);
        }

        let stem = entry
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "style".to_string());
        let dest_path = dest_base.join(format!("{}.css", stem));
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest_path, sheet)
            .map_err(|e| BuildError::in_file(&dest_path, e.to_string()))?;

        debug!("compiled {} -> {}", entry.display(), dest_path.display());
        produced.push(dest_path);
    }

    Ok(OpOutcome::files(produced))
}

fn load(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| BuildError::in_file(path, e.to_string()))
}

/// Replace `@import "x"` lines with the imported file's content, following
/// chains. Already-visited files are dropped rather than re-expanded, so
/// import cycles terminate.
fn inline(
    sheet: &str,
    from: &Path,
    import: &Regex,
    visited: &mut HashSet<PathBuf>,
) -> Result<String> {
    let base = from.parent().unwrap_or_else(|| Path::new(""));
    let mut result = String::with_capacity(sheet.len());
    let mut last_end = 0;

    for capture in import.captures_iter(sheet) {
        let whole = capture.get(0).expect("match");
        let target = base.join(&capture[1]);
        result.push_str(&sheet[last_end..whole.start()]);
        if visited.insert(target.clone()) {
            let imported = load(&target)?;
            result.push_str(&inline(&imported, &target, import, visited)?);
        }
        last_end = whole.end();
    }
    result.push_str(&sheet[last_end..]);
    Ok(result)
}

/// Brace balance check with line context
fn check_syntax(sheet: &str, entry: &Path) -> Result<()> {
    let mut depth: i64 = 0;
    for (number, line) in sheet.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(BuildError::in_file(
                            entry,
                            format!("unexpected '}}' at line {}", number + 1),
                        ));
                    }
                }
                _ => {}
            }
        }
    }
    if depth > 0 {
        return Err(BuildError::in_file(
            entry,
            format!("{} unclosed '{{'", depth),
        ));
    }
    Ok(())
}

/// Strip comments and collapse whitespace
fn minified(sheet: &str) -> String {
    let mut out = String::with_capacity(sheet.len());
    let mut chars = sheet.chars().peekable();
    let mut in_comment = false;
    let mut pending_space = false;

    while let Some(ch) = chars.next() {
        if in_comment {
            if ch == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_comment = false;
            }
            continue;
        }
        if ch == '/' && chars.peek() == Some(&'*') {
            chars.next();
            in_comment = true;
            continue;
        }
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            // Whitespace is only significant between identifier characters
            if !matches!(ch, '{' | '}' | ':' | ';' | ',')
                && !matches!(out.chars().last(), None | Some('{' | '}' | ':' | ';' | ','))
            {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(ch);
    }
    out
}
