//! Template rendering - `{{ key }}` substitution into HTML files

use crate::core::{ConfigStore, TaskDefinition};
use crate::error::{BuildError, Result};
use crate::files;
use crate::ops::OpOutcome;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Render every matched template into the destination root.
///
/// Variables are the resolved configuration entries plus any `data` map on
/// the task. A template referencing an undefined variable fails, naming the
/// variable and the file.
pub fn render(task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome> {
    let source_root = config.source_root();
    let dest_base = match &task.dest {
        Some(sub) => config.dest_root().join(sub),
        None => config.dest_root(),
    };
    let extension = task.str_option("ext").unwrap_or("html").to_string();

    let mut variables: BTreeMap<String, String> = config.entries().clone();
    variables.extend(task.map_option("data"));

    let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("valid regex");

    let mut produced = Vec::new();
    for relative in files::expand(&source_root, &task.src)? {
        let source_path = source_root.join(&relative);
        let template = std::fs::read_to_string(&source_path)
            .map_err(|e| BuildError::in_file(&source_path, e.to_string()))?;

        let rendered = substitute(&template, &variables, &placeholder, &source_path)?;

        let dest_path =
            files::rewrite_destination(&source_path, &source_root, &dest_base, Some(&extension))?;
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest_path, rendered)
            .map_err(|e| BuildError::in_file(&dest_path, e.to_string()))?;

        debug!("rendered {} -> {}", source_path.display(), dest_path.display());
        produced.push(dest_path);
    }

    Ok(OpOutcome::files(produced))
}

fn substitute(
    template: &str,
    variables: &BTreeMap<String, String>,
    placeholder: &Regex,
    source_path: &Path,
) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut last_end = 0;
    for capture in placeholder.captures_iter(template) {
        let whole = capture.get(0).expect("match");
        let name = &capture[1];
        let value = variables.get(name).ok_or_else(|| {
            BuildError::in_file(source_path, format!("undefined variable '{}'", name))
        })?;
        rendered.push_str(&template[last_end..whole.start()]);
        rendered.push_str(value);
        last_end = whole.end();
    }
    rendered.push_str(&template[last_end..]);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute() {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").unwrap();
        let out = substitute(
            "<a href=\"{{ urls.api }}?v={{ rev }}\">API</a>",
            &vars(&[("urls.api", "/api/"), ("rev", "123")]),
            &placeholder,
            Path::new("index.ejs"),
        )
        .unwrap();
        assert_eq!(out, "<a href=\"/api/?v=123\">API</a>");
    }

    #[test]
    fn test_undefined_variable_names_file_and_variable() {
        let placeholder = Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").unwrap();
        let err = substitute(
            "{{ missing }}",
            &vars(&[]),
            &placeholder,
            Path::new("pages/about.ejs"),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("missing"));
        assert!(message.contains("pages/about.ejs"));
    }
}
