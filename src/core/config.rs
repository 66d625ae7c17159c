//! Site configuration from YAML

use crate::core::pipeline::PipelineConfig;
use crate::core::task::TaskConfig;
use crate::error::{BuildError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default port for the development server, matching the historical setup.
fn default_port() -> u16 {
    1337
}

/// Top-level site configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Source root, relative to the working directory
    pub source: String,

    /// Destination root every task writes into
    pub dest: String,

    /// Version identifier substituted into external commands
    #[serde(default)]
    pub version: Option<String>,

    /// External URLs made available to templates
    #[serde(default)]
    pub urls: BTreeMap<String, String>,

    /// Free-form variables; values may reference other keys as `${key}`
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Task definitions
    pub tasks: Vec<TaskConfig>,

    /// Named pipelines over the tasks above
    pub pipelines: BTreeMap<String, PipelineConfig>,

    /// Watch subscriptions for interactive development
    #[serde(default)]
    pub watch: Vec<WatchConfig>,

    /// Dev server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// A file-pattern subscription bound to the pipeline it re-runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Glob patterns relative to the source root; `!`-prefixed entries exclude
    pub patterns: Vec<String>,

    /// Pipeline to run when a matching file changes
    pub pipeline: String,
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a YAML file and check the source root exists
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BuildError::Config(format!(
                "cannot read '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config = Self::from_yaml(&content)?;

        if !Path::new(&config.source).is_dir() {
            return Err(BuildError::Config(format!(
                "source root '{}' does not exist",
                config.source
            )));
        }

        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SiteConfig =
            serde_yaml::from_str(yaml).map_err(|e| BuildError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation: unique task names, non-empty pipelines that
    /// only reference known tasks, watch subscriptions that reference known
    /// pipelines.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name.as_str()) {
                return Err(BuildError::DuplicateTask(task.name.clone()));
            }
        }

        if self.pipelines.is_empty() {
            return Err(BuildError::Config("no pipelines defined".into()));
        }

        for (name, pipeline) in &self.pipelines {
            if pipeline.tasks.is_empty() {
                return Err(BuildError::Config(format!(
                    "pipeline '{}' has no tasks",
                    name
                )));
            }
            for task in &pipeline.tasks {
                if !seen.contains(task.as_str()) {
                    return Err(BuildError::UnknownTask(task.clone()));
                }
            }
        }

        for subscription in &self.watch {
            if !self.pipelines.contains_key(&subscription.pipeline) {
                return Err(BuildError::UnknownPipeline(subscription.pipeline.clone()));
            }
            if subscription.patterns.is_empty() {
                return Err(BuildError::Config(
                    "watch subscription has no patterns".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Immutable key/value store resolved once at startup and passed into every
/// task invocation.
///
/// Keys are flattened: `source`, `dest`, `version`, `rev`, `port`,
/// `urls.<name>` and every entry of `vars`. Values may reference other keys
/// as `${key}`; circular references are rejected.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    entries: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Flatten and interpolate the configuration
    pub fn resolve(config: &SiteConfig) -> Result<Self> {
        let mut raw = BTreeMap::new();
        raw.insert("source".to_string(), config.source.clone());
        raw.insert("dest".to_string(), config.dest.clone());
        raw.insert("port".to_string(), config.server.port.to_string());
        if let Some(version) = &config.version {
            raw.insert("version".to_string(), version.clone());
        }
        for (key, value) in &config.urls {
            raw.insert(format!("urls.{}", key), value.clone());
        }
        for (key, value) in &config.vars {
            raw.insert(key.clone(), value.clone());
        }

        // Cache-busting stamp available to templates, like the old
        // `rev: Date.now()` build variable.
        raw.insert(
            "rev".to_string(),
            chrono::Utc::now().timestamp_millis().to_string(),
        );

        let reference = Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("valid regex");
        let mut entries = BTreeMap::new();
        for key in raw.keys() {
            let mut visiting = Vec::new();
            let value = Self::resolve_key(key, &raw, &reference, &mut visiting)?;
            entries.insert(key.clone(), value);
        }

        Ok(Self { entries })
    }

    fn resolve_key(
        key: &str,
        raw: &BTreeMap<String, String>,
        reference: &Regex,
        visiting: &mut Vec<String>,
    ) -> Result<String> {
        if visiting.iter().any(|k| k == key) {
            return Err(BuildError::Config(format!(
                "circular reference: {} -> {}",
                visiting.join(" -> "),
                key
            )));
        }
        let template = raw
            .get(key)
            .ok_or_else(|| BuildError::Config(format!("unknown config key '{}'", key)))?;

        visiting.push(key.to_string());
        let mut resolved = String::with_capacity(template.len());
        let mut last_end = 0;
        for capture in reference.captures_iter(template) {
            let whole = capture.get(0).expect("match");
            let name = &capture[1];
            resolved.push_str(&template[last_end..whole.start()]);
            resolved.push_str(&Self::resolve_key(name, raw, reference, visiting)?);
            last_end = whole.end();
        }
        resolved.push_str(&template[last_end..]);
        visiting.pop();

        Ok(resolved)
    }

    /// Look up a resolved value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Look up a value that must be present
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| BuildError::Config(format!("missing required key '{}'", key)))
    }

    pub fn source_root(&self) -> PathBuf {
        PathBuf::from(self.entries.get("source").map(String::as_str).unwrap_or(""))
    }

    pub fn dest_root(&self) -> PathBuf {
        PathBuf::from(self.entries.get("dest").map(String::as_str).unwrap_or(""))
    }

    /// All resolved entries, for template rendering
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    #[cfg(test)]
    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml(extra: &str) -> String {
        format!(
            r#"
source: site/src
dest: site/dist
{extra}
tasks:
  - name: templates
    kind: render-template
    src: ["**/*.ejs"]
pipelines:
  default:
    tasks: [templates]
"#
        )
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = SiteConfig::from_yaml(&minimal_yaml("")).unwrap();
        assert_eq!(config.source, "site/src");
        assert_eq!(config.dest, "site/dist");
        assert_eq!(config.server.port, 1337);
        assert_eq!(config.tasks.len(), 1);
    }

    #[test]
    fn test_duplicate_task_name_fails() {
        let yaml = r#"
source: src
dest: dist
tasks:
  - name: templates
    kind: render-template
  - name: templates
    kind: sync-files
pipelines:
  default:
    tasks: [templates]
"#;
        let err = SiteConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateTask(name) if name == "templates"));
    }

    #[test]
    fn test_pipeline_with_unknown_task_fails() {
        let yaml = r#"
source: src
dest: dist
tasks:
  - name: templates
    kind: render-template
pipelines:
  default:
    tasks: [templates, styles]
"#;
        let err = SiteConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, BuildError::UnknownTask(name) if name == "styles"));
    }

    #[test]
    fn test_unknown_operation_kind_fails_to_parse() {
        let yaml = r#"
source: src
dest: dist
tasks:
  - name: weird
    kind: transmogrify
pipelines:
  default:
    tasks: [weird]
"#;
        assert!(SiteConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_watch_referencing_unknown_pipeline_fails() {
        let yaml = minimal_yaml(
            r#"watch:
  - patterns: ["**/*.styl"]
    pipeline: styles
"#,
        );
        let err = SiteConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, BuildError::UnknownPipeline(name) if name == "styles"));
    }

    #[test]
    fn test_interpolation() {
        let yaml = minimal_yaml(
            r#"vars:
  css_dest: "${dest}/css"
  fonts_dest: "${css_dest}/fonts"
"#,
        );
        let config = SiteConfig::from_yaml(&yaml).unwrap();
        let store = ConfigStore::resolve(&config).unwrap();
        assert_eq!(store.get("css_dest"), Some("site/dist/css"));
        assert_eq!(store.get("fonts_dest"), Some("site/dist/css/fonts"));
    }

    #[test]
    fn test_interpolation_cycle_rejected() {
        let yaml = minimal_yaml(
            r#"vars:
  a: "${b}"
  b: "${a}"
"#,
        );
        let config = SiteConfig::from_yaml(&yaml).unwrap();
        let err = ConfigStore::resolve(&config).unwrap_err();
        assert!(matches!(err, BuildError::Config(msg) if msg.contains("circular")));
    }

    #[test]
    fn test_interpolation_unknown_key_rejected() {
        let yaml = minimal_yaml(
            r#"vars:
  a: "${nope}"
"#,
        );
        let config = SiteConfig::from_yaml(&yaml).unwrap();
        let err = ConfigStore::resolve(&config).unwrap_err();
        assert!(matches!(err, BuildError::Config(msg) if msg.contains("nope")));
    }

    #[test]
    fn test_urls_are_flattened() {
        let yaml = minimal_yaml(
            r#"urls:
  api: https://example.org/api/
"#,
        );
        let config = SiteConfig::from_yaml(&yaml).unwrap();
        let store = ConfigStore::resolve(&config).unwrap();
        assert_eq!(store.get("urls.api"), Some("https://example.org/api/"));
        assert!(store.get("rev").is_some());
    }

    #[test]
    fn test_require_missing_key() {
        let config = SiteConfig::from_yaml(&minimal_yaml("")).unwrap();
        let store = ConfigStore::resolve(&config).unwrap();
        assert!(store.require("version").is_err());
    }
}
