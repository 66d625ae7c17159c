//! External command execution

use crate::core::{ConfigStore, TaskDefinition};
use crate::error::{BuildError, Result};
use crate::ops::OpOutcome;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run the task's `command` option as a shell command in the configured
/// working directory. `{key}` placeholders in the command string are
/// substituted from the resolved configuration before spawning, so e.g. a
/// documentation-generator invocation can carry the guide version.
pub async fn run(task: &TaskDefinition, config: &ConfigStore) -> Result<OpOutcome> {
    let template = task.str_option("command").ok_or_else(|| {
        BuildError::Config(format!("task '{}' has no 'command' option", task.name))
    })?;
    let command = substitute(template, config)?;

    let mut invocation = Command::new("sh");
    invocation.arg("-c").arg(&command).kill_on_drop(true);
    if let Some(cwd) = task.str_option("cwd") {
        invocation.current_dir(config.source_root().join(cwd));
    }
    for (key, value) in task.map_option("env") {
        invocation.env(key, value);
    }

    debug!("spawning: {}", command);
    let output = invocation
        .output()
        .await
        .map_err(|e| BuildError::Config(format!("failed to spawn '{}': {}", command, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);
        warn!("'{}' exited with code {}: {}", command, exit_code, stderr.trim());
        return Err(BuildError::Task {
            task: task.name.clone(),
            file: None,
            cause: format!("'{}' exited with code {}: {}", command, exit_code, stderr.trim()),
        });
    }

    debug!("'{}' produced {} bytes of output", command, output.stdout.len());
    Ok(OpOutcome::default())
}

fn substitute(template: &str, config: &ConfigStore) -> Result<String> {
    let placeholder = Regex::new(r"\{([A-Za-z0-9_.\-]+)\}").expect("valid regex");
    let mut command = String::with_capacity(template.len());
    let mut last_end = 0;
    for capture in placeholder.captures_iter(template) {
        let whole = capture.get(0).expect("match");
        let key = &capture[1];
        command.push_str(&template[last_end..whole.start()]);
        command.push_str(config.require(key)?);
        last_end = whole.end();
    }
    command.push_str(&template[last_end..]);
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{OperationKind, TaskConfig, TaskDefinition};
    use std::collections::BTreeMap;

    fn store() -> ConfigStore {
        let mut entries = BTreeMap::new();
        entries.insert("source".to_string(), ".".to_string());
        entries.insert("dest".to_string(), "dist".to_string());
        entries.insert("version".to_string(), "1.10".to_string());
        ConfigStore::from_entries(entries)
    }

    fn task(command: &str) -> TaskDefinition {
        let mut options = BTreeMap::new();
        options.insert(
            "command".to_string(),
            serde_yaml::Value::String(command.to_string()),
        );
        TaskDefinition::from_config(&TaskConfig {
            name: "guide".to_string(),
            kind: OperationKind::RunExternalCommand,
            src: vec![],
            dest: None,
            options,
        })
    }

    #[test]
    fn test_substitute_version() {
        let command = substitute("sphinx-build -b html {version} ../{version}", &store()).unwrap();
        assert_eq!(command, "sphinx-build -b html 1.10 ../1.10");
    }

    #[test]
    fn test_substitute_unknown_key_fails() {
        assert!(substitute("echo {nope}", &store()).is_err());
    }

    #[tokio::test]
    async fn test_run_success() {
        let result = run(&task("true"), &store()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_reports_code() {
        let err = run(&task("exit 3"), &store()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("guide"));
        assert!(message.contains("code 3"));
    }
}
