use async_trait::async_trait;
use indoc::indoc;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;

use super::base::Tool;
use super::result::ToolResult;
use crate::errors::ToolError;
use crate::models::tool::ToolParam;

const TIMEOUT: Duration = Duration::from_secs(120);

/// Runs shell commands with `bash -c`, remembering the working directory between calls
pub struct BashTool {
    initial_dir: PathBuf,
    cwd: Mutex<PathBuf>,
    timeout: Duration,
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new()
    }
}

impl BashTool {
    pub fn new() -> Self {
        Self::in_dir(std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")))
    }

    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> Self {
        let dir = dir.into();
        Self {
            initial_dir: dir.clone(),
            cwd: Mutex::new(dir),
            timeout: TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve(cwd: &Path, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            cwd.join(path)
        }
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn to_params(&self) -> ToolParam {
        ToolParam::new(
            "bash",
            indoc! {"
                Run commands in a bash shell. Stderr is merged into stdout.
                Use `working_dir` to change the directory commands run in; it persists between calls.
                Set `restart` to reset the shell to its initial directory.
            "},
            json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The bash command to run."
                    },
                    "working_dir": {
                        "type": "string",
                        "description": "Directory to change to before running the command."
                    },
                    "restart": {
                        "type": "boolean",
                        "description": "Restart the tool."
                    }
                }
            }),
        )
    }

    async fn call(&self, input: Value) -> Result<ToolResult, ToolError> {
        let mut cwd = self.cwd.lock().await;

        if input.get("restart").and_then(Value::as_bool).unwrap_or(false) {
            *cwd = self.initial_dir.clone();
            return Ok(ToolResult::default().with_system("tool has been restarted."));
        }

        if let Some(dir) = input.get("working_dir").and_then(Value::as_str) {
            let new_cwd = Self::resolve(&cwd, dir);
            if !new_cwd.is_dir() {
                return Err(ToolError::InvalidParameters(format!(
                    "The directory '{}' does not exist",
                    new_cwd.display()
                )));
            }
            *cwd = new_cwd;
        }

        let command = input
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidParameters("no command provided.".into()))?;

        let run = Command::new("bash")
            .arg("-c")
            .arg(format!("{{ {}\n}} 2>&1", command))
            .current_dir(&*cwd)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                ToolError::ExecutionError(format!(
                    "timed out: bash has not returned in {} seconds and must be restarted",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ToolError::ExecutionError(e.to_string()))?;

        // whatever bash itself reports, such as a syntax error, lands on stderr
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(ToolResult::output(text))
        } else {
            Ok(ToolResult::error(text))
        }
    }
}
