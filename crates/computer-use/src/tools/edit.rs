use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::base::Tool;
use super::result::ToolResult;
use crate::errors::ToolError;
use crate::models::tool::ToolParam;

/// Views, creates and edits files, keeping an undo history per file.
/// A `None` entry records that the file did not exist before `create`.
#[derive(Default)]
pub struct EditTool {
    file_history: Mutex<HashMap<PathBuf, Vec<Option<String>>>>,
}

fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidParameters(format!("Missing '{}' parameter", key)))
}

fn numbered(content: &str, first_line: usize) -> String {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:6}\t{}", i + first_line, line))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn read(path: &Path) -> Result<String, ToolError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ToolError::ExecutionError(format!("Failed to read file: {}", e)))
}

async fn write(path: &Path, content: &str) -> Result<(), ToolError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| ToolError::ExecutionError(format!("Failed to write file: {}", e)))
}

impl EditTool {
    pub fn new() -> Self {
        Self::default()
    }

    async fn view(&self, path: &Path, input: &Value) -> Result<ToolResult, ToolError> {
        if path.is_dir() {
            let mut entries = tokio::fs::read_dir(path).await.map_err(|e| {
                ToolError::ExecutionError(format!("Failed to read directory: {}", e))
            })?;
            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                ToolError::ExecutionError(format!("Failed to read directory entry: {}", e))
            })? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with('.') {
                    names.push(name);
                }
            }
            names.sort();
            return Ok(ToolResult::output(format!(
                "Here are the files and directories in {}:\n{}",
                path.display(),
                names.join("\n")
            )));
        }

        let content = read(path).await?;
        let (content, first_line) = match input.get("view_range").and_then(Value::as_array) {
            Some(range) => {
                let bounds: Vec<i64> = range.iter().filter_map(Value::as_i64).collect();
                let [start, end] = bounds[..] else {
                    return Err(ToolError::InvalidParameters(
                        "'view_range' should be a list of two integers".into(),
                    ));
                };
                let lines: Vec<&str> = content.lines().collect();
                if start < 1 || start as usize > lines.len() {
                    return Err(ToolError::InvalidParameters(format!(
                        "Invalid 'view_range': first line {} is outside the file's {} lines",
                        start,
                        lines.len()
                    )));
                }
                let end = if end == -1 {
                    lines.len()
                } else if end < start || end as usize > lines.len() {
                    return Err(ToolError::InvalidParameters(format!(
                        "Invalid 'view_range': last line {} is outside [{}, {}]",
                        end,
                        start,
                        lines.len()
                    )));
                } else {
                    end as usize
                };
                (lines[start as usize - 1..end].join("\n"), start as usize)
            }
            None => (content, 1),
        };

        Ok(ToolResult::output(format!(
            "Here's the result of running `cat -n` on {}:\n{}\n",
            path.display(),
            numbered(&content, first_line)
        )))
    }

    async fn create(&self, path: &Path, file_text: &str) -> Result<ToolResult, ToolError> {
        if path.exists() {
            return Err(ToolError::InvalidParameters(format!(
                "File already exists at: {}. Cannot overwrite files using command `create`.",
                path.display()
            )));
        }
        write(path, file_text).await?;
        self.push_history(path, None).await;
        Ok(ToolResult::output(format!(
            "File created successfully at: {}",
            path.display()
        )))
    }

    async fn str_replace(
        &self,
        path: &Path,
        old_str: &str,
        new_str: &str,
    ) -> Result<ToolResult, ToolError> {
        let content = read(path).await?;
        match content.matches(old_str).count() {
            0 => {
                return Err(ToolError::InvalidParameters(format!(
                    "No replacement was performed, old_str `{}` did not appear verbatim in {}.",
                    old_str,
                    path.display()
                )))
            }
            1 => {}
            _ => {
                return Err(ToolError::InvalidParameters(format!(
                    "No replacement was performed. Multiple occurrences of old_str `{}`. Please ensure it is unique",
                    old_str
                )))
            }
        }

        write(path, &content.replacen(old_str, new_str, 1)).await?;
        self.push_history(path, Some(content)).await;
        Ok(ToolResult::output(format!(
            "The file {} has been edited.",
            path.display()
        )))
    }

    async fn insert(
        &self,
        path: &Path,
        insert_line: usize,
        new_str: &str,
    ) -> Result<ToolResult, ToolError> {
        let content = read(path).await?;
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        if insert_line > lines.len() {
            return Err(ToolError::InvalidParameters(format!(
                "Invalid `insert_line` parameter: {}. It should be within the range of lines of the file: [0, {}]",
                insert_line,
                lines.len()
            )));
        }

        // splice at the byte offset so untouched lines keep their endings
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let offset: usize = lines[..insert_line].iter().map(|line| line.len()).sum();
        let (before, after) = content.split_at(offset);
        let mut new_content = String::with_capacity(content.len() + new_str.len() + 2);
        new_content.push_str(before);
        if before.is_empty() || before.ends_with('\n') {
            new_content.push_str(new_str);
            new_content.push_str(newline);
        } else {
            // appending after a last line with no terminator
            new_content.push_str(newline);
            new_content.push_str(new_str);
        }
        new_content.push_str(after);

        write(path, &new_content).await?;
        self.push_history(path, Some(content)).await;
        Ok(ToolResult::output(format!(
            "The file {} has been edited.",
            path.display()
        )))
    }

    async fn undo_edit(&self, path: &Path) -> Result<ToolResult, ToolError> {
        let previous = self
            .file_history
            .lock()
            .await
            .get_mut(path)
            .and_then(Vec::pop)
            .ok_or_else(|| {
                ToolError::InvalidParameters(format!("No edit history found for {}.", path.display()))
            })?;
        match previous {
            Some(previous) => write(path, &previous).await?,
            None => tokio::fs::remove_file(path).await.map_err(|e| {
                ToolError::ExecutionError(format!("Failed to remove file: {}", e))
            })?,
        }
        Ok(ToolResult::output(format!(
            "Last edit to {} undone successfully.",
            path.display()
        )))
    }

    async fn push_history(&self, path: &Path, content: Option<String>) {
        self.file_history
            .lock()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .push(content);
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "str_replace_editor"
    }

    fn to_params(&self) -> ToolParam {
        ToolParam::new(
            "str_replace_editor",
            "View, create and edit files. The `command` parameter specifies the operation to perform.",
            json!({
                "type": "object",
                "required": ["command", "path"],
                "properties": {
                    "command": {
                        "enum": ["view", "create", "str_replace", "insert", "undo_edit"],
                        "description": "The command to run."
                    },
                    "path": {
                        "type": "string",
                        "description": "Absolute path to file or directory."
                    },
                    "file_text": {
                        "type": "string",
                        "description": "Required for `create`."
                    },
                    "old_str": {
                        "type": "string",
                        "description": "Required for `str_replace`. Must appear exactly once in the file."
                    },
                    "new_str": {
                        "type": "string",
                        "description": "Replacement for `str_replace`, required text for `insert`."
                    },
                    "insert_line": {
                        "type": "integer",
                        "description": "Required for `insert`. `new_str` is inserted after this line."
                    },
                    "view_range": {
                        "type": "array",
                        "items": {"type": "integer"},
                        "description": "Optional for `view` on a file: [start, end], end -1 for the rest of the file."
                    }
                }
            }),
        )
    }

    async fn call(&self, input: Value) -> Result<ToolResult, ToolError> {
        let command = required_str(&input, "command")?;
        let path = PathBuf::from(required_str(&input, "path")?);
        if !path.is_absolute() {
            return Err(ToolError::InvalidParameters(format!(
                "The path {} is not an absolute path",
                path.display()
            )));
        }
        if command != "create" && !path.exists() {
            return Err(ToolError::InvalidParameters(format!(
                "The path {} does not exist. Please provide a valid path.",
                path.display()
            )));
        }
        if path.is_dir() && command != "view" {
            return Err(ToolError::InvalidParameters(format!(
                "The path {} is a directory and only the `view` command can be used on directories",
                path.display()
            )));
        }

        match command {
            "view" => self.view(&path, &input).await,
            "create" => self.create(&path, required_str(&input, "file_text")?).await,
            "str_replace" => {
                let old_str = required_str(&input, "old_str")?;
                let new_str = input.get("new_str").and_then(Value::as_str).unwrap_or("");
                self.str_replace(&path, old_str, new_str).await
            }
            "insert" => {
                let insert_line = input
                    .get("insert_line")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        ToolError::InvalidParameters("Missing 'insert_line' parameter".into())
                    })?;
                let new_str = required_str(&input, "new_str")?;
                self.insert(&path, insert_line as usize, new_str).await
            }
            "undo_edit" => self.undo_edit(&path).await,
            _ => Err(ToolError::InvalidParameters(format!(
                "Unrecognized command {}. The allowed commands are: view, create, str_replace, insert, undo_edit",
                command
            ))),
        }
    }
}
