use computer_use::errors::ProviderError;
use computer_use::models::message::MessageContent;
use computer_use::providers::base::{RawRequest, RawResponse};
use computer_use::tools::ToolResult;
use console::style;
use serde_json::Value;
use std::sync::Mutex;

const INDENT: &str = "    ";
const MAX_STRING_LENGTH: usize = 300;

pub fn render_content(block: &MessageContent) {
    match block {
        MessageContent::Text(text) => println!("{}", text.text),
        MessageContent::ToolUse(tool_use) => {
            println!();
            println!(
                "─── {} | {} ──────────────────────────",
                style(&tool_use.name),
                style(&tool_use.id).magenta().dim(),
            );
            match tool_use.input.get("command") {
                Some(Value::String(command)) if tool_use.name == "bash" => {
                    println!("{}: {}", style("command").dim(), style(command).green());
                }
                _ => print_params(&tool_use.input, 0),
            }
        }
        // the model does not send images or tool results
        _ => {}
    }
}

pub fn render_tool_result(result: &ToolResult, _tool_use_id: &str) {
    if let Some(system) = &result.system {
        println!("{}", style(system).yellow());
    }
    if let Some(output) = &result.output {
        println!("{}", style(truncate(output)).dim());
    }
    if let Some(error) = &result.error {
        println!("{}", style(truncate(error)).red());
    }
    if result.base64_image.is_some() {
        println!("{}", style("[image]").cyan());
    }
    println!();
}

/// Logs every exchange and keeps the last failure so the process can exit with it
#[derive(Default)]
pub struct ExchangeLog {
    failure: Mutex<Option<String>>,
}

impl ExchangeLog {
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().ok().and_then(|failure| failure.clone())
    }

    pub fn record(
        &self,
        request: &RawRequest,
        response: Option<&RawResponse>,
        error: Option<&ProviderError>,
    ) {
        let status = response.map(|response| response.status);
        tracing::debug!(url = %request.url, ?status, "api exchange");
        tracing::trace!(request = %request.body, "api request body");
        if let Some(response) = response {
            tracing::trace!(response = %response.body, "api response body");
        }

        if let Some(error) = error {
            tracing::warn!(url = %request.url, error = %error, "api call failed");
            if let Ok(mut failure) = self.failure.lock() {
                *failure = Some(error.to_string());
            }
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_STRING_LENGTH * 10 {
        let kept: String = text.chars().take(MAX_STRING_LENGTH * 10).collect();
        format!("{}\n[... truncated]", kept)
    } else {
        text.to_string()
    }
}

/// Format and print parameters recursively with proper indentation and colors
fn print_params(value: &Value, depth: usize) {
    let indent = INDENT.repeat(depth);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", indent, style(key).dim());
                        print_params(val, depth + 1);
                    }
                    Value::String(s) if s.len() > MAX_STRING_LENGTH => {
                        println!("{}{}: {}", indent, style(key).dim(), style("...").dim());
                    }
                    Value::String(s) => {
                        println!("{}{}: {}", indent, style(key).dim(), style(s).green());
                    }
                    other => {
                        println!("{}{}: {}", indent, style(key).dim(), style(other).blue());
                    }
                }
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{}{}.", indent, i + 1);
                print_params(item, depth + 1);
            }
        }
        Value::String(s) if s.len() > MAX_STRING_LENGTH => {
            println!(
                "{}{}",
                indent,
                style(format!("[REDACTED: {} chars]", s.len())).yellow()
            );
        }
        Value::String(s) => println!("{}{}", indent, style(s).green()),
        other => println!("{}{}", indent, style(other).yellow()),
    }
}
