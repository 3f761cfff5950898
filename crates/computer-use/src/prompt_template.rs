use chrono::Local;
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

#[derive(Serialize)]
struct Environment {
    arch: &'static str,
    date: String,
}

/// The environment description given to the model, with the caller's suffix appended
pub fn system_prompt(suffix: &str) -> Result<String, TeraError> {
    let environment = Environment {
        arch: std::env::consts::ARCH,
        date: Local::now().format("%A, %B %-d, %Y").to_string(),
    };
    let mut prompt = load_prompt(SYSTEM_PROMPT, &environment)?;
    if !suffix.is_empty() {
        prompt.push(' ');
        prompt.push_str(suffix);
    }
    Ok(prompt)
}
