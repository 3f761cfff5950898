use anyhow::{bail, Context, Result};
use clap::Parser;
use computer_use::errors::ProviderError;
use computer_use::models::message::{Message, MessageContent};
use computer_use::providers::base::{RawRequest, RawResponse};
use computer_use::{sampling_loop, ApiProvider, Callbacks};
use console::style;
use tracing_subscriber::EnvFilter;

mod configuration;
mod error;
mod render;

use configuration::Settings;
use render::{render_content, render_tool_result, ExchangeLog};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// What to ask the model to do
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,

    /// Backend to call: anthropic, vertex or bedrock
    #[arg(short, long)]
    provider: Option<ApiProvider>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum tokens per response
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Keep roughly this many screenshots in the conversation
    #[arg(long)]
    only_n_most_recent_images: Option<usize>,

    /// Extra instructions appended to the system prompt
    #[arg(long)]
    system_prompt_suffix: Option<String>,
}

impl Cli {
    /// Command line flags win over environment settings
    fn apply(self, settings: &mut Settings) -> String {
        if let Some(provider) = self.provider {
            settings.provider.kind = provider;
        }
        if let Some(model) = self.model {
            settings.agent.model = model;
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.agent.max_tokens = max_tokens;
        }
        if self.only_n_most_recent_images.is_some() {
            settings.agent.only_n_most_recent_images = self.only_n_most_recent_images;
        }
        if let Some(suffix) = self.system_prompt_suffix {
            settings.agent.system_prompt_suffix = suffix;
        }
        self.prompt.join(" ")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::new().context("Failed to load settings")?;
    let prompt = cli.apply(&mut settings);

    let provider_config = settings.provider_config()?;
    let config = settings.loop_config();

    let exchanges = ExchangeLog::default();
    let on_api_response =
        |request: &RawRequest, response: Option<&RawResponse>, error: Option<&ProviderError>| {
            exchanges.record(request, response, error)
        };
    let on_content = |block: &MessageContent| render_content(block);
    let on_tool_result = render_tool_result;
    let callbacks = Callbacks::new(&on_content, &on_tool_result, &on_api_response);

    let messages = sampling_loop(
        &config,
        provider_config,
        vec![Message::user().with_text(prompt)],
        &callbacks,
    )
    .await?;

    if let Some(failure) = exchanges.failure() {
        eprintln!("{}", style(&failure).red());
        bail!("model call failed after {} messages", messages.len());
    }
    Ok(())
}
