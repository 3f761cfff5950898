use crate::error::{to_env_var, ConfigError};
use computer_use::{ApiProvider, LoopConfig, ProviderConfig, DEFAULT_MAX_TOKENS};
use config::{Config, Environment};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(rename = "type", default = "default_provider")]
    pub kind: ApiProvider,
    /// API key for anthropic, bearer token for vertex and bedrock
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub only_n_most_recent_images: Option<usize>,
    #[serde(default)]
    pub system_prompt_suffix: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("provider.type", default_provider().to_string())?
            .set_default("agent.model", default_model())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("COMPUTER_USE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            match err {
                config::ConfigError::NotFound(field) => ConfigError::MissingEnvVar {
                    env_var: to_env_var(&field),
                },
                err => ConfigError::Other(err),
            }
        })
    }

    /// Connection settings for the selected backend. Fails naming the variable to set
    /// when a credential, region or project the backend needs is absent.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        let provider = &self.provider;
        let api_key = required(&provider.api_key, "provider.api_key")?;
        let config = match provider.kind {
            ApiProvider::Anthropic => ProviderConfig::anthropic(api_key),
            ApiProvider::Vertex => ProviderConfig::vertex(
                required(&provider.project_id, "provider.project_id")?,
                required(&provider.region, "provider.region")?,
                api_key,
            ),
            ApiProvider::Bedrock => {
                ProviderConfig::bedrock(required(&provider.region, "provider.region")?, api_key)
            }
        };

        Ok(match &provider.host {
            Some(host) => config.with_host(host.clone()),
            None => config,
        })
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig::new(self.agent.model.clone(), self.provider.kind)
            .with_max_tokens(self.agent.max_tokens)
            .with_only_n_most_recent_images(self.agent.only_n_most_recent_images)
            .with_system_prompt_suffix(self.agent.system_prompt_suffix.clone())
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, ConfigError> {
    value.clone().ok_or_else(|| ConfigError::MissingEnvVar {
        env_var: to_env_var(field),
    })
}

fn default_provider() -> ApiProvider {
    ApiProvider::Anthropic
}

fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
