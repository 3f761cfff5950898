use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::{anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig};
use crate::errors::AgentResult;

pub const COMPUTER_USE_BETA: &str = "computer-use-2024-10-22";
pub const PROMPT_CACHING_BETA: &str = "prompt-caching-2024-07-31";

/// The backends able to serve the messages API
#[derive(
    EnumIter, EnumString, Display, AsRefStr, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    Anthropic = 0,
    Vertex = 1,
    Bedrock = 2,
}

/// How a backend variant shapes the request
#[derive(Debug, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider: ApiProvider,
    /// Whether cache breakpoints are placed on the system prompt and conversation
    pub prompt_caching: bool,
    pub betas: &'static [&'static str],
    /// Images are pruned in chunks of this size
    pub image_truncation_threshold: usize,
    /// Sent as `anthropic_version` in the body; `None` means the header carries it
    pub body_version: Option<&'static str>,
}

static PROFILES: [ProviderProfile; 3] = [
    ProviderProfile {
        provider: ApiProvider::Anthropic,
        prompt_caching: true,
        betas: &[COMPUTER_USE_BETA, PROMPT_CACHING_BETA],
        image_truncation_threshold: 50,
        body_version: None,
    },
    ProviderProfile {
        provider: ApiProvider::Vertex,
        prompt_caching: false,
        betas: &[COMPUTER_USE_BETA],
        image_truncation_threshold: 10,
        body_version: Some("vertex-2023-10-16"),
    },
    ProviderProfile {
        provider: ApiProvider::Bedrock,
        prompt_caching: false,
        betas: &[COMPUTER_USE_BETA],
        image_truncation_threshold: 10,
        body_version: Some("bedrock-2023-05-31"),
    },
];

impl ApiProvider {
    pub fn profile(self) -> &'static ProviderProfile {
        &PROFILES[self as usize]
    }
}

pub fn get_provider(config: ProviderConfig) -> AgentResult<Box<dyn Provider>> {
    Ok(Box::new(AnthropicProvider::new(config)?))
}
