pub mod agent;
pub mod caching;
pub mod callbacks;
pub mod errors;
pub mod images;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod tools;
pub mod translate;

pub use agent::{Agent, LoopConfig, DEFAULT_MAX_TOKENS};
pub use callbacks::Callbacks;
pub use errors::{AgentError, AgentResult};
pub use providers::configs::ProviderConfig;
pub use providers::factory::ApiProvider;

use models::message::Message;
use providers::factory::get_provider;
use tools::ToolCollection;

/// Run the loop against the configured backend with the shell and editor tools
pub async fn sampling_loop(
    config: &LoopConfig,
    provider_config: ProviderConfig,
    messages: Vec<Message>,
    callbacks: &Callbacks<'_>,
) -> AgentResult<Vec<Message>> {
    let provider = get_provider(provider_config)?;
    Agent::new(provider, ToolCollection::default_tools())
        .sampling_loop(config, messages, callbacks)
        .await
}
