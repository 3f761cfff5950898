use super::factory::ApiProvider;

pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";

/// Connection settings for one backend variant
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ApiProvider,
    /// API key for Anthropic, bearer token for Vertex and Bedrock
    pub api_key: String,
    /// Overrides the default endpoint host
    pub host: Option<String>,
    pub region: Option<String>,
    pub project_id: Option<String>,
}

impl ProviderConfig {
    pub fn anthropic<S: Into<String>>(api_key: S) -> Self {
        Self {
            provider: ApiProvider::Anthropic,
            api_key: api_key.into(),
            host: None,
            region: None,
            project_id: None,
        }
    }

    pub fn vertex<P, R, T>(project_id: P, region: R, token: T) -> Self
    where
        P: Into<String>,
        R: Into<String>,
        T: Into<String>,
    {
        Self {
            provider: ApiProvider::Vertex,
            api_key: token.into(),
            host: None,
            region: Some(region.into()),
            project_id: Some(project_id.into()),
        }
    }

    pub fn bedrock<R: Into<String>, T: Into<String>>(region: R, token: T) -> Self {
        Self {
            provider: ApiProvider::Bedrock,
            api_key: token.into(),
            host: None,
            region: Some(region.into()),
            project_id: None,
        }
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }
}
