use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// Directory holding the named prompt templates (`sql`, `idk`, `graph`)
    #[validate(length(min = 1, message = "Prompt directory cannot be empty"))]
    pub prompt_dir: String,

    /// Directory holding the page templates
    #[validate(length(min = 1, message = "Template directory cannot be empty"))]
    pub template_dir: String,

    /// Base URL of the OpenAI-compatible completion service
    #[validate(length(min = 1, message = "Completion base URL cannot be empty"))]
    pub completion_base_url: String,

    /// Completion model identifier
    #[validate(length(min = 1, message = "Completion model cannot be empty"))]
    pub completion_model: String,

    /// Process-default API key. Requests may carry their own key, which takes
    /// precedence; the key is threaded through each request rather than held
    /// in any mutable global.
    #[serde(skip_serializing, default)]
    pub default_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 5000,
            prompt_dir: "./prompts".to_string(),
            template_dir: "./tpl".to_string(),
            completion_base_url: "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-3.5-turbo-instruct".to_string(),
            default_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("SQLSCRIBE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("SQLSCRIBE_PORT", "5000")?,
            prompt_dir: env::var("SQLSCRIBE_PROMPT_DIR")
                .unwrap_or_else(|_| "./prompts".to_string()),
            template_dir: env::var("SQLSCRIBE_TEMPLATE_DIR")
                .unwrap_or_else(|_| "./tpl".to_string()),
            completion_base_url: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            completion_model: env::var("OPENAI_ENGINE")
                .unwrap_or_else(|_| "gpt-3.5-turbo-instruct".to_string()),
            default_api_key: read_api_key(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            http_host: cli.http_host,
            http_port: cli.http_port,
            prompt_dir: cli.prompt_dir,
            template_dir: cli.template_dir,
            completion_base_url: cli.completion_base_url,
            completion_model: cli.completion_model,
            // The credential is never a CLI flag; it comes from the
            // environment (or per request from the UI).
            default_api_key: read_api_key(),
        };

        config.validate()?;
        Ok(config)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub http_host: String,
    pub http_port: u16,
    pub prompt_dir: String,
    pub template_dir: String,
    pub completion_base_url: String,
    pub completion_model: String,
}

fn read_api_key() -> Option<String> {
    env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
