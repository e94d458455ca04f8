//! Configuration for the banking assistant

use crate::error::{AssistantError, Result};
use bank_llm::providers::{OpenAIConfig, OpenAIProvider};
use bank_utils::{env_or, env_parse, load_dotenv};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Settings shared by the tool loop, the router path and bulk generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Directory holding the CSV datasets
    pub data_dir: PathBuf,

    /// Model driving the tool-chaining loop
    pub model: String,

    /// Model used by the JSON query parser
    pub parser_model: String,

    /// Model used for answers on the router path and bulk commentary
    pub commentary_model: String,

    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,

    pub api_base: String,

    /// Temperature of the tool-chaining loop
    pub chat_temperature: f32,

    /// Temperature of final answers and generated commentary
    pub answer_temperature: f32,

    pub max_tokens: usize,

    /// Ceiling on tool dispatches per question
    pub max_tool_calls: usize,

    /// Timeout of one parallel fetch branch
    pub fetch_timeout: Duration,

    /// Worker count of the parallel fetcher
    pub fetch_workers: usize,

    /// Price lookups in flight at once
    pub price_concurrency: usize,

    pub price_timeout: Duration,

    pub price_requests_per_second: u32,

    /// Timeout of one model request
    pub llm_timeout: Duration,

    /// Save the comment cache after this many new comments
    pub bulk_save_interval: usize,

    pub bulk_requests_per_second: u32,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Data"),
            model: "gpt-4-turbo-preview".to_string(),
            parser_model: "gpt-4o".to_string(),
            commentary_model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            chat_temperature: 0.5,
            answer_temperature: 0.3,
            max_tokens: 4096,
            max_tool_calls: 50,
            fetch_timeout: Duration::from_secs(30),
            fetch_workers: 2,
            price_concurrency: 5,
            price_timeout: Duration::from_secs(10),
            price_requests_per_second: 10,
            llm_timeout: Duration::from_secs(60),
            bulk_save_interval: 10,
            bulk_requests_per_second: 2,
        }
    }
}

impl AssistantConfig {
    /// Create a new configuration builder
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }

    /// Defaults overridden by `.env` and the process environment.
    ///
    /// Reads `BANK_DATA_DIR`, `OPENAI_MODEL`, `OPENAI_API_KEY`,
    /// `OPENAI_API_BASE`, `OPENAI_TIMEOUT_SECS` and `BANK_MAX_TOOL_CALLS`.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        let defaults = Self::default();

        let mut builder = Self::builder()
            .data_dir(env_or("BANK_DATA_DIR", "Data"))
            .model(env_or("OPENAI_MODEL", &defaults.model))
            .api_base(env_or("OPENAI_API_BASE", &defaults.api_base));

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            builder = builder.api_key(key);
        }
        if let Some(limit) = env_parse::<usize>("BANK_MAX_TOOL_CALLS") {
            builder = builder.max_tool_calls(limit);
        }
        if let Some(secs) = env_parse::<u64>("OPENAI_TIMEOUT_SECS") {
            builder = builder.llm_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_tool_calls == 0 {
            return Err(AssistantError::Config(
                "max_tool_calls must be greater than 0".to_string(),
            ));
        }
        if self.fetch_workers == 0 || self.price_concurrency == 0 {
            return Err(AssistantError::Config(
                "worker counts must be greater than 0".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() || self.price_timeout.is_zero() || self.llm_timeout.as_secs() == 0 {
            return Err(AssistantError::Config("timeouts must be non-zero".to_string()));
        }
        if self.price_requests_per_second == 0 || self.bulk_requests_per_second == 0 {
            return Err(AssistantError::Config(
                "rate limits must be greater than 0".to_string(),
            ));
        }
        if self.bulk_save_interval == 0 {
            return Err(AssistantError::Config(
                "bulk_save_interval must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.chat_temperature)
            || !(0.0..=2.0).contains(&self.answer_temperature)
        {
            return Err(AssistantError::Config(
                "temperatures must be between 0 and 2".to_string(),
            ));
        }
        Ok(())
    }

    /// OpenAI provider for this configuration; fails without an API key
    pub fn provider(&self) -> Result<OpenAIProvider> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            AssistantError::Config("OPENAI_API_KEY not found in environment variables".to_string())
        })?;
        let config = OpenAIConfig::new(key)
            .with_api_base(&self.api_base)
            .with_timeout(self.llm_timeout.as_secs());
        Ok(OpenAIProvider::with_config(config)?)
    }
}

/// Builder for AssistantConfig
#[derive(Debug, Default)]
pub struct AssistantConfigBuilder {
    data_dir: Option<PathBuf>,
    model: Option<String>,
    parser_model: Option<String>,
    commentary_model: Option<String>,
    api_key: Option<String>,
    api_base: Option<String>,
    chat_temperature: Option<f32>,
    answer_temperature: Option<f32>,
    max_tokens: Option<usize>,
    max_tool_calls: Option<usize>,
    fetch_timeout: Option<Duration>,
    fetch_workers: Option<usize>,
    price_concurrency: Option<usize>,
    price_timeout: Option<Duration>,
    llm_timeout: Option<Duration>,
    bulk_save_interval: Option<usize>,
}

impl AssistantConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn parser_model(mut self, model: impl Into<String>) -> Self {
        self.parser_model = Some(model.into());
        self
    }

    pub fn commentary_model(mut self, model: impl Into<String>) -> Self {
        self.commentary_model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn chat_temperature(mut self, temperature: f32) -> Self {
        self.chat_temperature = Some(temperature);
        self
    }

    pub fn answer_temperature(mut self, temperature: f32) -> Self {
        self.answer_temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tool dispatch ceiling
    pub fn max_tool_calls(mut self, limit: usize) -> Self {
        self.max_tool_calls = Some(limit);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn fetch_workers(mut self, workers: usize) -> Self {
        self.fetch_workers = Some(workers);
        self
    }

    pub fn price_concurrency(mut self, concurrency: usize) -> Self {
        self.price_concurrency = Some(concurrency);
        self
    }

    pub fn price_timeout(mut self, timeout: Duration) -> Self {
        self.price_timeout = Some(timeout);
        self
    }

    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    pub fn bulk_save_interval(mut self, interval: usize) -> Self {
        self.bulk_save_interval = Some(interval);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AssistantConfig> {
        let defaults = AssistantConfig::default();

        let config = AssistantConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            model: self.model.unwrap_or(defaults.model),
            parser_model: self.parser_model.unwrap_or(defaults.parser_model),
            commentary_model: self.commentary_model.unwrap_or(defaults.commentary_model),
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            api_base: self.api_base.unwrap_or(defaults.api_base),
            chat_temperature: self.chat_temperature.unwrap_or(defaults.chat_temperature),
            answer_temperature: self.answer_temperature.unwrap_or(defaults.answer_temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            max_tool_calls: self.max_tool_calls.unwrap_or(defaults.max_tool_calls),
            fetch_timeout: self.fetch_timeout.unwrap_or(defaults.fetch_timeout),
            fetch_workers: self.fetch_workers.unwrap_or(defaults.fetch_workers),
            price_concurrency: self.price_concurrency.unwrap_or(defaults.price_concurrency),
            price_timeout: self.price_timeout.unwrap_or(defaults.price_timeout),
            price_requests_per_second: defaults.price_requests_per_second,
            llm_timeout: self.llm_timeout.unwrap_or(defaults.llm_timeout),
            bulk_save_interval: self.bulk_save_interval.unwrap_or(defaults.bulk_save_interval),
            bulk_requests_per_second: defaults.bulk_requests_per_second,
        };

        config.validate()?;
        Ok(config)
    }
}
