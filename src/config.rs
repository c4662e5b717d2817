use crate::catalog;
use crate::client::DEFAULT_BASE_URL;
use crate::models::{Error, Result};
use crate::session::{DEFAULT_GREETING, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REFRESH_SECS: u64 = 30;

/// Values given on the command line; each one replaces the environment's.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub greeting: Option<String>,
    pub refresh_secs: Option<u64>,
}

/// Runtime settings. Every field has a default matching the plugin manifest;
/// the environment (and then CLI flags) may override them.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub greeting: String,
    pub refresh_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            greeting: DEFAULT_GREETING.to_string(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl Settings {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let mut settings = Self::default();
        let get = |name: &str| vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            settings.api_key = key.to_string();
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            settings.base_url = url.to_string();
        }
        if let Some(model) = get("OPENAI_MODEL") {
            settings.model = model.to_string();
        }
        if let Some(greeting) = get("OPENAI_GREETING") {
            settings.greeting = greeting.to_string();
        }
        if let Some(raw) = get("OPENAI_MAX_TOKENS") {
            settings.max_tokens = parse("OPENAI_MAX_TOKENS", raw)?;
        }
        if let Some(raw) = get("OPENAI_TEMPERATURE") {
            settings.temperature = parse("OPENAI_TEMPERATURE", raw)?;
        }
        if let Some(raw) = get("OPENAI_STATUS_REFRESH_SECS") {
            settings.refresh_interval = Duration::from_secs(parse("OPENAI_STATUS_REFRESH_SECS", raw)?);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Applies command-line values and re-validates the result.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(key) = overrides.api_key {
            self.api_key = key.trim().to_string();
        }
        if let Some(model) = overrides.model {
            self.model = model.trim().to_string();
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(greeting) = overrides.greeting.filter(|g| !g.trim().is_empty()) {
            self.greeting = greeting;
        }
        if let Some(secs) = overrides.refresh_secs {
            self.refresh_interval = Duration::from_secs(secs);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !catalog::is_chat_model(&self.model) {
            return Err(Error::Config(format!("unsupported chat model: {:?}", self.model)));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(Error::Config("max_tokens must be positive".to_string()));
        }
        if self.refresh_interval.is_zero() {
            return Err(Error::Config("refresh interval must be at least one second".to_string()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", name, raw)))
}
