//! Deployment configuration.

use crate::agent::DEFAULT_MAX_STEPS;
use crate::error::{Error, Result};
use crate::llm::Turn;
use std::str::FromStr;
use std::time::Duration;

/// Default model for generation
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Settings for one deployment
#[derive(Debug, Clone, PartialEq)]
pub struct MaestroConfig {
    /// Memory owner; not part of the conversation
    pub user_id: String,
    /// Model name
    pub model: String,
    /// Max tokens per generation
    pub max_tokens: usize,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Bound on steps per turn
    pub max_steps: usize,
    /// Bound on each generation call
    pub generation_timeout: Duration,
}

impl Default for MaestroConfig {
    fn default() -> Self {
        Self {
            user_id: "default-user".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            temperature: None,
            max_steps: DEFAULT_MAX_STEPS,
            generation_timeout: Duration::from_secs(120),
        }
    }
}

impl MaestroConfig {
    /// Defaults overridden by `MAESTRO_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(user_id) = lookup("MAESTRO_USER_ID") {
            config.user_id = user_id;
        }
        if let Some(model) = lookup("MAESTRO_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("MAESTRO_MAX_TOKENS") {
            config.max_tokens = parse("MAESTRO_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = lookup("MAESTRO_MAX_STEPS") {
            config.max_steps = parse("MAESTRO_MAX_STEPS", &raw)?;
        }
        if let Some(raw) = lookup("MAESTRO_TIMEOUT_SECS") {
            config.generation_timeout = Duration::from_secs(parse("MAESTRO_TIMEOUT_SECS", &raw)?);
        }
        Ok(config)
    }

    /// A turn for the configured user, bounded by the configured timeout
    pub fn turn(&self) -> Turn {
        Turn::new(self.user_id.clone()).with_timeout(self.generation_timeout)
    }
}

fn parse<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer, got '{raw}'")))
}
