//! Runtime configuration for recipe-relay.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every section has defaults, so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::recipe::prompt::{OutputFormat, RecipeProfile};
use crate::upstream::Credential;

/// Path of the health route; the recipe route may not shadow it.
pub const HEALTH_ROUTE: &str = "/health";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-relay", about = "Pantry-to-recipe streaming relay")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream model API configuration.
    pub upstream: UpstreamConfig,

    /// Recipe prompt and output settings.
    pub recipes: RecipeConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// Path of the recipe generation route.
    pub route: String,

    /// Allow cross-origin requests from any origin.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            route: "/api/generate-recipes".to_string(),
            cors: false,
        }
    }
}

/// Upstream (Anthropic Messages API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of an Anthropic-compatible API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Output-length ceiling in tokens.
    pub max_tokens: u32,

    /// Value of the `anthropic-version` header.
    pub api_version: String,

    /// Name of the environment variable holding the API key.
    pub credential_env: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-haiku-4-5".to_string(),
            max_tokens: 2048,
            api_version: "2023-06-01".to_string(),
            credential_env: "CLAUDE_API_KEY".to_string(),
        }
    }
}

/// Recipe generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeConfig {
    /// Format the model is asked to answer in.
    pub output_format: OutputFormat,

    /// Number of recipes requested from the model.
    pub recipe_count: usize,

    /// Placeholder text sent before the first model fragment.
    pub warmup_fragment: Option<String>,

    /// Custom prompt template. Supports `{pantry_list}` and `{recipe_count}`.
    pub prompt_template: Option<String>,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Json,
            recipe_count: 3,
            warmup_fragment: None,
            prompt_template: None,
        }
    }
}

impl RecipeConfig {
    /// Build the prompt profile the relay runs with.
    pub fn profile(&self) -> RecipeProfile {
        let mut profile =
            RecipeProfile::new(self.output_format).with_recipe_count(self.recipe_count);
        if let Some(template) = &self.prompt_template {
            profile = profile.with_template(template.clone());
        }
        if let Some(warmup) = &self.warmup_fragment {
            profile = profile.with_warmup(warmup.clone());
        }
        profile
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Reject values the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let route = &self.server.route;
        if !route.starts_with('/') {
            bail!("server.route must start with '/', got {route:?}");
        }
        if route == HEALTH_ROUTE {
            bail!("server.route {route:?} collides with the health route");
        }
        if self.recipes.recipe_count == 0 {
            bail!("recipes.recipe_count must be at least 1");
        }
        Ok(())
    }

    /// Read the API credential from the configured environment variable.
    ///
    /// Returns `None` when the variable is unset or blank.
    pub fn credential_from_env(&self) -> Option<Credential> {
        std::env::var(&self.upstream.credential_env)
            .ok()
            .and_then(Credential::new)
    }
}
