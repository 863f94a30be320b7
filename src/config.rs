use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;
use crate::llm::ModelConfig;
use crate::style::{LensProfile, ShotDynamic, StyleParams};

/// Environment variables holding the provider credential, in lookup order
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Configuration for boat-studio
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Hosted model provider settings
    pub provider: ModelConfig,

    /// Queue client settings
    pub client: ClientConfig,

    /// Default style selection for the CLI
    pub style: StyleParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,

    /// Allow cross-origin browser clients
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 25 * 1024 * 1024,
            enable_cors: true,
        }
    }
}

impl Config {
    /// Load configuration from the first config file found
    pub fn load() -> Result<Self> {
        let config_paths = ["boat-studio.toml", "config/boat-studio.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Override settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override settings from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = CREDENTIAL_ENV_VARS.iter().find_map(|key| lookup(key)) {
            self.provider.api_key = Some(api_key);
        }

        if let Some(host) = lookup("BOAT_STUDIO_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("BOAT_STUDIO_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid BOAT_STUDIO_PORT: {}", port),
            }
        }

        if let Some(api_base) = lookup("BOAT_STUDIO_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Some(model) = lookup("BOAT_STUDIO_ANALYSIS_MODEL") {
            self.provider.analysis_model = model;
        }

        if let Some(model) = lookup("BOAT_STUDIO_IMAGE_MODEL") {
            self.provider.image_model = model;
        }

        if let Some(server_url) = lookup("BOAT_STUDIO_SERVER_URL") {
            self.client.server_url = server_url;
        }

        if let Some(output_dir) = lookup("BOAT_STUDIO_OUTPUT_DIR") {
            self.client.output_dir = PathBuf::from(output_dir);
        }
    }

    /// Save configuration to file. The credential is never written.
    pub fn save(&self, path: &str) -> Result<()> {
        let mut sanitized = self.clone();
        sanitized.provider.api_key = None;
        let config_str = toml::to_string_pretty(&sanitized)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than 0"));
        }

        if self.provider.timeout_seconds == 0 || self.client.request_timeout_seconds == 0 {
            return Err(anyhow!("timeouts must be greater than 0"));
        }

        if self.provider.analysis_model.trim().is_empty() || self.provider.image_model.trim().is_empty() {
            return Err(anyhow!("analysis_model and image_model must be set"));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(anyhow!("temperature must be between 0.0 and 2.0"));
        }

        let url = self.client.server_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!("server_url must be an http(s) URL: {}", url));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Boat Studio Configuration:\n\
            - Listen: {}:{}\n\
            - Upload Limit: {} MB\n\
            - Analysis Model: {}\n\
            - Image Model: {}\n\
            - Credential Configured: {}\n\
            - Server URL: {}\n\
            - Output Directory: {}\n\
            - Default Style: {} / {} / {}{}",
            self.server.host,
            self.server.port,
            self.server.max_upload_bytes / (1024 * 1024),
            self.provider.analysis_model,
            self.provider.image_model,
            self.provider.has_credential(),
            self.client.server_url,
            self.client.output_dir.display(),
            self.style.lens,
            self.style.dynamic,
            self.style.location,
            if self.style.include_interiors { " (interiors)" } else { "" }
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.provider.api_key = Some(api_key);
        self
    }

    pub fn with_server_url(mut self, url: String) -> Self {
        self.config.client.server_url = url;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.client.output_dir = dir;
        self
    }

    pub fn with_lens(mut self, lens: LensProfile) -> Self {
        self.config.style.lens = lens;
        self
    }

    pub fn with_dynamic(mut self, dynamic: ShotDynamic) -> Self {
        self.config.style.dynamic = dynamic;
        self
    }

    pub fn with_location(mut self, location: String) -> Self {
        self.config.style.location = location;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
