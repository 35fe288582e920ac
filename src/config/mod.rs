use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::TransportKind;
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Protocol server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Transcript provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport used to carry tool invocations
    pub transport: TransportKind,

    /// Address the HTTP transport binds to
    pub host: String,

    /// Port the HTTP transport listens on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Caption languages in priority order
    pub languages: Vec<String>,

    /// Timeout for each request to YouTube, in seconds
    pub timeout_secs: u64,

    /// Optional HTTP(S) proxy for requests to YouTube
    pub proxy: Option<String>,

    /// User agent sent to YouTube
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Http,
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            timeout_secs: 30,
            proxy: None,
            user_agent: concat!("youtube-transcript-mcp/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the given file, the usual locations, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(config_path) => {
                tracing::debug!("Loading configuration from: {}", config_path.display());
                Self::from_file(&config_path)?
            }
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        serde_yaml::from_str(&content)
            .context("Failed to parse config file")
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    fn find_config_file() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        Self::user_config_path()
            .ok()
            .filter(|path| path.exists())
    }

    /// Per-user configuration file path
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("youtube-transcript-mcp").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.languages.is_empty() {
            anyhow::bail!("At least one transcript language must be configured");
        }

        if self.provider.timeout_secs == 0 {
            anyhow::bail!("Provider timeout must be greater than zero");
        }

        if self.server.transport == TransportKind::Http && self.server.port == 0 {
            anyhow::bail!("HTTP transport requires a non-zero port");
        }

        if let Some(proxy) = &self.provider.proxy {
            url::Url::parse(proxy)
                .with_context(|| format!("Invalid proxy URL: {}", proxy))?;
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Transport: {}", self.server.transport);
        println!("  Address: {}:{}", self.server.host, self.server.port);
        println!("  Languages: {}", self.provider.languages.join(", "));
        println!("  Timeout: {}s", self.provider.timeout_secs);
        if let Some(proxy) = &self.provider.proxy {
            println!("  Proxy: {}", proxy);
        }
    }
}
