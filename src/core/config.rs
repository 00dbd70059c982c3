use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf};
use tracing::debug;

#[derive(Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

// Configs are debug-logged on startup; keys stay out of the logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &api_key)
            .finish()
    }
}

impl ProviderConfig {
    fn with_base_url(base_url: &str) -> Self {
        ProviderConfig {
            base_url: base_url.to_string(),
            api_key: String::new(),
        }
    }
}

fn default_open_exchange_rates() -> ProviderConfig {
    ProviderConfig::with_base_url("https://openexchangerates.org")
}

fn default_fmp() -> ProviderConfig {
    ProviderConfig::with_base_url("https://financialmodelingprep.com")
}

fn default_alpha_vantage() -> ProviderConfig {
    ProviderConfig::with_base_url("https://www.alphavantage.co")
}

fn default_polygon() -> ProviderConfig {
    ProviderConfig::with_base_url("https://api.polygon.io")
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_open_exchange_rates")]
    pub open_exchange_rates: ProviderConfig,
    #[serde(default = "default_fmp")]
    pub fmp: ProviderConfig,
    #[serde(default = "default_alpha_vantage")]
    pub alpha_vantage: ProviderConfig,
    #[serde(default = "default_polygon")]
    pub polygon: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            open_exchange_rates: default_open_exchange_rates(),
            fmp: default_fmp(),
            alpha_vantage: default_alpha_vantage(),
            polygon: default_polygon(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_currencies() -> Vec<String> {
    ["JPY", "AUD", "CAD", "EUR", "GBP", "KRW"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Files and directories the application reads and writes.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub database: PathBuf,
    pub news_cache: PathBuf,
    pub images_dir: PathBuf,
    pub export_csv: PathBuf,
}

impl DataPaths {
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        DataPaths {
            database: root.join("db.sqlite"),
            news_cache: root.join("cached_news.json"),
            images_dir: root.join("images"),
            export_csv: root.join("files").join("converted.csv"),
        }
    }

    /// Creates the directories the paths live in.
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [
            self.database.parent(),
            self.news_cache.parent(),
            Some(self.images_dir.as_path()),
            self.export_csv.parent(),
        ]
        .into_iter()
        .flatten()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Target currencies offered for ledger conversion.
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currencies: default_currencies(),
            providers: ProvidersConfig::default(),
            server: ServerConfig::default(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "fxledger", "fxledger")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("org", "fxledger", "fxledger")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn data_paths(&self) -> Result<DataPaths> {
        Ok(DataPaths::under(self.default_data_path()?))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn supports_currency(&self, currency: &str) -> bool {
        self.currencies.iter().any(|c| c == currency)
    }
}
