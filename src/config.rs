use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ToolkitError;

pub const DEFAULT_CONFIG_FILE: &str = "mg-toolkit.json";
pub const DEFAULT_API_BASE: &str = "https://www.ebi.ac.uk/metagenomics/api/v1";
pub const DEFAULT_SEARCH_URL: &str = "https://www.ebi.ac.uk/Tools/hmmer/search/phmmer";
pub const DEFAULT_ENA_PORTAL_URL: &str = "https://www.ebi.ac.uk/ena/portal/api/search";
pub const DEFAULT_ENA_BROWSER_URL: &str = "https://www.ebi.ac.uk/ena/browser/api/xml";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub search_url: Option<String>,
    #[serde(default)]
    pub ena_portal_url: Option<String>,
    #[serde(default)]
    pub ena_browser_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Endpoints and client settings after defaults have been applied.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base: String,
    pub search_url: String,
    pub ena_portal_url: String,
    pub ena_browser_url: String,
    pub timeout: Option<Duration>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `mg-toolkit.json` from the working directory when no
    /// path is given. Only an explicitly named file is required to exist.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ToolkitError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Self::resolve_config(Config::default()));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ToolkitError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ToolkitError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        ResolvedConfig {
            api_base: trim_base(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            search_url: config
                .search_url
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            ena_portal_url: config
                .ena_portal_url
                .unwrap_or_else(|| DEFAULT_ENA_PORTAL_URL.to_string()),
            ena_browser_url: trim_base(
                config
                    .ena_browser_url
                    .as_deref()
                    .unwrap_or(DEFAULT_ENA_BROWSER_URL),
            ),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
