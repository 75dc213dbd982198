use mushaf_base::pal::http::HttpServerConfig;
use mushaf_base::{FilePath, MushafError, MushafResult, Pal, ResultExt};
use serde::Deserialize;
use tracing::{info, instrument};

/// Configuration of a mushaf server, read from `mushaf.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Title reported by the info endpoint.
    #[serde(default = "default_title")]
    pub title: String,
    /// Path of the primary corpus JSON file.
    pub corpus: String,
    /// Directory holding one JSON file per translation.
    #[serde(default)]
    pub translations_dir: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 4,
        }
    }
}

impl ServerConfig {
    pub fn to_http_config(&self) -> HttpServerConfig {
        HttpServerConfig::new(self.host.clone())
            .with_port(self.port)
            .with_workers(self.workers)
    }
}

/// `[search]` section: page sizes for the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl SearchConfig {
    /// Apply the default to a missing limit and cap a requested one.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

fn default_title() -> String {
    "Mushaf".to_string()
}

/// Parse configuration from TOML text.
pub fn parse_config(text: &str) -> MushafResult<Config> {
    let config: Config = toml::from_str(text)
        .map_err(|e| Box::new(MushafError::load_failure("configuration", e.to_string())))?;
    if config.search.default_limit > config.search.max_limit {
        return Err(Box::new(MushafError::load_failure(
            "configuration",
            format!(
                "search.default_limit ({}) exceeds search.max_limit ({})",
                config.search.default_limit, config.search.max_limit
            ),
        )));
    }
    Ok(config)
}

/// Read and parse a configuration file through the PAL.
#[instrument(skip(pal), fields(path = %path))]
pub fn load_config(pal: &dyn Pal, path: &FilePath) -> MushafResult<Config> {
    let text = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config = parse_config(&text).with_context(|| format!("Invalid config file {}", path))?;
    info!(title = %config.title, corpus = %config.corpus, "configuration loaded");
    Ok(config)
}
