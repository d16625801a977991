use log::warn;
use serde_derive::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// sqlx connection url of the order store
    pub database_url: String,
    pub max_connections: u32,
    /// Pause between matching cycles
    pub match_interval_ms: u64,
    /// Where to expose prometheus metrics; disabled when unset
    pub metrics_addr: Option<String>,
    /// Poll interval of the reporting views
    pub refresh_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            database_url: "sqlite://stock_exchange.db".to_string(),
            max_connections: 4,
            match_interval_ms: 50,
            metrics_addr: None,
            refresh_ms: 2000,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config at `path`, falling back to defaults when the file is
    /// missing or malformed.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Something went wrong reading the runtime config file {}, {:?}",
                    path.display(),
                    e
                );
                return RuntimeConfig::new();
            }
        };
        match Self::parse(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Something went wrong parsing the runtime config file {}, {:?}",
                    path.display(),
                    e
                );
                RuntimeConfig::new()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn match_interval(&self) -> Duration {
        Duration::from_millis(self.match_interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}
