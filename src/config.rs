//! Configuration management

use crate::dispatch::DispatchMethod;
use crate::error::{BridgeError, Result};
use crate::fx::Pair;
use crate::source::feed::FeedSettings;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatch: DispatchConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Dispatch strategy (blocking, thread, readiness)
    pub method: DispatchMethod,
    /// How long to dispatch for, in seconds (0 = until interrupted)
    pub duration_secs: u64,
    /// Stop after this many events (0 = no limit)
    pub max_events: usize,
    /// Install the SIGINT handler that stops a blocked loop
    pub interrupt_handler: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Simulated pairs, as `BASE/QUOTE`
    pub pairs: Vec<String>,
    /// Interval between rate updates in milliseconds
    pub tick_interval_ms: u64,
    /// Interval between account transactions in milliseconds
    pub account_interval_ms: u64,
    /// Number of simulated accounts
    pub accounts: u64,
}

impl Config {
    /// Load configuration from file, overridden by environment variables
    /// named `FX_BRIDGE__<SECTION>__<KEY>` (e.g. `FX_BRIDGE__DISPATCH__METHOD`)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .to_str()
            .ok_or_else(|| BridgeError::Config(format!("non UTF-8 config path: {}", path.display())))?;

        let settings = config::Config::builder()
            .add_source(config::File::with_name(name))
            .add_source(config::Environment::with_prefix("FX_BRIDGE").separator("__"))
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Load from default locations, falling back to defaults
    pub fn load_default() -> Result<Self> {
        let paths = ["fx-bridge.toml", "~/.config/fx-bridge/config.toml"];

        for path in paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::load(expanded.as_ref());
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Parse a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| BridgeError::Config(e.to_string()))
    }
}

impl DispatchConfig {
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }

    pub fn max_events(&self) -> Option<usize> {
        (self.max_events > 0).then_some(self.max_events)
    }
}

impl FeedConfig {
    pub fn settings(&self) -> Result<FeedSettings> {
        let pairs = self
            .pairs
            .iter()
            .map(|p| Pair::parse(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(FeedSettings {
            pairs,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            account_interval: Duration::from_millis(self.account_interval_ms),
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            method: DispatchMethod::Blocking,
            duration_secs: 60,
            max_events: 0,
            interrupt_handler: true,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            pairs: vec!["EUR/USD".to_string(), "USD/JPY".to_string()],
            tick_interval_ms: 250,
            account_interval_ms: 2000,
            accounts: 1,
        }
    }
}
