use anyhow::Context;
use clap::Parser;
use claimable_claim::{ClaimPolicy, DEFAULT_PING_INTERVAL, Timestamp};
use claimable_devchain::GENESIS_TIME;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure that can be loaded from CLI or a config file
///
/// Example configuration file content
/// # Claimable scenario runner configuration
///
/// scenario = "scenarios/handover.toml"
///
/// # Policy used when the scenario does not set its own
/// ping_interval = 2592000   # 30 days
/// reset_on_claim = false
///
/// # Virtual chain
/// genesis_time = 1700000000
///
/// # Report destination (stdout when omitted)
/// output = "report.json"
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Scenario file to run (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Seconds a ping pushes the expiration past the current time
    #[arg(short, long, default_value_t = DEFAULT_PING_INTERVAL)]
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,

    /// Clear the claimer set and start a fresh window after a successful claim
    #[arg(long)]
    pub reset_on_claim: bool,

    /// Virtual time the chain starts at, in unix seconds
    #[arg(short, long, default_value_t = GENESIS_TIME)]
    #[serde(default = "default_genesis_time")]
    pub genesis_time: Timestamp,

    /// Write the JSON report to this file instead of stdout
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario: None,
            config: None,
            ping_interval: default_ping_interval(),
            reset_on_claim: false,
            genesis_time: default_genesis_time(),
            output: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.ping_interval == default_ping_interval() {
            self.ping_interval = file_config.ping_interval;
        }
        if self.genesis_time == default_genesis_time() {
            self.genesis_time = file_config.genesis_time;
        }
        if !self.reset_on_claim {
            self.reset_on_claim = file_config.reset_on_claim;
        }

        // For Option fields, CLI takes precedence if Some
        if self.scenario.is_none() {
            self.scenario = file_config.scenario;
        }
        if self.output.is_none() {
            self.output = file_config.output;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let Some(scenario) = self.scenario.as_deref() else {
            return Err(anyhow::anyhow!(
                "A scenario file is required (--scenario or `scenario` in the config file)"
            ));
        };
        if scenario.is_empty() {
            return Err(anyhow::anyhow!("Scenario path cannot be empty"));
        }

        if self.ping_interval == 0 {
            return Err(anyhow::anyhow!("Ping interval must be greater than zero"));
        }

        if let Some(output) = &self.output
            && output.is_empty()
        {
            return Err(anyhow::anyhow!("Output path cannot be empty"));
        }

        Ok(())
    }

    /// Policy applied to deployments that do not configure their own
    pub fn policy(&self) -> ClaimPolicy {
        ClaimPolicy::new(self.ping_interval).with_reset_on_claim(self.reset_on_claim)
    }
}

// Default value functions
fn default_ping_interval() -> u64 {
    DEFAULT_PING_INTERVAL
}

fn default_genesis_time() -> Timestamp {
    GENESIS_TIME
}
