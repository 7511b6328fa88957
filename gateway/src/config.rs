//! Configuration surface: retry/backoff defaults, the pricing table, and
//! vendor base URLs/credentials, layered with `clap` derive for CLI flags
//! over an optional TOML file, falling back to the defaults stated below
//! when neither is given.
//!
//! No HTTP bind address lives here: the transport/routing surface is out of
//! scope for the core, and this binary never opens a socket.

use clap::Parser;
use gateway_core::entities::Vendor;
use gateway_core::pricing::PricingTable;
use gateway_retry::RetryPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// `gatewayctl` CLI flags. A `--config` file, when given, is merged
/// underneath these flags/the built-in defaults: flags win, then the file,
/// then the stated defaults.
#[derive(Debug, Parser)]
#[command(name = "gatewayctl", version, about = "Demonstration driver for the LLM gateway core")]
pub struct CliArgs {
    /// Path to a TOML config file (see `GatewayConfig`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fail closed on idempotency fingerprint mismatch instead of silently
    /// replaying (off by default).
    #[arg(long)]
    pub fail_on_fingerprint_mismatch: bool,

    /// Tenant-supplied content for the demonstration send.
    #[arg(long, default_value = "hello, gateway")]
    pub message: String,

    /// Idempotency key for the demonstration send.
    #[arg(long, default_value = "demo-key-1")]
    pub idempotency_key: String,
}

/// On-disk shape of an optional config file, mirroring the retry policy
/// knobs and the pricing overrides. Every field is optional; absence falls
/// back to the stated default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub max_attempts: Option<usize>,
    pub per_attempt_timeout_ms: Option<u64>,
    pub base_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub jitter_fraction: Option<f64>,
    /// Per-vendor USD-per-1000-tokens overrides, keyed by `vendorA`/`vendorB`.
    pub pricing_usd_per_1k: Option<HashMap<String, f64>>,
}

/// Fully resolved runtime configuration: a [`RetryPolicy`], a
/// [`PricingTable`], and the fingerprint-mismatch tightening switch.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub retry_policy: RetryPolicy,
    pub pricing: PricingTable,
    pub fail_on_fingerprint_mismatch: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("unknown vendor in pricing override: {0}")]
    UnknownVendor(String),
}

impl GatewayConfig {
    /// Builds the stated retry and pricing defaults, with the fingerprint
    /// tightening switch off.
    pub fn defaults() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            pricing: PricingTable::with_defaults(),
            fail_on_fingerprint_mismatch: false,
        }
    }

    /// Loads a [`FileConfig`] from `path` and layers it over the built-in
    /// defaults, then applies `cli` on top.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::defaults();

        if let Some(path) = &cli.config {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            let file: FileConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
            config.apply_file(file)?;
        }

        config.fail_on_fingerprint_mismatch |= cli.fail_on_fingerprint_mismatch;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(v) = file.max_attempts {
            self.retry_policy.max_attempts = v;
        }
        if let Some(v) = file.per_attempt_timeout_ms {
            self.retry_policy.per_attempt_timeout = Duration::from_millis(v);
        }
        if let Some(v) = file.base_backoff_ms {
            self.retry_policy.base_backoff = Duration::from_millis(v);
        }
        if let Some(v) = file.max_backoff_ms {
            self.retry_policy.max_backoff = Duration::from_millis(v);
        }
        if let Some(v) = file.jitter_fraction {
            self.retry_policy.jitter_fraction = v;
        }
        if let Some(overrides) = file.pricing_usd_per_1k {
            for (vendor_name, rate) in overrides {
                let vendor = parse_vendor(&vendor_name)?;
                self.pricing
                    .register(vendor, rust_decimal::Decimal::try_from(rate).unwrap_or_default());
            }
        }
        Ok(())
    }
}

fn parse_vendor(name: &str) -> Result<Vendor, ConfigError> {
    match name {
        "vendorA" => Ok(Vendor::VendorA),
        "vendorB" => Ok(Vendor::VendorB),
        other => Err(ConfigError::UnknownVendor(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = GatewayConfig::defaults();
        assert_eq!(config.retry_policy.max_attempts, 3);
        assert!(!config.fail_on_fingerprint_mismatch);
    }

    #[test]
    fn file_config_overrides_retry_defaults() {
        let mut config = GatewayConfig::defaults();
        config
            .apply_file(FileConfig {
                max_attempts: Some(5),
                per_attempt_timeout_ms: Some(1500),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.retry_policy.max_attempts, 5);
        assert_eq!(config.retry_policy.per_attempt_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn pricing_override_is_a_registration_not_a_code_change() {
        let mut config = GatewayConfig::defaults();
        let mut overrides = HashMap::new();
        overrides.insert("vendorA".to_string(), 0.004);
        config
            .apply_file(FileConfig {
                pricing_usd_per_1k: Some(overrides),
                ..Default::default()
            })
            .unwrap();
        let rate = config.pricing.rate(Vendor::VendorA).unwrap();
        assert_eq!(rate, rust_decimal::Decimal::try_from(0.004).unwrap());
    }

    #[test]
    fn unknown_vendor_override_is_rejected() {
        let mut config = GatewayConfig::defaults();
        let mut overrides = HashMap::new();
        overrides.insert("vendorZ".to_string(), 0.01);
        let err = config
            .apply_file(FileConfig {
                pricing_usd_per_1k: Some(overrides),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownVendor(v) if v == "vendorZ"));
    }
}
