//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The file path
//! defaults to `config.yaml` but can be set with `-f` or the `INSIGHTCTL_CONFIG` environment
//! variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `INSIGHTCTL_` override YAML values
//!
//! Nested values use double underscores, e.g. `INSIGHTCTL_CACHE__TTL=6h` sets `cache.ttl`.
//!
//! ## Example
//!
//! ```yaml
//! reporting:
//!   base_url: https://analyticsdata.googleapis.com/v1beta/
//!   timeout: 30s
//! search_console:
//!   timeout: 30s
//! cache:
//!   ttl: 12h
//!   max_capacity: 10000
//! credentials:
//!   custom_api_keys: false
//! log_format: json
//! ```

use clap::{Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// CLI arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "INSIGHTCTL_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit.
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a GA4 report and print the normalized result as JSON
    Report {
        /// GA4 property id, with or without the `properties/` prefix
        #[arg(long)]
        property: String,
        /// Report spec file (YAML or JSON)
        #[arg(long)]
        spec: String,
    },
    /// Resolve the Search Console property for a site and print its top queries
    SearchConsole {
        /// Site URL as stored by the dashboard
        #[arg(long)]
        site_url: String,
        /// Start date (YYYY-MM-DD); defaults to 28 days ago
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Print the Search Console property variants that would be tried for a site
    Candidates {
        #[arg(long)]
        site_url: String,
    },
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub reporting: ReportingConfig,
    pub search_console: SearchConsoleConfig,
    pub cache: CacheConfig,
    pub credentials: CredentialsConfig,
    /// Bearer token used by the CLI. Normally supplied via `INSIGHTCTL_ACCESS_TOKEN`.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub log_format: LogFormat,
}

/// GA4 Data API client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportingConfig {
    pub base_url: Url,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://analyticsdata.googleapis.com/v1beta/").expect("static URL is valid"),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Search Console API client settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConsoleConfig {
    pub base_url: Url,
    /// Per-candidate request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SearchConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://www.googleapis.com/webmasters/v3/").expect("static URL is valid"),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(12 * 60 * 60),
            max_capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsConfig {
    /// The tenant uses its own API credentials. Forces caching off.
    pub custom_api_keys: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reporting: ReportingConfig::default(),
            search_console: SearchConsoleConfig::default(),
            cache: CacheConfig::default(),
            credentials: CredentialsConfig::default(),
            access_token: None,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // `INSIGHTCTL_CONFIG` names the file itself and is not a config key
            .merge(Env::prefixed("INSIGHTCTL_").ignore(&["config"]).split("__"))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.reporting.timeout.is_zero() || self.search_console.timeout.is_zero() {
            return Err(Error::InvalidConfig {
                message: "request timeouts must be greater than zero".to_string(),
            });
        }

        if self.cache.ttl.is_zero() {
            return Err(Error::InvalidConfig {
                message: "cache.ttl must be greater than zero".to_string(),
            });
        }

        for (name, url) in [
            ("reporting.base_url", &self.reporting.base_url),
            ("search_console.base_url", &self.search_console.base_url),
        ] {
            if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be an absolute http(s) URL, got {url}"),
                });
            }
        }

        Ok(())
    }
}
