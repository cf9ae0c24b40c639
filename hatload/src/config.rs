//! Configuration for a load test run.
//!
//! Configuration is loaded from the following sources, highest precedence first:
//!
//! 1. Environment variables (prefixed with `HATLOAD__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! Flags of the `run` command override all of the above.
//!
//! # Environment Variables
//!
//! Environment variables use `HATLOAD__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `HATLOAD__HOST=http://localhost:3000` sets the storefront host
//! - `HATLOAD__WAIT_TIME__MAX=5s` sets the longest pause between tasks
//! - `HATLOAD__TASKS__BROWSE=10` sets the weight of the browse task
//!
//! # YAML Configuration File
//!
//! ```yaml
//! host: http://localhost:3000
//! duration: 5m
//! users: 50
//! spawn_rate: 5
//! wait_time:
//!   min: 1s
//!   max: 2s
//! tasks:
//!   index: 1
//!   list: 4
//!   browse: 20
//! catalog: compose
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::catalog::{Catalog, CatalogVariant};
use crate::http::HttpRemote;
use crate::scenario::{Scenario, WaitTime};
use crate::task::TaskWeights;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "HATLOAD__";

/// Bounds of the uniform pause between two tasks of a user, see [`WaitTime`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WaitTimeConfig {
    /// Shortest pause. Defaults to `1s`.
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    /// Longest pause. Defaults to `2s`.
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for WaitTimeConfig {
    fn default() -> Self {
        let range = WaitTime::default().range();
        Self {
            min: *range.start(),
            max: *range.end(),
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty output on a TTY, [`LogFormat::Simplified`] otherwise.
    Auto,
    /// Pretty printing with colors.
    Pretty,
    /// Compact single-line plain text.
    Simplified,
    /// JSON lines.
    Json,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration. Logs are always written to stderr.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level, `INFO` by default. `RUST_LOG` takes precedence if set.
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,
    /// Log output format, `auto` by default.
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Load test configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the storefront, such as `http://localhost:8080`.
    pub host: String,

    /// How long the test runs. Defaults to `1m`.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// Number of concurrently simulated users. Defaults to `10`.
    pub users: usize,

    /// Users started per second. All users start at once if unset.
    pub spawn_rate: Option<f64>,

    /// Pause between two tasks of the same user.
    pub wait_time: WaitTimeConfig,

    /// Relative weights of the tasks, `1:4:20` by default.
    pub tasks: TaskWeights,

    /// The built-in style list to browse. Defaults to `kube`.
    pub catalog: CatalogVariant,

    /// A custom style list, replacing the built-in catalog.
    pub styles: Option<Vec<String>>,

    /// Seed for reproducible request sequences. Random if unset.
    pub seed: Option<u64>,

    /// Timeout of a single request. Defaults to `30s`.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// If set, a JSON summary of the run is written to this path.
    pub report_path: Option<PathBuf>,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "http://localhost:8080".to_owned(),
            duration: Duration::from_secs(60),
            users: 10,
            spawn_rate: None,
            wait_time: WaitTimeConfig::default(),
            tasks: TaskWeights::default(),
            catalog: CatalogVariant::default(),
            styles: None,
            seed: None,
            request_timeout: HttpRemote::DEFAULT_TIMEOUT,
            report_path: None,
            logging: Logging::default(),
        }
    }
}

impl Config {
    /// Loads configuration from defaults, the optional YAML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("failed to load configuration")?;

        Ok(config)
    }

    /// The catalog users browse: the custom `styles` if set, otherwise the built-in variant.
    pub fn catalog(&self) -> Result<Catalog> {
        match &self.styles {
            Some(styles) => Ok(Catalog::new("custom", styles.iter().cloned())?),
            None => Ok(Catalog::variant(self.catalog)),
        }
    }

    /// Builds the scenario described by this configuration.
    pub fn scenario(&self) -> Result<Scenario> {
        let mut builder = Scenario::builder("storefront")
            .users(self.users)
            .wait_time(self.wait_time.min, self.wait_time.max)
            .task_weights(self.tasks)
            .catalog(self.catalog()?);
        if let Some(rate) = self.spawn_rate {
            builder = builder.spawn_rate(rate);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        Ok(builder.build()?)
    }

    /// Creates the HTTP remote for the configured host.
    pub fn remote(&self) -> Result<HttpRemote> {
        Ok(HttpRemote::with_timeout(
            self.host.as_str(),
            self.request_timeout,
        )?)
    }
}
