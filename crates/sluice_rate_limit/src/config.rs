//! Dispatcher configuration.
//!
//! Configuration is layered with the `config` crate:
//! - Bundled defaults (include_str! from sluice.toml)
//! - User overrides (~/.config/sluice/sluice.toml, then ./sluice.toml)
//! - `SLUICE_*` environment variables
//!
//! Later sources override earlier ones.

use crate::Classifier;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use sluice_core::BucketPolicy;
use sluice_error::{ConfigError, SluiceError, SluiceResult};
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../sluice.toml");

/// Settings for one dispatcher.
///
/// # Example
///
/// ```
/// use sluice_rate_limit::DispatchConfig;
///
/// let config = DispatchConfig::default();
/// assert_eq!(config.max_attempts, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Base URL every path is joined onto
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Attempts per call, retries included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay used when a 429 body has no usable `retry_after`
    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: f64,

    /// Upper bound on any server-requested delay
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: f64,

    /// Split buckets by method as well as by route
    #[serde(default)]
    pub include_method_in_bucket: bool,

    /// Spend one attempt when a bucket is seen for the first time
    #[serde(default)]
    pub count_registration_as_attempt: bool,

    /// Treat every 4xx other than 429 as a terminal client error
    #[serde(default)]
    pub strict_client_errors: bool,

    /// Deadline for a whole call, retries included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<f64>,

    /// Replaces the library identification string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_api_base() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_after_secs() -> f64 {
    1.0
}

fn default_max_retry_after_secs() -> f64 {
    3600.0
}

/// Validated seconds to a duration, saturating on overflow.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            max_attempts: default_max_attempts(),
            default_retry_after_secs: default_retry_after_secs(),
            max_retry_after_secs: default_max_retry_after_secs(),
            include_method_in_bucket: false,
            count_registration_as_attempt: false,
            strict_client_errors: false,
            request_timeout_secs: None,
            user_agent: None,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from a specific file path.
    ///
    /// Fields the file leaves out take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> SluiceResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                SluiceError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                SluiceError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: env > current dir > home dir > bundled.
    ///
    /// User config files are optional and silently skipped if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if a present source cannot be parsed or the merged
    /// configuration fails validation.
    #[instrument]
    pub fn load() -> SluiceResult<Self> {
        debug!(
            "Loading configuration with precedence: \
             env > current dir > home dir > bundled defaults"
        );

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/sluice/sluice.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("sluice").required(false))
            .add_source(Environment::with_prefix("SLUICE").try_parsing(true));

        let config: Self = builder
            .build()
            .map_err(|e| {
                SluiceError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                SluiceError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero (or below two when
    /// registration counts as an attempt), a delay is negative or not
    /// finite, or `api_base` is not an http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::new("max_attempts must be at least 1"));
        }
        if self.count_registration_as_attempt && self.max_attempts < 2 {
            return Err(ConfigError::new(
                "max_attempts must be at least 2 when registration counts as an attempt",
            ));
        }
        for (name, secs) in [
            ("default_retry_after_secs", Some(self.default_retry_after_secs)),
            ("max_retry_after_secs", Some(self.max_retry_after_secs)),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if let Some(secs) = secs.filter(|s| !s.is_finite() || *s < 0.0) {
                return Err(ConfigError::new(format!(
                    "{} must be a non-negative number of seconds, got {}",
                    name, secs
                )));
            }
        }
        match reqwest::Url::parse(&self.api_base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(ConfigError::new(format!(
                "api_base must use http or https, got {}",
                url.scheme()
            ))),
            Err(e) => Err(ConfigError::new(format!(
                "api_base is not a valid URL ({}): {}",
                self.api_base, e
            ))),
        }
    }

    /// Classifier configured from these settings.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(
            seconds(self.default_retry_after_secs),
            seconds(self.max_retry_after_secs),
            self.strict_client_errors,
        )
    }

    /// Bucket policy configured from these settings.
    pub fn bucket_policy(&self) -> BucketPolicy {
        BucketPolicy {
            include_method: self.include_method_in_bucket,
        }
    }

    /// Deadline for a whole call, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(seconds)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> SluiceResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            SluiceError::from(ConfigError::new(format!(
                "Failed to serialize configuration: {}",
                e
            )))
        })
    }
}
