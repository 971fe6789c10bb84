//! Application configuration management.
//!
//! Configuration comes from default values, an optional TOML file, and
//! environment variables, in increasing order of precedence.

use crate::Cli;
use qz_grader::config::GraderConfig;
use qz_remote::config::RemoteConfig;
use serde::{Deserialize, Serialize};

/// The main application configuration that composes all component configs
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    /// Remote store location and timeouts
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Key scheme and filtering policy
    #[serde(default)]
    pub grader: GraderConfig,
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file given by the CLI
    /// 3. Default values (lowest priority)
    ///
    /// Environment variables are mapped using the pattern:
    /// `QZ_<SECTION>__<KEY>` maps to `<section>.<key>`
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Use a test namespace
    /// export QZ_REMOTE__NAMESPACE="QUIZ_RESPONSES_TEST"
    ///
    /// # Only offer the latest submission of each student
    /// export QZ_GRADER__FILTER_MODE="latest-only"
    /// ```
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = &cli.config {
            if path.exists() {
                config = config.add_source(config::File::from(path.as_path()))
            } else {
                return Err(anyhow::anyhow!(
                    "Config file {} does not exist",
                    path.display()
                ));
            }
        }

        // QZ_REMOTE__TIMEOUT maps to remote.timeout
        config = config.add_source(
            config::Environment::with_prefix("QZ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        config.build()?.try_deserialize().map_err(Into::into)
    }
}
