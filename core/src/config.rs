//! Configuration
//!
//! Layered with the `config` crate, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. a TOML file: the explicit path, else `ROBOT_CONFIG_PATH`, else `robot.toml`
//!    in the working directory if present
//! 3. `ROBOT_`-prefixed environment variables, `__` between nested keys
//!    (`ROBOT_INTERPRETER__RUN_TIMEOUT_SECS=30`)
//! 4. programmatic overrides set on the builder (CLI flags)

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Environment, File};
use serde::{Deserialize, Serialize};

use crate::template::MissingParamPolicy;

const ENV_PREFIX: &str = "ROBOT";
const CONFIG_PATH_VAR: &str = "ROBOT_CONFIG_PATH";
const DEFAULT_CONFIG_NAME: &str = "robot";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: InterpreterConfig,
    pub template: TemplateConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Delay between `While` guard checks, in milliseconds
    pub loop_poll_interval_ms: u64,
    /// Abort a run that takes longer than this
    pub run_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub missing_params: MissingParamPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Programmatic configuration with overrides on top of the layered sources
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    loop_poll_interval_ms: Option<u64>,
    run_timeout_secs: Option<u64>,
    missing_params: Option<MissingParamPolicy>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    /// Read this file instead of searching (the file must exist)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn loop_poll_interval_ms(mut self, millis: Option<u64>) -> Self {
        self.loop_poll_interval_ms = millis;
        self
    }

    pub fn run_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.run_timeout_secs = secs;
        self
    }

    pub fn missing_params(mut self, policy: Option<MissingParamPolicy>) -> Self {
        self.missing_params = policy;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config> {
        let mut builder = config::Config::builder();

        let explicit = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));
        builder = match &explicit {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(millis) = self.loop_poll_interval_ms {
            builder = builder.set_override("interpreter.loop_poll_interval_ms", millis as i64)?;
        }
        if let Some(secs) = self.run_timeout_secs {
            builder = builder.set_override("interpreter.run_timeout_secs", secs as i64)?;
        }
        if let Some(policy) = self.missing_params {
            let name = match policy {
                MissingParamPolicy::Lenient => "lenient",
                MissingParamPolicy::Strict => "strict",
            };
            builder = builder.set_override("template.missing_params", name)?;
        }
        if let Some(filter) = self.log_filter {
            builder = builder.set_override("logging.filter", filter)?;
        }

        let source = match &explicit {
            Some(path) => format!("configuration from {}", path.display()),
            None => "configuration".to_string(),
        };
        builder
            .build()
            .and_then(|c| c.try_deserialize::<Config>())
            .with_context(|| format!("Failed to load {}", source))
    }
}
