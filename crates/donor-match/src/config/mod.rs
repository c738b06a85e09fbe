use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let model_path = env::var("APP_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH));

        let training = TrainingConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            model: ModelConfig { path: model_path },
            training,
        })
    }
}

pub const DEFAULT_MODEL_PATH: &str = "donor_match_model.json";

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the persisted classifier artifact.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub path: PathBuf,
}

/// Hyperparameters for the match classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub seed: u64,
    pub trees: usize,
    pub test_ratio: f64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            trees: 100,
            test_ratio: 0.2,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

impl TrainingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let seed = match env::var("APP_TRAIN_SEED") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTraining("APP_TRAIN_SEED must be a valid u64"))?,
            Err(_) => defaults.seed,
        };

        let trees = match env::var("APP_TRAIN_TREES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|trees| *trees > 0)
                .ok_or(ConfigError::InvalidTraining(
                    "APP_TRAIN_TREES must be a positive integer",
                ))?,
            Err(_) => defaults.trees,
        };

        let test_ratio = match env::var("APP_TRAIN_TEST_RATIO") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|ratio| (0.0..1.0).contains(ratio))
                .ok_or(ConfigError::InvalidTraining(
                    "APP_TRAIN_TEST_RATIO must be within [0, 1)",
                ))?,
            Err(_) => defaults.test_ratio,
        };

        let max_depth = match env::var("APP_TRAIN_MAX_DEPTH") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(raw.trim().parse::<usize>().map_err(|_| {
                ConfigError::InvalidTraining("APP_TRAIN_MAX_DEPTH must be a valid usize")
            })?),
            Err(_) => defaults.max_depth,
        };

        Ok(Self {
            seed,
            trees,
            test_ratio,
            max_depth,
            ..defaults
        })
    }

    /// Re-checks bounds after command-line overrides are applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trees == 0 {
            return Err(ConfigError::InvalidTraining(
                "forest size must be a positive integer",
            ));
        }
        if !(0.0..1.0).contains(&self.test_ratio) {
            return Err(ConfigError::InvalidTraining(
                "test ratio must be within [0, 1)",
            ));
        }
        if self.min_samples_split < 2 {
            return Err(ConfigError::InvalidTraining(
                "min_samples_split must be at least 2",
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTraining(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTraining(detail) => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidTraining(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
