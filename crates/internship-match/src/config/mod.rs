use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the service and CLI need, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub data: DataConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port_raw = value("APP_PORT", "5000");
        let port = match port_raw.trim().parse::<u16>() {
            Ok(port) => port,
            Err(_) => return Err(ConfigError::InvalidPort { value: port_raw }),
        };

        Ok(Self {
            environment: AppEnvironment::parse(&value("APP_ENV", "development")),
            server: ServerConfig {
                host: value("APP_HOST", "127.0.0.1"),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: value("APP_LOG_LEVEL", "info"),
            },
            data: DataConfig {
                vacancies_path: value("APP_VACANCIES_CSV", "vacancies.csv").into(),
                pincodes_path: value("APP_PINCODES_CSV", "pincode_latlon.csv").into(),
                model_path: value("APP_MODEL_PATH", "internship_recommender.json").into(),
                training_path: value("APP_TRAINING_CSV", "large_training_data.csv").into(),
                top_k: parse_top_k(&value("APP_TOP_K", "10"))?,
            },
        })
    }
}

/// Parses a ranking cutoff; zero is rejected because it would make every request empty.
pub fn parse_top_k(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidTopK {
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    value: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Locations of the read-only snapshots loaded at startup.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub vacancies_path: PathBuf,
    pub pincodes_path: PathBuf,
    pub model_path: PathBuf,
    /// Historical interactions consumed by the `train` and `catalog derive` commands.
    pub training_path: PathBuf,
    pub top_k: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16, got '{value}'")]
    InvalidPort { value: String },
    #[error("APP_HOST must be 'localhost' or an IPv4/IPv6 address, got '{value}'")]
    InvalidHost {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("APP_TOP_K must be a positive integer, got '{value}'")]
    InvalidTopK { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = from_pairs(&[]).expect("config resolves with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.data.vacancies_path, PathBuf::from("vacancies.csv"));
        assert_eq!(config.data.pincodes_path, PathBuf::from("pincode_latlon.csv"));
        assert_eq!(
            config.data.model_path,
            PathBuf::from("internship_recommender.json")
        );
        assert_eq!(
            config.data.training_path,
            PathBuf::from("large_training_data.csv")
        );
        assert_eq!(config.data.top_k, 10);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = from_pairs(&[
            ("APP_ENV", "ci"),
            ("APP_PORT", "8088"),
            ("APP_MODEL_PATH", "/models/latest.json"),
            ("APP_TOP_K", "3"),
        ])
        .expect("config resolves");

        assert_eq!(config.environment, AppEnvironment::Test);
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.data.model_path, PathBuf::from("/models/latest.json"));
        assert_eq!(config.data.top_k, 3);
    }

    #[test]
    fn accepts_localhost_host() {
        let config = from_pairs(&[("APP_HOST", "localhost")]).expect("config resolves");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 5000));
    }

    #[test]
    fn invalid_host_reports_value() {
        let config = from_pairs(&[("APP_HOST", "example.invalid")]).expect("config resolves");
        let error = config.server.socket_addr().expect_err("hostnames rejected");
        assert!(error.to_string().contains("example.invalid"));
    }

    #[test]
    fn rejects_bad_port_and_zero_top_k() {
        assert!(matches!(
            from_pairs(&[("APP_PORT", "70000")]),
            Err(ConfigError::InvalidPort { value }) if value == "70000"
        ));
        assert!(matches!(
            from_pairs(&[("APP_TOP_K", "0")]),
            Err(ConfigError::InvalidTopK { .. })
        ));
    }

    #[test]
    fn parse_top_k_trims_input() {
        assert_eq!(parse_top_k(" 25 ").expect("parses"), 25);
        assert!(parse_top_k("ten").is_err());
    }

    #[test]
    fn load_reads_process_environment() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::set_var("APP_TOP_K", "7");
        let config = AppConfig::load();
        env::remove_var("APP_TOP_K");

        assert_eq!(config.expect("config loads").data.top_k, 7);
    }
}
