use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub results: ResultsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let absence_marker = env::var("RESULTS_ABSENCE_MARKER")
            .unwrap_or_else(|_| ResultsConfig::DEFAULT_ABSENCE_MARKER.to_string())
            .trim()
            .to_string();
        if absence_marker.is_empty() {
            return Err(ConfigError::EmptyAbsenceMarker);
        }

        let pass_percentage = match env::var("RESULTS_PASS_PERCENTAGE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| (0.0..=100.0).contains(value))
                .ok_or(ConfigError::InvalidPassPercentage)?,
            Err(_) => ResultsConfig::DEFAULT_PASS_PERCENTAGE,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            results: ResultsConfig {
                absence_marker,
                pass_percentage,
            },
        })
    }
}

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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Grading policy knobs shared by bulk ingestion and batch reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsConfig {
    /// Reserved cell token meaning "absent", matched case-insensitively.
    pub absence_marker: String,
    /// Minimum percentage counted as a pass in batch reports.
    pub pass_percentage: f64,
}

impl ResultsConfig {
    pub const DEFAULT_ABSENCE_MARKER: &'static str = "A";
    pub const DEFAULT_PASS_PERCENTAGE: f64 = 50.0;
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            absence_marker: Self::DEFAULT_ABSENCE_MARKER.to_string(),
            pass_percentage: Self::DEFAULT_PASS_PERCENTAGE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    EmptyAbsenceMarker,
    InvalidPassPercentage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::EmptyAbsenceMarker => {
                write!(f, "RESULTS_ABSENCE_MARKER must not be blank")
            }
            ConfigError::InvalidPassPercentage => {
                write!(f, "RESULTS_PASS_PERCENTAGE must be a number between 0 and 100")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::EmptyAbsenceMarker
            | ConfigError::InvalidPassPercentage => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("RESULTS_ABSENCE_MARKER");
        env::remove_var("RESULTS_PASS_PERCENTAGE");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.results, ResultsConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn grading_overrides_are_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RESULTS_ABSENCE_MARKER", " AB ");
        env::set_var("RESULTS_PASS_PERCENTAGE", "40");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.results.absence_marker, "AB");
        assert_eq!(config.results.pass_percentage, 40.0);
        reset_env();
    }

    #[test]
    fn rejects_pass_percentage_outside_bounds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("RESULTS_PASS_PERCENTAGE", "120");
        match AppConfig::load() {
            Err(ConfigError::InvalidPassPercentage) => {}
            other => panic!("expected invalid pass percentage, got {other:?}"),
        }
        reset_env();
    }
}
