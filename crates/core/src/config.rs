use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::OrderStatus;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub server: ServerConfig,
    pub orders: OrdersConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub sender_name: String,
    pub sender_email: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct OrdersConfig {
    pub initial_status: InitialOrderStatus,
    pub default_low_stock_threshold: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Which state a freshly placed order starts in. Deployments that collect
/// payment proof up front use `waiting`; cash-on-delivery setups use `draft`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialOrderStatus {
    Draft,
    Waiting,
}

impl InitialOrderStatus {
    pub fn as_order_status(self) -> OrderStatus {
        match self {
            Self::Draft => OrderStatus::Draft,
            Self::Waiting => OrderStatus::Waiting,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub email_enabled: Option<bool>,
    pub email_api_key: Option<String>,
    pub initial_order_status: Option<InitialOrderStatus>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bazari.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            email: EmailConfig {
                enabled: false,
                api_key: None,
                sender_name: "Bazari".to_string(),
                sender_email: "no-reply@bazari.example".to_string(),
                base_url: "https://api.brevo.com".to_string(),
                timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            orders: OrdersConfig {
                initial_status: InitialOrderStatus::Draft,
                default_low_stock_threshold: 5,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for InitialOrderStatus {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "waiting" => Ok(Self::Waiting),
            other => Err(ConfigError::Validation(format!(
                "unsupported initial order status `{other}` (expected draft|waiting)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bazari.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(email) = patch.email {
            if let Some(enabled) = email.enabled {
                self.email.enabled = enabled;
            }
            if let Some(api_key_value) = email.api_key {
                self.email.api_key = Some(SecretString::from(api_key_value));
            }
            if let Some(sender_name) = email.sender_name {
                self.email.sender_name = sender_name;
            }
            if let Some(sender_email) = email.sender_email {
                self.email.sender_email = sender_email;
            }
            if let Some(base_url) = email.base_url {
                self.email.base_url = base_url;
            }
            if let Some(timeout_secs) = email.timeout_secs {
                self.email.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(orders) = patch.orders {
            if let Some(initial_status) = orders.initial_status {
                self.orders.initial_status = initial_status;
            }
            if let Some(threshold) = orders.default_low_stock_threshold {
                self.orders.default_low_stock_threshold = threshold;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BAZARI_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BAZARI_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("BAZARI_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BAZARI_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("BAZARI_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BAZARI_EMAIL_ENABLED") {
            self.email.enabled = parse_bool("BAZARI_EMAIL_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BAZARI_EMAIL_API_KEY") {
            self.email.api_key = Some(SecretString::from(value));
        }
        if let Some(value) = read_env("BAZARI_EMAIL_SENDER_NAME") {
            self.email.sender_name = value;
        }
        if let Some(value) = read_env("BAZARI_EMAIL_SENDER_EMAIL") {
            self.email.sender_email = value;
        }
        if let Some(value) = read_env("BAZARI_EMAIL_BASE_URL") {
            self.email.base_url = value;
        }
        if let Some(value) = read_env("BAZARI_EMAIL_TIMEOUT_SECS") {
            self.email.timeout_secs = parse_u64("BAZARI_EMAIL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BAZARI_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BAZARI_SERVER_PORT") {
            self.server.port = parse_u16("BAZARI_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("BAZARI_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BAZARI_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("BAZARI_ORDERS_INITIAL_STATUS") {
            self.orders.initial_status = value.parse()?;
        }
        if let Some(value) = read_env("BAZARI_ORDERS_LOW_STOCK_THRESHOLD") {
            self.orders.default_low_stock_threshold =
                parse_u32("BAZARI_ORDERS_LOW_STOCK_THRESHOLD", &value)?;
        }

        let log_level = read_env("BAZARI_LOGGING_LEVEL").or_else(|| read_env("BAZARI_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BAZARI_LOGGING_FORMAT").or_else(|| read_env("BAZARI_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(enabled) = overrides.email_enabled {
            self.email.enabled = enabled;
        }
        if let Some(api_key) = overrides.email_api_key {
            self.email.api_key = Some(SecretString::from(api_key));
        }
        if let Some(initial_status) = overrides.initial_order_status {
            self.orders.initial_status = initial_status;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_email(&self.email)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bazari.toml"), PathBuf::from("config/bazari.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if email.timeout_secs == 0 || email.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "email.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if !email.enabled {
        return Ok(());
    }

    let missing_key =
        email.api_key.as_ref().map(|key| key.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing_key {
        return Err(ConfigError::Validation(
            "email.api_key is required when email.enabled is true".to_string(),
        ));
    }

    if !email.sender_email.contains('@') {
        return Err(ConfigError::Validation(
            "email.sender_email must be a valid address".to_string(),
        ));
    }

    if !email.base_url.starts_with("http://") && !email.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "email.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    email: Option<EmailPatch>,
    server: Option<ServerPatch>,
    orders: Option<OrdersPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    sender_name: Option<String>,
    sender_email: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OrdersPatch {
    initial_status: Option<InitialOrderStatus>,
    default_low_stock_threshold: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
