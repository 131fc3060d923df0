use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::analysis::{AnalysisError, PromptTemplate};
use crate::analytics::geo::GeoPoint;
use crate::analytics::segments::{self, SegmentRules};
use crate::analytics::summary::{self, SummaryOptions};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub analytics: AnalyticsConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    /// Transport timeout of the HTTP client; the analysis call adds none of its own.
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AnalyticsConfig {
    pub hq_latitude: f64,
    pub hq_longitude: f64,
    pub high_volume_threshold: u32,
    pub local_radius_km: f64,
    pub new_customer_window_days: u64,
    pub top_customers: usize,
    pub display_name_width: usize,
    pub prompt_template_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Gemini,
    Ollama,
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
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub hq_latitude: Option<f64>,
    pub hq_longitude: Option<f64>,
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
    #[error("could not load prompt template `{path}`: {message}")]
    PromptTemplate { path: PathBuf, message: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://sachet.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::Gemini,
                api_key: None,
                base_url: None,
                model: "gemini-2.5-flash".to_string(),
                timeout_secs: 30,
            },
            analytics: AnalyticsConfig {
                hq_latitude: segments::DEFAULT_REFERENCE_POINT.latitude,
                hq_longitude: segments::DEFAULT_REFERENCE_POINT.longitude,
                high_volume_threshold: segments::DEFAULT_HIGH_VOLUME_THRESHOLD,
                local_radius_km: segments::DEFAULT_LOCAL_RADIUS_KM,
                new_customer_window_days: segments::DEFAULT_NEW_WINDOW_DAYS,
                top_customers: summary::DEFAULT_TOP_N,
                display_name_width: summary::DEFAULT_NAME_WIDTH,
                prompt_template_path: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected gemini|ollama)"
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

impl AnalyticsConfig {
    pub fn segment_rules(&self) -> SegmentRules {
        SegmentRules {
            reference: GeoPoint::new(self.hq_latitude, self.hq_longitude),
            high_volume_threshold: self.high_volume_threshold,
            local_radius_km: self.local_radius_km,
            new_window_days: self.new_customer_window_days,
        }
    }

    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions { top_n: self.top_customers, name_width: self.display_name_width }
    }

    pub fn prompt_template(&self) -> Result<PromptTemplate, ConfigError> {
        let Some(path) = &self.prompt_template_path else {
            return Ok(PromptTemplate::default());
        };

        let source = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
        PromptTemplate::from_source(&source).map_err(|error: AnalysisError| {
            ConfigError::PromptTemplate { path: path.clone(), message: error.to_string() }
        })
    }
}

impl LlmConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false)
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("sachet.toml"));
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

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(analytics) = patch.analytics {
            if let Some(hq_latitude) = analytics.hq_latitude {
                self.analytics.hq_latitude = hq_latitude;
            }
            if let Some(hq_longitude) = analytics.hq_longitude {
                self.analytics.hq_longitude = hq_longitude;
            }
            if let Some(threshold) = analytics.high_volume_threshold {
                self.analytics.high_volume_threshold = threshold;
            }
            if let Some(radius) = analytics.local_radius_km {
                self.analytics.local_radius_km = radius;
            }
            if let Some(days) = analytics.new_customer_window_days {
                self.analytics.new_customer_window_days = days;
            }
            if let Some(top_customers) = analytics.top_customers {
                self.analytics.top_customers = top_customers;
            }
            if let Some(width) = analytics.display_name_width {
                self.analytics.display_name_width = width;
            }
            if let Some(path) = analytics.prompt_template_path {
                self.analytics.prompt_template_path = Some(path);
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
        if let Some(value) = read_env("SACHET_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SACHET_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SACHET_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SACHET_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SACHET_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SACHET_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SACHET_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SACHET_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SACHET_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SACHET_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SACHET_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SACHET_ANALYTICS_HQ_LATITUDE") {
            self.analytics.hq_latitude = parse_f64("SACHET_ANALYTICS_HQ_LATITUDE", &value)?;
        }
        if let Some(value) = read_env("SACHET_ANALYTICS_HQ_LONGITUDE") {
            self.analytics.hq_longitude = parse_f64("SACHET_ANALYTICS_HQ_LONGITUDE", &value)?;
        }
        if let Some(value) = read_env("SACHET_ANALYTICS_HIGH_VOLUME_THRESHOLD") {
            self.analytics.high_volume_threshold =
                parse_u32("SACHET_ANALYTICS_HIGH_VOLUME_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SACHET_ANALYTICS_LOCAL_RADIUS_KM") {
            self.analytics.local_radius_km =
                parse_f64("SACHET_ANALYTICS_LOCAL_RADIUS_KM", &value)?;
        }
        if let Some(value) = read_env("SACHET_ANALYTICS_NEW_CUSTOMER_WINDOW_DAYS") {
            self.analytics.new_customer_window_days =
                parse_u64("SACHET_ANALYTICS_NEW_CUSTOMER_WINDOW_DAYS", &value)?;
        }
        if let Some(value) = read_env("SACHET_ANALYTICS_PROMPT_TEMPLATE_PATH") {
            self.analytics.prompt_template_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("SACHET_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SACHET_SERVER_PORT") {
            self.server.port = parse_u16("SACHET_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SACHET_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SACHET_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("SACHET_LOGGING_LEVEL").or_else(|| read_env("SACHET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SACHET_LOGGING_FORMAT").or_else(|| read_env("SACHET_LOG_FORMAT"));
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
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(hq_latitude) = overrides.hq_latitude {
            self.analytics.hq_latitude = hq_latitude;
        }
        if let Some(hq_longitude) = overrides.hq_longitude {
            self.analytics.hq_longitude = hq_longitude;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_analytics(&self.analytics)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("sachet.toml"), PathBuf::from("config/sachet.toml")]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_analytics(analytics: &AnalyticsConfig) -> Result<(), ConfigError> {
    if !analytics.hq_latitude.is_finite() || !analytics.hq_longitude.is_finite() {
        return Err(ConfigError::Validation(
            "analytics.hq_latitude and analytics.hq_longitude must be finite numbers".to_string(),
        ));
    }

    if !analytics.local_radius_km.is_finite() || analytics.local_radius_km < 0.0 {
        return Err(ConfigError::Validation(
            "analytics.local_radius_km must be a non-negative number".to_string(),
        ));
    }

    if analytics.top_customers == 0 {
        return Err(ConfigError::Validation(
            "analytics.top_customers must be greater than zero".to_string(),
        ));
    }

    if analytics.display_name_width == 0 {
        return Err(ConfigError::Validation(
            "analytics.display_name_width must be greater than zero".to_string(),
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

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    analytics: Option<AnalyticsPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyticsPatch {
    hq_latitude: Option<f64>,
    hq_longitude: Option<f64>,
    high_volume_threshold: Option<u32>,
    local_radius_km: Option<f64>,
    new_customer_window_days: Option<u64>,
    top_customers: Option<usize>,
    display_name_width: Option<usize>,
    prompt_template_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
