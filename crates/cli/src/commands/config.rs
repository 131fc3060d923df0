use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sachet_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, env_key, value) in effective_fields(&config) {
        let source = field_source(
            key_path,
            env_key,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

/// `(key path, env override, rendered value)` for every field an operator can set.
fn effective_fields(config: &AppConfig) -> Vec<(&'static str, &'static str, String)> {
    let analytics = &config.analytics;
    let api_key = if config.llm.has_api_key() { "<redacted>" } else { "<unset>" };
    let template_path = analytics
        .prompt_template_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());

    vec![
        ("database.url", "SACHET_DATABASE_URL", config.database.url.clone()),
        (
            "database.max_connections",
            "SACHET_DATABASE_MAX_CONNECTIONS",
            config.database.max_connections.to_string(),
        ),
        (
            "database.timeout_secs",
            "SACHET_DATABASE_TIMEOUT_SECS",
            config.database.timeout_secs.to_string(),
        ),
        ("llm.provider", "SACHET_LLM_PROVIDER", format!("{:?}", config.llm.provider)),
        ("llm.model", "SACHET_LLM_MODEL", config.llm.model.clone()),
        (
            "llm.base_url",
            "SACHET_LLM_BASE_URL",
            config.llm.base_url.clone().unwrap_or_else(|| "<provider default>".to_string()),
        ),
        ("llm.api_key", "SACHET_LLM_API_KEY", api_key.to_string()),
        ("llm.timeout_secs", "SACHET_LLM_TIMEOUT_SECS", config.llm.timeout_secs.to_string()),
        (
            "analytics.hq_latitude",
            "SACHET_ANALYTICS_HQ_LATITUDE",
            analytics.hq_latitude.to_string(),
        ),
        (
            "analytics.hq_longitude",
            "SACHET_ANALYTICS_HQ_LONGITUDE",
            analytics.hq_longitude.to_string(),
        ),
        (
            "analytics.high_volume_threshold",
            "SACHET_ANALYTICS_HIGH_VOLUME_THRESHOLD",
            analytics.high_volume_threshold.to_string(),
        ),
        (
            "analytics.local_radius_km",
            "SACHET_ANALYTICS_LOCAL_RADIUS_KM",
            analytics.local_radius_km.to_string(),
        ),
        (
            "analytics.new_customer_window_days",
            "SACHET_ANALYTICS_NEW_CUSTOMER_WINDOW_DAYS",
            analytics.new_customer_window_days.to_string(),
        ),
        ("analytics.prompt_template_path", "SACHET_ANALYTICS_PROMPT_TEMPLATE_PATH", template_path),
        ("server.bind_address", "SACHET_SERVER_BIND_ADDRESS", config.server.bind_address.clone()),
        ("server.port", "SACHET_SERVER_PORT", config.server.port.to_string()),
        ("logging.level", "SACHET_LOGGING_LEVEL", config.logging.level.clone()),
        ("logging.format", "SACHET_LOGGING_FORMAT", format!("{:?}", config.logging.format)),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("sachet.toml"), PathBuf::from("config/sachet.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, effective_fields};
    use sachet_core::config::AppConfig;

    #[test]
    fn nested_key_paths_are_found_in_toml_documents() {
        let doc: Value = "[analytics]\nhq_latitude = 6.0\n".parse().expect("toml");

        assert!(contains_path(&doc, "analytics.hq_latitude"));
        assert!(!contains_path(&doc, "analytics.hq_longitude"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn api_key_is_never_rendered() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("AIza-super-secret".to_string().into());

        let fields = effective_fields(&config);
        let api_key = fields.iter().find(|(key, _, _)| *key == "llm.api_key").expect("api key row");

        assert_eq!(api_key.2, "<redacted>");
        assert!(fields.iter().all(|(_, _, value)| !value.contains("super-secret")));
    }
}
