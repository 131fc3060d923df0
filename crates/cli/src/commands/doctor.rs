use sachet_core::config::{AppConfig, LlmProvider, LoadOptions};
use sachet_db::connect_with_settings;
use serde::Serialize;

use crate::commands::CommandResult;

const MISSING_SCHEMA: &str = "connected, but the customer table is missing; run `sachet migrate`";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 6 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_llm_readiness(&config));
            checks.push(check_prompt_template(&config));
            checks.push(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["llm_readiness", "prompt_template", "database"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready, with warnings"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

/// A missing key does not block the dashboard; analysis just reports itself unavailable.
fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    match config.llm.provider {
        LlmProvider::Gemini if config.llm.has_api_key() => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Pass,
            details: format!("gemini model `{}` with api key configured", config.llm.model),
        },
        LlmProvider::Gemini => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Warn,
            details: "gemini api key is not set (SACHET_LLM_API_KEY); analysis will report \
                      itself unavailable"
                .to_string(),
        },
        LlmProvider::Ollama => DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "ollama model `{}` at {}",
                config.llm.model,
                config.llm.base_url.as_deref().unwrap_or("the default local endpoint")
            ),
        },
    }
}

fn check_prompt_template(config: &AppConfig) -> DoctorCheck {
    match config.analytics.prompt_template() {
        Ok(_) => DoctorCheck {
            name: "prompt_template",
            status: CheckStatus::Pass,
            details: match &config.analytics.prompt_template_path {
                Some(path) => format!("custom template `{}` parsed", path.display()),
                None => "built-in template".to_string(),
            },
        },
        Err(error) => DoctorCheck {
            name: "prompt_template",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;

        let schema_ready: Result<i64, sqlx::Error> = sqlx::query_scalar(
            "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = 'customer'",
        )
        .fetch_one(&pool)
        .await;
        pool.close().await;

        match schema_ready {
            Ok(1) => Ok(()),
            Ok(_) => Err(MISSING_SCHEMA.to_string()),
            Err(error) => Err(format!("schema check failed: {error}")),
        }
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database",
            status: CheckStatus::Pass,
            details: format!("connected using `{}` and schema is migrated", config.database.url),
        },
        Err(error) => DoctorCheck { name: "database", status: CheckStatus::Fail, details: error },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
