use opshub_clients::build_http_client;
use opshub_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;

use super::config::redact_token;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name: name.into(), status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    run_with(LoadOptions::default(), json_output)
}

pub fn run_with(options: LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_slack_credentials(&config));
            checks.push(check_http_client(&config));
            checks.push(check_assistant(&config));
            checks.extend(config.integrations().into_iter().map(|(name, enabled)| {
                if enabled {
                    DoctorCheck::new(format!("integration.{name}"), CheckStatus::Pass, "configured")
                } else {
                    DoctorCheck::new(
                        format!("integration.{name}"),
                        CheckStatus::Skipped,
                        "not configured; routes answer 503",
                    )
                }
            }));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["slack_credentials", "http_client", "assistant"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    // Optional integrations may be skipped; only failures fail the report.
    let healthy = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if healthy { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if healthy {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_credentials(config: &AppConfig) -> DoctorCheck {
    DoctorCheck::new(
        "slack_credentials",
        CheckStatus::Pass,
        format!(
            "bot token {} and signing secret present; Web API at {}",
            redact_token(config.slack.bot_token.expose_secret()),
            config.slack.api_base_url
        ),
    )
}

fn check_http_client(config: &AppConfig) -> DoctorCheck {
    match build_http_client(config.server.upstream_timeout_secs) {
        Ok(_) => DoctorCheck::new(
            "http_client",
            CheckStatus::Pass,
            format!("upstream timeout {}s", config.server.upstream_timeout_secs),
        ),
        Err(error) => DoctorCheck::new(
            "http_client",
            CheckStatus::Fail,
            format!("failed to build http client: {error}"),
        ),
    }
}

fn check_assistant(config: &AppConfig) -> DoctorCheck {
    if !config.writer.is_configured() {
        return DoctorCheck::new(
            "assistant",
            CheckStatus::Skipped,
            "writer.api_key is unset; Slack messages get a not-configured reply",
        );
    }
    let tools = if config.salesforce.is_configured() { "CRM tools enabled" } else { "no CRM tools" };
    DoctorCheck::new("assistant", CheckStatus::Pass, format!("model `{}`, {tools}", config.agent.model))
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
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
