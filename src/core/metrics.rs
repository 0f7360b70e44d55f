use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!("attempts_started_total", "Attempts created by students");
    describe_counter!("attempts_submitted_total", "Attempts submitted before their deadline");
    describe_counter!("attempts_expired_total", "Attempts finalised at their deadline, by source");
    describe_counter!("answers_saved_total", "Answer saves accepted");
    describe_counter!("manual_grades_total", "Manual grades recorded by examiners");
    describe_counter!("grades_published_total", "Grade publications");
    describe_counter!("exams_opened_total", "Exams opened manually or by the window sync");
    describe_counter!("exams_closed_total", "Exams closed manually or by the window sync");
    describe_counter!("http_requests_total", "HTTP requests by response status");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by response status"
    );
}
