use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::Settings;

/// Quiet chatty dependencies unless RUST_LOG says otherwise.
const DEPENDENCY_DIRECTIVES: &[&str] = &["sqlx=warn", "hyper=warn", "tower_http=info"];

pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&settings.telemetry().log_level)));

    let builder = fmt().with_env_filter(filter).with_target(false);

    let result = if settings.telemetry().json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|err| anyhow::anyhow!(err.to_string()))?;

    tracing::debug!(
        environment = settings.runtime().environment.as_str(),
        store_backend = settings.store().backend.as_str(),
        "Tracing initialised"
    );
    Ok(())
}

fn filter_directives(level: &str) -> String {
    std::iter::once(level.trim())
        .chain(DEPENDENCY_DIRECTIVES.iter().copied())
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}
