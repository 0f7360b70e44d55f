pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;

use crate::core::config::{Settings, StoreBackend};
use crate::core::{state::AppState, telemetry};
use crate::repositories::Store;
use crate::services::coordinator::ExamCoordinator;
use crate::tasks::scheduler::{self, SchedulerIntervals};

pub async fn run() -> anyhow::Result<()> {
    let state = bootstrap().await?;

    let scheduler = state.settings().scheduler().in_process.then(|| {
        scheduler::spawn(
            state.coordinator_handle(),
            SchedulerIntervals::from_settings(state.settings()),
        )
    });

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr())
        .await
        .with_context(|| format!("Failed to bind {}", state.settings().server_addr()))?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        store_backend = state.settings().store().backend.as_str(),
        in_process_scheduler = scheduler.is_some(),
        "ExamGU API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    if let Some(handle) = scheduler {
        handle.stop().await;
        tracing::info!("Exam scheduler stopped");
    }

    result?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    let settings = load_settings()?;
    scheduler::ensure_shared_store(&settings)?;
    let state = build_state(settings).await?;

    tracing::info!(
        store_backend = state.settings().store().backend.as_str(),
        "ExamGU worker started"
    );
    tasks::scheduler::run(state).await
}

async fn bootstrap() -> anyhow::Result<AppState> {
    build_state(load_settings()?).await
}

fn load_settings() -> anyhow::Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;
    Ok(settings)
}

async fn build_state(settings: Settings) -> anyhow::Result<AppState> {
    let store = build_store(&settings).await?;
    let coordinator = Arc::new(ExamCoordinator::new(store));
    Ok(AppState::new(settings, coordinator))
}

async fn build_store(settings: &Settings) -> anyhow::Result<Store> {
    match settings.store().backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Store::in_memory())
        }
        StoreBackend::Postgres => {
            let pool = db::init_pool(settings).await.context("Failed to connect to Postgres")?;
            db::run_migrations(&pool).await.context("Failed to apply migrations")?;
            tracing::info!("Postgres store ready");
            Ok(Store::postgres(pool))
        }
    }
}
