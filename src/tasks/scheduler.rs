use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::config::{Settings, StoreBackend};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::services::coordinator::ExamCoordinator;
use crate::tasks::maintenance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SchedulerIntervals {
    pub(crate) sweep: Duration,
    pub(crate) window_sync: Duration,
}

impl SchedulerIntervals {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            sweep: Duration::from_secs(settings.scheduler().sweep_interval_seconds),
            window_sync: Duration::from_secs(settings.scheduler().window_sync_interval_seconds),
        }
    }
}

/// A standalone worker only sees what the API writes through a shared store.
pub(crate) fn ensure_shared_store(settings: &Settings) -> Result<()> {
    if settings.store().backend == StoreBackend::Memory {
        anyhow::bail!(
            "the worker needs STORE_BACKEND=postgres; with the in-memory store keep \
             EXAM_SWEEP_IN_PROCESS=1 on the API instead"
        );
    }
    Ok(())
}

/// Background loops running next to the API or inside the worker binary.
pub(crate) struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub(crate) async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            tracing::warn!("Failed to broadcast shutdown signal to background tasks");
        }

        for handle in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "Background task join failed");
            }
        }
    }
}

pub(crate) fn spawn(
    coordinator: Arc<ExamCoordinator>,
    intervals: SchedulerIntervals,
) -> SchedulerHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![
        tokio::spawn(expire_attempts_loop(
            Arc::clone(&coordinator),
            intervals.sweep,
            shutdown_rx.clone(),
        )),
        tokio::spawn(sync_windows_loop(coordinator, intervals.window_sync, shutdown_rx)),
    ];

    tracing::info!(
        sweep_interval_seconds = intervals.sweep.as_secs(),
        window_sync_interval_seconds = intervals.window_sync.as_secs(),
        "Exam scheduler started"
    );

    SchedulerHandle { shutdown: shutdown_tx, handles }
}

/// Worker entry point: runs the loops until a shutdown signal arrives.
pub(crate) async fn run(state: AppState) -> Result<()> {
    let handle =
        spawn(state.coordinator_handle(), SchedulerIntervals::from_settings(state.settings()));

    crate::core::shutdown::shutdown_signal().await;
    handle.stop().await;

    Ok(())
}

async fn expire_attempts_loop(
    coordinator: Arc<ExamCoordinator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) =
                    maintenance::expire_overdue_attempts(&coordinator, primitive_now_utc()).await
                {
                    tracing::error!(error = %err, "expire_overdue_attempts failed");
                }
            }
        }
    }
}

async fn sync_windows_loop(
    coordinator: Arc<ExamCoordinator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) =
                    maintenance::sync_exam_windows(&coordinator, primitive_now_utc()).await
                {
                    tracing::error!(error = %err, "sync_exam_windows failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Actor, Attempt};
    use crate::db::types::{AttemptStatus, UserRole};
    use crate::repositories::Store;
    use crate::services::question_bank::build_open_question;
    use crate::test_support::{env_lock, set_test_env};
    use time::Duration as TimeDuration;

    #[tokio::test]
    async fn worker_refuses_a_process_local_store() {
        let _guard = env_lock().await;
        set_test_env();

        let settings = Settings::load().expect("settings");
        let err = ensure_shared_store(&settings).unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND=postgres"));

        std::env::set_var("STORE_BACKEND", "postgres");
        let settings = Settings::load().expect("settings");
        assert!(ensure_shared_store(&settings).is_ok());
        std::env::set_var("STORE_BACKEND", "memory");
    }

    #[tokio::test]
    async fn sweep_loop_expires_attempts_past_their_deadline() {
        let coordinator = Arc::new(ExamCoordinator::new(Store::in_memory()));
        let teacher = Actor { id: "teacher-1".to_string(), role: UserRole::Teacher };
        let now = primitive_now_utc();

        let mut exam = coordinator
            .create_exam(&teacher, "Background sweep", None, now - TimeDuration::hours(2))
            .await
            .expect("exam");
        exam.schedule(
            now - TimeDuration::hours(2),
            now + TimeDuration::hours(1),
            30,
            now - TimeDuration::hours(2),
        )
        .expect("schedule");
        exam.add_question(build_open_question("Explain", 2.0, 0).expect("q"), now)
            .expect("add");
        coordinator.store().exams.save(&mut exam).await.expect("save exam");

        let mut attempt = Attempt::new(&exam, "student-1", 1, now - TimeDuration::hours(1));
        coordinator.store().attempts.save(&mut attempt).await.expect("save attempt");

        let handle = spawn(
            Arc::clone(&coordinator),
            SchedulerIntervals {
                sweep: Duration::from_millis(20),
                window_sync: Duration::from_secs(3600),
            },
        );

        let mut status = AttemptStatus::InProgress;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let stored =
                coordinator.store().attempts.find_by_id(&attempt.id).await.expect("load");
            status = stored.map(|item| item.status).unwrap_or(AttemptStatus::InProgress);
            if status == AttemptStatus::Expired {
                break;
            }
        }
        handle.stop().await;

        assert_eq!(status, AttemptStatus::Expired);
    }
}
