use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::CleanupConfig;
use crate::db::DbPool;
use crate::scheduler::cleanup::run_cleanup_pass;

/// Spawn the background sweep. Call only once the database is open.
///
/// The first pass runs one full interval after startup. A failed pass is
/// logged and the loop carries on to the next tick.
pub fn spawn_cleanup_task(db: DbPool, policy: CleanupConfig) -> JoinHandle<()> {
    let period = Duration::from_secs(policy.interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match run_cleanup_pass(&db, policy.clone()).await {
                Ok(report) if report.total() > 0 => {
                    tracing::info!(
                        expired = report.expired,
                        notifications = report.notifications,
                        login_logs = report.login_logs,
                        activity_logs = report.activity_logs,
                        "Scheduled cleanup removed documents"
                    );
                }
                Ok(_) => {
                    tracing::debug!("Scheduled cleanup: nothing to remove");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Scheduled cleanup failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::db::{documents, format_timestamp, init_db};

    fn every_second() -> CleanupConfig {
        CleanupConfig {
            interval_secs: 1,
            ..CleanupConfig::default()
        }
    }

    fn event_exists(db: &DbPool, id: &str) -> bool {
        let conn = db.lock().unwrap();
        documents::find_by_id(&conn, "events", id).unwrap().is_some()
    }

    #[tokio::test(start_paused = true)]
    async fn timer_sweeps_expired_documents() {
        let db = init_db(":memory:").unwrap();
        let id = {
            let conn = db.lock().unwrap();
            let body = json!({
                "title": "Temp",
                "expiresAt": format_timestamp(Utc::now() - chrono::Duration::minutes(5)),
            });
            documents::insert(&conn, "events", body.as_object().cloned().unwrap())
                .unwrap()
                .id
        };

        let handle = spawn_cleanup_task(db.clone(), every_second());
        assert!(event_exists(&db, &id));

        let mut gone = false;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if !event_exists(&db, &id) {
                gone = true;
                break;
            }
        }
        assert!(gone, "expired event should be removed by a scheduled pass");
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_passes_keep_the_loop_alive() {
        let db = init_db(":memory:").unwrap();
        let poisoner = db.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the connection lock");
        })
        .join();
        assert!(db.is_poisoned());

        let handle = spawn_cleanup_task(db, every_second());
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert!(!handle.is_finished());
        handle.abort();
    }
}
