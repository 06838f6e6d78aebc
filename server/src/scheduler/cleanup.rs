use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::CleanupConfig;
use crate::db::{documents, format_timestamp, with_conn, DbPool};
use crate::error::ApiError;
use crate::resources::Collection;

/// Counts of documents removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub expired: usize,
    pub notifications: usize,
    pub login_logs: usize,
    pub activity_logs: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.expired + self.notifications + self.login_logs + self.activity_logs
    }
}

fn cutoff(now: DateTime<Utc>, days: u32) -> String {
    format_timestamp(now - Duration::days(i64::from(days)))
}

/// Run one sweep against `conn` as of `now`, in a single transaction.
pub fn run_cleanup(
    conn: &Connection,
    policy: &CleanupConfig,
    now: DateTime<Utc>,
) -> Result<CleanupReport, ApiError> {
    let tx = conn.unchecked_transaction()?;

    let expired = documents::delete_expired(&tx, now)?;
    let notifications = documents::delete_created_before(
        &tx,
        Collection::Notifications.name(),
        &cutoff(now, policy.notification_retention_days),
    )?;
    let log_cutoff = cutoff(now, policy.log_retention_days);
    let login_logs =
        documents::delete_created_before(&tx, Collection::LoginLogs.name(), &log_cutoff)?;
    let activity_logs =
        documents::delete_created_before(&tx, Collection::UserActivityLogs.name(), &log_cutoff)?;

    tx.commit()?;

    Ok(CleanupReport {
        expired,
        notifications,
        login_logs,
        activity_logs,
    })
}

/// Run one sweep on the blocking pool.
pub async fn run_cleanup_pass(db: &DbPool, policy: CleanupConfig) -> Result<CleanupReport, ApiError> {
    with_conn(db, move |conn| run_cleanup(conn, &policy, Utc::now())).await
}
