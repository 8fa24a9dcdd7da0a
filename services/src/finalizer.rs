use std::time::Duration;

use chrono::Utc;
use db::models::finalize_task;
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;

use crate::error::AttendanceError;
use crate::qr_code::QrCodeService;

/// Starts the background worker that finalizes expired QR codes.
///
/// The schedule lives in the database, not in this process: the worker polls
/// for due tasks, so pending finalizations survive restarts, and a manual
/// deactivation that already completed a task simply leaves nothing due.
pub fn spawn(db: DatabaseConnection) -> JoinHandle<()> {
    let poll_seconds = common::config::finalize_poll_seconds().max(1);

    tokio::spawn(async move {
        let interval = Duration::from_secs(poll_seconds);
        log::info!("finalize worker started (polling every {poll_seconds}s)");

        loop {
            tokio::time::sleep(interval).await;

            match run_due_tasks(&db).await {
                Ok(0) => {}
                Ok(n) => log::info!("finalize worker swept {n} QR code(s)"),
                // The poll itself failed (e.g. store unreachable). Keep the
                // loop alive; the next tick retries.
                Err(e) => log::error!("finalize worker poll failed: {e}"),
            }
        }
    })
}

/// Finalizes every due QR code once. A failing token is recorded on its
/// queue row and skipped, so one bad entry cannot stall the rest.
pub async fn run_due_tasks(db: &DatabaseConnection) -> Result<usize, AttendanceError> {
    let due = finalize_task::Model::due(db, Utc::now()).await?;
    let mut processed = 0;

    for task in due {
        match QrCodeService::finalize(db, task.token_id, None).await {
            Ok(summary) => {
                processed += 1;
                log::info!(
                    "auto-finalized QR code {}: {} present, {} absent",
                    task.token_id,
                    summary.present,
                    summary.absent
                );
            }
            Err(e) => {
                log::error!("failed to finalize QR code {}: {e}", task.token_id);
                if let Err(mark_err) =
                    finalize_task::Model::mark_failed(db, task.token_id, &e.to_string(), Utc::now())
                        .await
                {
                    log::error!(
                        "could not record finalize failure for QR code {}: {mark_err}",
                        task.token_id
                    );
                }
            }
        }
    }

    Ok(processed)
}
