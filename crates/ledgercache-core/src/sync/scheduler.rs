use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::FinanceApi;
use crate::auth::SessionContext;

use super::report::BackupReport;
use super::service::SyncService;
use super::status::SyncPhase;

/// Handle to the periodic backup task.
///
/// Dropping the handle without calling [`AutoBackup::shutdown`] also stops
/// the task after its final backup, but nothing waits for it.
pub struct AutoBackup {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<BackupReport>,
}

impl AutoBackup {
    /// Stop the timer and wait for the final teardown backup.
    pub async fn shutdown(self) -> Option<BackupReport> {
        let AutoBackup { shutdown, task } = self;
        let _ = shutdown.send(());
        match task.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Automatic backup task failed");
                None
            }
        }
    }
}

impl<A: FinanceApi + 'static> SyncService<A> {
    /// Back up every `interval` while online, plus once more on shutdown.
    pub fn spawn_auto_backup(&self, session: SessionContext, interval: Duration) -> AutoBackup {
        let service = self.clone();
        let interval = interval.max(Duration::from_millis(1));
        let (shutdown, mut stop) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), "Automatic data backup started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if service.status().phase == SyncPhase::Offline {
                            debug!("Offline, skipping scheduled backup");
                            continue;
                        }
                        service.backup_all(Some(&session)).await;
                    }
                    _ = &mut stop => break,
                }
            }

            info!("Automatic data backup stopping, running final backup");
            service.backup_all(Some(&session)).await
        });

        AutoBackup { shutdown, task }
    }
}
