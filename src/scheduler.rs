use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::pipeline::NewsPipeline;
use crate::types::{DashboardError, Result};

/// Fires a refresh cycle on a fixed period.
///
/// The scheduled trigger goes through the same `refresh()` path (and the
/// same single-flight guard) as a manual trigger, so a tick landing while a
/// cycle is still running is rejected, not queued. `stop()` releases the
/// timer task.
pub struct RefreshScheduler {
    pipeline: Arc<NewsPipeline>,
    period: Duration,
    is_running: Arc<RwLock<bool>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(pipeline: Arc<NewsPipeline>, period: Duration) -> Self {
        Self {
            pipeline,
            period,
            is_running: Arc::new(RwLock::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut is_running = self.is_running.write().await;
        if *is_running {
            return Err(DashboardError::General(
                "scheduler is already running".to_string(),
            ));
        }
        *is_running = true;
        drop(is_running);

        let pipeline = Arc::clone(&self.pipeline);
        let running = Arc::clone(&self.is_running);
        let period = self.period;

        let handle = tokio::spawn(async move {
            // The first tick fires immediately, giving the initial load.
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if !*running.read().await {
                    break;
                }
                let outcome = pipeline.refresh().await;
                debug!("Scheduled refresh finished: {:?}", outcome);
            }
        });

        *self.handle.lock().await = Some(handle);
        info!("Refresh scheduler started with period {:?}", self.period);
        Ok(())
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
        info!("Refresh scheduler stopped");
    }
}
