use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Whether the backend is currently reachable. Shared by every fetcher.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    online: Arc<AtomicBool>,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        Self { online: Arc::new(AtomicBool::new(online)) }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online && !online {
            tracing::warn!("📴 Backend unreachable - serving offline fallbacks");
        } else if !was_online && online {
            tracing::info!("📶 Backend reachable again");
        }
    }

    /// Periodically run `SELECT 1` against the pool and record the outcome.
    pub fn spawn_health_check(&self, pool: PgPool, every: Duration) -> JoinHandle<()> {
        let status = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let reachable = match sqlx::query("SELECT 1").execute(&pool).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!("Network health check failed: {}", e);
                        false
                    }
                };
                status.set_online(reachable);
            }
        })
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}
