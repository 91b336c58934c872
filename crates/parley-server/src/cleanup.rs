use std::time::Duration;
use tracing::info;

use parley_api::session::SessionStore;

/// Background task that drops expired sessions on an interval.
pub async fn run_session_purge_loop(sessions: SessionStore, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let count = sessions.purge_expired().await;
        if count > 0 {
            info!("Cleanup: purged {} expired sessions", count);
        }
    }
}
