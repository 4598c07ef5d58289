use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::crypto;
use crate::tokens;
use crate::AppState;

/// Start the background expiration cleaner task
pub fn start_expiration_cleaner(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.tokens.cleanup_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_cleanup(&state).await;
        }
    })
}

async fn run_cleanup(state: &AppState) {
    debug!("Running expiration cleanup");

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let token_pairs = tokens::cleanup_expired_tokens(&db);
        let login_keys = crypto::cleanup_expired_login_keys(&db);
        (token_pairs, login_keys)
    })
    .await;

    let (token_result, key_result) = match result {
        Ok(results) => results,
        Err(e) => {
            error!(error = %e, "Expiration cleanup task panicked");
            return;
        }
    };

    match token_result {
        Ok(count) if count > 0 => debug!(tokens_cleaned = count, "Expired token pairs cleaned"),
        Err(e) => error!(error = %e, "Failed to clean up expired token pairs"),
        _ => {}
    }

    match key_result {
        Ok(count) if count > 0 => debug!(keys_cleaned = count, "Expired login keys cleaned"),
        Err(e) => error!(error = %e, "Failed to clean up expired login keys"),
        _ => {}
    }
}
