use std::sync::Arc;

use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Periodically drops sessions past their expiry.
pub struct SessionCleanup;

#[async_trait]
impl Plugin for SessionCleanup {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let every = app.config.session_cleanup_interval;
    info!("Session cleanup every {}", humantime::format_duration(every));

    let mut interval = time::interval(every);
    loop {
      interval.tick().await;

      match app.sv().session.clean_expired().await {
        Ok(0) => {}
        Ok(removed) => info!("Removed {removed} expired sessions"),
        Err(err) => error!("Session cleanup failed: {err}"),
      }
    }
  }
}
