//! Naipe VIP ticket sales backend
//!
//! - SeaORM over SQLite for events, orders, payments and tickets
//! - Axum HTTP API with cookie sessions and per-IP rate limiting
//! - PIX charges through Asaas, Mercado Pago or a local simulator

mod entity;
mod error;
mod gateway;
mod plugins;
mod prelude;
mod state;
mod sv;
mod utils;

use std::sync::Arc;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{App, cron, server},
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "naipe=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  info!("Starting Naipe v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::from_env().context("Invalid configuration")?;
  if config.production
    && matches!(config.gateway, gateway::Settings::Simulated)
  {
    warn!("Running in production with the simulated PIX gateway");
  }

  let app = Arc::new(AppState::new(config).await?);

  App::new()
    .register(server::Plugin)
    .register(cron::SessionCleanup)
    .run(app)
    .await;

  tokio::signal::ctrl_c().await.context("Failed to listen for shutdown")?;
  info!("Shutting down");

  Ok(())
}
