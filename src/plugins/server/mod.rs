mod auth;
mod handlers;
mod webhooks;

use std::{net::SocketAddr, sync::Arc};

use axum::{
  Router,
  extract::FromRequest,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

/// JSON request body. Rejections render as `{ "error": .. }` like any other
/// API error.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Body<T>(pub T);

/// Every route of the API, without the per-IP rate limiter.
pub fn routes(app: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(handlers::health))
    .route("/api/lotes", get(handlers::lots))
    .route("/api/eventos/local", get(handlers::venue))
    .route("/api/auth/cadastro", post(auth::signup))
    .route("/api/auth/login", post(auth::login))
    .route("/api/auth/logout", post(auth::logout))
    .route("/api/auth/me", get(auth::me).put(auth::update_me))
    .route("/api/comprar", post(handlers::purchase))
    .route("/api/pedidos", get(handlers::orders))
    .route("/api/pedidos/{id}", get(handlers::order))
    .route(
      "/api/pedidos/{id}/simular-pagamento",
      post(handlers::simulate_payment),
    )
    .route("/api/meus-ingressos", get(handlers::tickets))
    .route("/api/meus-ingressos/{codigo}", get(handlers::ticket))
    .route("/api/dashboard/stats", get(handlers::dashboard_stats))
    .route(
      "/api/webhooks/asaas",
      post(webhooks::asaas).get(webhooks::asaas_check),
    )
    .route(
      "/api/webhooks/mercado-pago",
      post(webhooks::mercado_pago).get(webhooks::mercado_pago_check),
    )
    .layer(
      ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
          .allow_origin(Any)
          .allow_methods(Any)
          .allow_headers(Any),
      ),
    )
    .with_state(app)
}

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let governor_conf = Arc::new(
      GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(100)
        .finish()
        .context("Failed to build rate limiter config")?,
    );

    let limiter = governor_conf.limiter().clone();

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let router = routes(app)
      .layer(GovernorLayer::new(governor_conf))
      .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind(addr)
      .await
      .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP Server listening on {addr}");

    let limiter = async {
      loop {
        time::sleep(Duration::from_secs(60)).await;
        limiter.retain_recent();
      }
    };

    let server = async {
      axum::serve(listener, router).await.context("Axum server error")
    };

    tokio::select! {
      result = server => {
        match &result {
          Ok(_) => info!("Server stopped gracefully"),
          Err(err) => error!("Server stopped with error: {err}"),
        }
        result
      }
      _ = limiter => {
        error!("Rate limiter cleaner stopped unexpectedly!");
        Ok(())
      }
    }
  }
}
