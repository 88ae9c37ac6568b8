//! Gateway callbacks. Everything except a rejected signature is answered with
//! 200 so the provider stops retrying; failures are only logged.

use std::sync::Arc;

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use json::{Value, json};

use crate::{
  entity::Provider,
  gateway,
  prelude::*,
  state::AppState,
  sv::payment::Outcome,
};

fn ack(body: Value) -> Response {
  (StatusCode::OK, Json(body)).into_response()
}

fn ack_error(message: &str) -> Response {
  ack(json!({ "received": true, "error": message }))
}

async fn receive(
  app: &AppState,
  provider: Provider,
  headers: &HeaderMap,
  body: &[u8],
) -> Response {
  let active = app.gateway.provider();
  if active != provider {
    warn!("Webhook for {provider:?} received while {active:?} is configured");
    return ack_error("Gateway não configurado");
  }

  let note = match app.gateway.notification(headers, body).await {
    Ok(Some(note)) => note,
    Ok(None) => return ack(json!({ "received": true })),
    Err(gateway::Error::InvalidSignature) => {
      warn!("Rejected {provider:?} webhook with invalid signature");
      return (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Assinatura inválida" })),
      )
        .into_response();
    }
    Err(err @ gateway::Error::Provider(_)) => {
      error!("{provider:?} webhook lookup failed: {err}");
      return ack_error("Order não encontrada");
    }
    Err(err) => {
      error!("{provider:?} webhook could not be read: {err}");
      return ack_error("Erro interno");
    }
  };

  match app.sv().payment.apply_notification(&note).await {
    Ok(Outcome::Applied { pedido_id, status, tickets }) => {
      info!(
        "{provider:?} webhook applied to order {pedido_id}: {:?}, {tickets} tickets",
        status.order
      );
      ack(json!({
        "received": true,
        "orderId": note.charge_id,
        "pedidoId": pedido_id,
        "status": status.order,
      }))
    }
    Ok(Outcome::Stale { pedido_id, current }) => ack(json!({
      "received": true,
      "orderId": note.charge_id,
      "pedidoId": pedido_id,
      "status": current,
    })),
    Ok(Outcome::Unmatched) => ack_error("Pedido não identificado"),
    Ok(Outcome::Ignored) => ack(json!({ "received": true })),
    Err(err) => {
      error!("{provider:?} webhook failed for charge {}: {err}", note.charge_id);
      ack_error("Erro interno")
    }
  }
}

pub async fn asaas(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Bytes,
) -> Response {
  receive(&app, Provider::Asaas, &headers, &body).await
}

pub async fn mercado_pago(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Bytes,
) -> Response {
  receive(&app, Provider::MercadoPago, &headers, &body).await
}

fn configured(message: &str) -> Json<Value> {
  Json(json!({
    "status": "ok",
    "message": message,
    "timestamp": Utc::now().to_rfc3339(),
  }))
}

pub async fn asaas_check() -> Json<Value> {
  configured("Webhook do Asaas configurado")
}

pub async fn mercado_pago_check() -> Json<Value> {
  configured("Webhook do Mercado Pago configurado")
}
