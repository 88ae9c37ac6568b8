use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{
  Body,
  auth::{Auth, Visitor, visitor},
};
use crate::{
  prelude::*,
  state::AppState,
  sv::{catalog::Listing, order::Purchase},
};

pub async fn health() -> &'static str {
  "OK"
}

pub async fn lots(State(app): State<Arc<AppState>>) -> Result<Json<Listing>> {
  Ok(Json(app.sv().catalog.listing().await?))
}

pub async fn venue(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
) -> Result<impl IntoResponse> {
  Ok(Json(app.sv().catalog.venue(&user.id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReq {
  #[serde(default)]
  pub lote_id: String,
  #[serde(default = "one")]
  pub quantidade: i32,
  pub cpf: Option<String>,
}

fn one() -> i32 {
  1
}

pub async fn purchase(
  State(app): State<Arc<AppState>>,
  jar: CookieJar,
  Body(req): Body<PurchaseReq>,
) -> Result<impl IntoResponse> {
  let buyer = match visitor(&app, &jar).await? {
    Visitor::Known(user) => user,
    Visitor::Anonymous => {
      return Err(Error::unauthorized(
        "Não autorizado. Faça login para continuar.",
      ));
    }
    Visitor::Expired => {
      return Err(Error::unauthorized("Sessão expirada. Faça login novamente."));
    }
  };

  if req.lote_id.trim().is_empty() {
    return Err(Error::validation("Lote não especificado"));
  }

  let purchase = Purchase {
    lot_id: req.lote_id.trim(),
    quantidade: req.quantidade,
    cpf: req.cpf.as_deref().filter(|cpf| !cpf.trim().is_empty()),
  };
  let checkout = app.sv().order.create(&buyer, purchase).await?;

  Ok(Json(checkout))
}

pub async fn orders(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
) -> Result<impl IntoResponse> {
  let pedidos = app.sv().order.list(&user.id).await?;
  Ok(Json(json::json!({ "pedidos": pedidos })))
}

pub async fn order(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
  Path(id): Path<String>,
) -> Result<impl IntoResponse> {
  Ok(Json(app.sv().order.by_id(&user.id, &id).await?))
}

pub async fn simulate_payment(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
  Path(id): Path<String>,
) -> Result<impl IntoResponse> {
  if !app.config.allow_simulated_payments() {
    return Err(Error::Forbidden("Endpoint não disponível em produção".into()));
  }

  let order = app.sv().payment.simulate(&user.id, &id).await?;

  Ok(Json(json::json!({
    "success": true,
    "message": "Pagamento simulado com sucesso",
    "pedido": {
      "id": order.id,
      "numero": order.numero,
      "status": order.status,
    },
  })))
}

pub async fn tickets(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
) -> Result<impl IntoResponse> {
  let ingressos = app.sv().ticket.list(&user.id).await?;
  Ok(Json(json::json!({ "ingressos": ingressos })))
}

pub async fn ticket(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
  Path(codigo): Path<String>,
) -> Result<impl IntoResponse> {
  let ingresso = app.sv().ticket.by_code(&user.id, &codigo).await?;
  Ok(Json(json::json!({ "ingresso": ingresso })))
}

pub async fn dashboard_stats(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
) -> Result<impl IntoResponse> {
  Ok(Json(app.sv().order.stats(&user.id).await?))
}
