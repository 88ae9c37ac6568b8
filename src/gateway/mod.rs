//! PIX payment gateways
//!
//! Every provider is reached through [`PaymentGateway`]. The active one is
//! chosen from configuration at startup and shared as
//! `Arc<dyn PaymentGateway>`.

pub mod asaas;
pub mod mercado_pago;
pub mod simulated;

use std::sync::Arc;

use axum::http::HeaderMap;
use json::Value;
use reqwest::Response;

pub use self::{asaas::Asaas, mercado_pago::MercadoPago, simulated::Simulated};
use crate::{
  entity::{OrderStatus, PaymentStatus, Provider},
  prelude::*,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0} não configurado")]
  Config(&'static str),

  #[error("CPF é obrigatório para pagamento via PIX")]
  MissingTaxId,

  #[error("Erro de conexão com o gateway: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{0}")]
  Provider(String),

  #[error("Resposta inválida do gateway: {0}")]
  Decode(String),

  #[error("Assinatura do webhook inválida")]
  InvalidSignature,
}

impl Error {
  /// Message safe to show to the buyer.
  pub fn user_message(&self) -> String {
    match self {
      Error::Http(_) => "Erro de conexão com o gateway de pagamento".into(),
      other => other.to_string(),
    }
  }
}

/// Internal projection of a provider status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusPair {
  pub payment: PaymentStatus,
  pub order: OrderStatus,
}

impl StatusPair {
  pub const PENDING: StatusPair = StatusPair::new(
    PaymentStatus::Pending,
    OrderStatus::Pending,
  );

  pub const fn new(payment: PaymentStatus, order: OrderStatus) -> Self {
    Self { payment, order }
  }
}

#[derive(Debug, Clone)]
pub struct Payer<'a> {
  pub nome: &'a str,
  pub email: &'a str,
  pub telefone: Option<&'a str>,
  pub cpf: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ChargeRequest<'a> {
  pub payer: Payer<'a>,
  /// centavos
  pub amount: i64,
  pub description: &'a str,
  /// Internal order id, echoed back in webhooks
  pub external_reference: &'a str,
  pub expiration: Duration,
}

#[derive(Debug, Clone)]
pub struct PixCharge {
  pub charge_id: String,
  /// Copy-paste ("copia e cola") payload
  pub pix_payload: String,
  /// PNG, base64 without a data-URL prefix
  pub pix_image_base64: String,
  pub status: StatusPair,
  pub raw: Value,
}

/// A webhook delivery decoded into internal terms.
#[derive(Debug, Clone)]
pub struct Notification {
  pub charge_id: String,
  pub external_reference: Option<String>,
  pub status: StatusPair,
  pub raw: Value,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn provider(&self) -> Provider;

  /// How long a PIX charge stays payable.
  fn expiration(&self) -> Duration;

  /// Total over the provider vocabulary; unknown values are pending.
  fn map_status(&self, status: &str, detail: Option<&str>) -> StatusPair;

  async fn create_pix_charge(
    &self,
    req: &ChargeRequest<'_>,
  ) -> Result<PixCharge, Error>;

  /// Decodes a webhook delivery. `Ok(None)` means it carries nothing to
  /// apply and should simply be acknowledged.
  async fn notification(
    &self,
    headers: &HeaderMap,
    body: &[u8],
  ) -> Result<Option<Notification>, Error>;
}

#[derive(Debug, Clone)]
pub enum Settings {
  Asaas(asaas::Settings),
  MercadoPago(mercado_pago::Settings),
  Simulated,
}

pub fn connect(settings: &Settings) -> Result<Arc<dyn PaymentGateway>, Error> {
  Ok(match settings {
    Settings::Asaas(settings) => Arc::new(Asaas::new(settings.clone())?),
    Settings::MercadoPago(settings) => {
      Arc::new(MercadoPago::new(settings.clone())?)
    }
    Settings::Simulated => Arc::new(Simulated),
  })
}

pub(crate) fn http_client() -> Result<reqwest::Client, Error> {
  Ok(
    reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .user_agent(concat!("naipe/", env!("CARGO_PKG_VERSION")))
      .build()?,
  )
}

/// Reads a JSON body, turning non-2xx answers into [`Error::Provider`] with
/// the provider's own description when it has one.
pub(crate) async fn read_json(
  resp: Response,
  fallback: &str,
) -> Result<Value, Error> {
  let status = resp.status();
  let body: Value = resp.json().await.unwrap_or(Value::Null);

  if !status.is_success() {
    debug!("Gateway answered {status}: {body}");
    return Err(Error::Provider(
      provider_message(&body)
        .unwrap_or_else(|| format!("{fallback} (HTTP {})", status.as_u16())),
    ));
  }

  Ok(body)
}

fn provider_message(body: &Value) -> Option<String> {
  body
    .pointer("/errors/0/description")
    .or_else(|| body.get("message"))
    .or_else(|| body.pointer("/cause/0/description"))
    .and_then(Value::as_str)
    .map(str::to_string)
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
  value: Value,
) -> Result<T, Error> {
  json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
}
