//! Asaas PIX integration (https://docs.asaas.com/reference)
//!
//! A charge takes three calls: resolve the customer by email, create the
//! payment, then fetch its PIX QR code.

use axum::http::HeaderMap;
use json::{Value, json};
use reqwest::{Client, Url};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::{
  ChargeRequest, Error, Notification, Payer, PaymentGateway, PixCharge,
  StatusPair, decode, read_json,
};
use crate::{
  entity::{OrderStatus, PaymentStatus, Provider},
  prelude::*,
};

const PRODUCTION_URL: &str = "https://api.asaas.com/v3";
const SANDBOX_URL: &str = "https://api-sandbox.asaas.com/v3";
const TOKEN_HEADER: &str = "asaas-access-token";

#[derive(Debug, Clone)]
pub struct Settings {
  pub api_key: String,
  /// `sandbox` or `production`
  pub environment: String,
  pub webhook_token: Option<String>,
  pub strict_signatures: bool,
}

impl Settings {
  pub fn base_url(&self) -> &'static str {
    if self.environment == "sandbox" { SANDBOX_URL } else { PRODUCTION_URL }
  }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
  #[serde(default = "Vec::new")]
  data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Customer {
  id: String,
  #[serde(default)]
  cpf_cnpj: Option<String>,
}

impl Customer {
  fn has_tax_id(&self) -> bool {
    self.cpf_cnpj.as_deref().is_some_and(|cpf| !cpf.is_empty())
  }
}

#[derive(Debug, Deserialize)]
struct Payment {
  id: String,
  status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PixQrCode {
  #[serde(default)]
  encoded_image: String,
  #[serde(default)]
  payload: String,
  #[serde(default)]
  expiration_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayment {
  id: String,
  status: String,
  #[serde(default)]
  external_reference: Option<String>,
}

pub struct Asaas {
  client: Client,
  settings: Settings,
}

impl Asaas {
  pub fn new(settings: Settings) -> Result<Self, Error> {
    if settings.api_key.is_empty() {
      return Err(Error::Config("ASAAS_API_KEY"));
    }
    Ok(Self { client: super::http_client()?, settings })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.settings.base_url())
  }

  async fn find_or_create_customer(
    &self,
    payer: &Payer<'_>,
  ) -> Result<Customer, Error> {
    let search =
      Url::parse_with_params(&self.url("/customers"), [("email", payer.email)])
        .map_err(|e| Error::Decode(e.to_string()))?;

    let resp = self
      .client
      .get(search)
      .header("access_token", &self.settings.api_key)
      .send()
      .await?;
    let page: Page<Customer> =
      decode(read_json(resp, "Erro ao buscar cliente").await?)?;

    let cpf = payer.cpf.map(utils::digits).filter(|cpf| !cpf.is_empty());

    if let Some(existing) = page.data.into_iter().next() {
      if existing.has_tax_id() {
        return Ok(existing);
      }
      let Some(cpf) = cpf else {
        return Ok(existing);
      };

      info!("Updating tax id of Asaas customer {}", existing.id);
      let resp = self
        .client
        .put(self.url(&format!("/customers/{}", existing.id)))
        .header("access_token", &self.settings.api_key)
        .json(&json!({ "cpfCnpj": cpf }))
        .send()
        .await?;

      // keep going with the stale customer, the charge call reports any
      // remaining tax id problem
      return match read_json(resp, "Erro ao atualizar cliente").await {
        Ok(body) => decode(body),
        Err(err) => {
          warn!("Failed to update Asaas customer {}: {err}", existing.id);
          Ok(existing)
        }
      };
    }

    let resp = self
      .client
      .post(self.url("/customers"))
      .header("access_token", &self.settings.api_key)
      .json(&json!({
        "name": payer.nome,
        "email": payer.email,
        "cpfCnpj": cpf,
        "phone": payer.telefone.map(utils::digits),
      }))
      .send()
      .await?;

    decode(read_json(resp, "Erro ao criar cliente").await?)
  }

  async fn create_payment(
    &self,
    customer: &Customer,
    req: &ChargeRequest<'_>,
  ) -> Result<(Payment, Value), Error> {
    let due_date = (Utc::now() + TimeDelta::days(1)).format("%Y-%m-%d");

    let resp = self
      .client
      .post(self.url("/payments"))
      .header("access_token", &self.settings.api_key)
      .json(&json!({
        "customer": customer.id,
        "billingType": "PIX",
        "value": req.amount as f64 / 100.0,
        "dueDate": due_date.to_string(),
        "description": req.description,
        "externalReference": req.external_reference,
      }))
      .send()
      .await?;

    let body = read_json(resp, "Erro ao criar cobrança").await?;
    Ok((decode(body.clone())?, body))
  }

  async fn pix_qr_code(&self, payment_id: &str) -> Result<PixQrCode, Error> {
    let resp = self
      .client
      .get(self.url(&format!("/payments/{payment_id}/pixQrCode")))
      .header("access_token", &self.settings.api_key)
      .send()
      .await?;

    let qr: PixQrCode =
      decode(read_json(resp, "Erro ao obter QR Code").await?)?;
    if qr.payload.is_empty() || qr.encoded_image.is_empty() {
      return Err(Error::Decode("QR Code retornado sem dados completos".into()));
    }
    Ok(qr)
  }

  fn check_token(&self, headers: &HeaderMap) -> Result<(), Error> {
    let Some(expected) = &self.settings.webhook_token else {
      return match self.settings.strict_signatures {
        true => Err(Error::InvalidSignature),
        false => Ok(()),
      };
    };

    let given = headers
      .get(TOKEN_HEADER)
      .and_then(|value| value.to_str().ok())
      .unwrap_or_default();

    if bool::from(given.as_bytes().ct_eq(expected.as_bytes())) {
      return Ok(());
    }
    if self.settings.strict_signatures {
      return Err(Error::InvalidSignature);
    }
    error!("Asaas webhook token mismatch, processing anyway");
    Ok(())
  }
}

pub fn map_status(status: &str) -> StatusPair {
  use OrderStatus as O;
  use PaymentStatus as P;

  match status {
    "CONFIRMED" | "RECEIVED" | "RECEIVED_IN_CASH" => {
      StatusPair::new(P::Approved, O::Paid)
    }
    "OVERDUE" => StatusPair::new(P::Cancelled, O::Expired),
    "REFUNDED" | "REFUND_REQUESTED" | "REFUND_IN_PROGRESS" => {
      StatusPair::new(P::Refunded, O::Refunded)
    }
    "CHARGEBACK_REQUESTED"
    | "CHARGEBACK_DISPUTE"
    | "AWAITING_CHARGEBACK_REVERSAL" => {
      StatusPair::new(P::ChargedBack, O::Cancelled)
    }
    _ => StatusPair::PENDING,
  }
}

/// Extracts the payment from a webhook body, `None` when there is none.
fn parse_webhook(body: &[u8]) -> Result<Option<(WebhookPayment, Value)>, Error> {
  let body: Value =
    json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;

  if let Some(event) = body.get("event").and_then(Value::as_str) {
    debug!("Asaas webhook event {event}");
  }

  match body.get("payment") {
    Some(raw) if raw.is_object() => {
      Ok(Some((decode(raw.clone())?, raw.clone())))
    }
    _ => Ok(None),
  }
}

#[async_trait]
impl PaymentGateway for Asaas {
  fn provider(&self) -> Provider {
    Provider::Asaas
  }

  fn expiration(&self) -> Duration {
    Duration::from_secs(30 * 60)
  }

  fn map_status(&self, status: &str, _detail: Option<&str>) -> StatusPair {
    map_status(status)
  }

  async fn create_pix_charge(
    &self,
    req: &ChargeRequest<'_>,
  ) -> Result<PixCharge, Error> {
    if req.payer.cpf.map(utils::digits).is_none_or(|cpf| cpf.is_empty()) {
      return Err(Error::MissingTaxId);
    }

    let customer = self.find_or_create_customer(&req.payer).await?;

    let (payment, raw) = self.create_payment(&customer, req).await?;
    info!("Asaas charge {} created for {}", payment.id, req.external_reference);

    let qr = self.pix_qr_code(&payment.id).await?;

    Ok(PixCharge {
      status: self.map_status(&payment.status, None),
      raw: json!({
        "payment": raw,
        "pixQrCode": {
          "payload": qr.payload,
          "expirationDate": qr.expiration_date,
        },
      }),
      charge_id: payment.id,
      pix_payload: qr.payload,
      pix_image_base64: qr.encoded_image,
    })
  }

  async fn notification(
    &self,
    headers: &HeaderMap,
    body: &[u8],
  ) -> Result<Option<Notification>, Error> {
    self.check_token(headers)?;

    let Some((payment, raw)) = parse_webhook(body)? else {
      return Ok(None);
    };

    Ok(Some(Notification {
      status: self.map_status(&payment.status, None),
      charge_id: payment.id,
      external_reference: payment
        .external_reference
        .filter(|reference| !reference.is_empty()),
      raw,
    }))
  }
}
