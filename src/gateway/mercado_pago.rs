//! Mercado Pago Orders API (`/v1/orders`) with PIX as the only method.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use json::{Value, json};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{
  ChargeRequest, Error, Notification, PaymentGateway, PixCharge, StatusPair,
  decode, read_json,
};
use crate::{
  entity::{OrderStatus, PaymentStatus, Provider},
  prelude::*,
};

const BASE_URL: &str = "https://api.mercadopago.com";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct Settings {
  pub access_token: String,
  pub webhook_secret: Option<String>,
  pub strict_signatures: bool,
}

#[derive(Debug, Deserialize)]
struct Order {
  id: String,
  status: String,
  #[serde(default)]
  status_detail: Option<String>,
  #[serde(default)]
  external_reference: Option<String>,
}

pub struct MercadoPago {
  client: Client,
  settings: Settings,
}

impl MercadoPago {
  pub fn new(settings: Settings) -> Result<Self, Error> {
    if settings.access_token.is_empty() {
      return Err(Error::Config("MERCADO_PAGO_ACCESS_TOKEN"));
    }
    Ok(Self { client: super::http_client()?, settings })
  }

  async fn fetch_order(&self, id: &str) -> Result<Value, Error> {
    let resp = self
      .client
      .get(format!("{BASE_URL}/v1/orders/{id}"))
      .bearer_auth(&self.settings.access_token)
      .send()
      .await?;
    read_json(resp, "Order não encontrada").await
  }

  fn check_signature(
    &self,
    headers: &HeaderMap,
    data_id: &str,
  ) -> Result<(), Error> {
    let valid = match &self.settings.webhook_secret {
      Some(secret) => verify_signature(
        secret,
        header(headers, "x-signature"),
        header(headers, "x-request-id"),
        data_id,
      ),
      None => false,
    };

    if valid {
      return Ok(());
    }
    if self.settings.strict_signatures {
      return Err(Error::InvalidSignature);
    }
    if self.settings.webhook_secret.is_some() {
      error!("Mercado Pago webhook signature mismatch, processing anyway");
    }
    Ok(())
  }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
  headers.get(name).and_then(|value| value.to_str().ok()).unwrap_or_default()
}

/// Checks `x-signature` (`ts=..,v1=..`) against the HMAC-SHA256 of
/// `id:{data.id};request-id:{x-request-id};ts:{ts};`.
pub fn verify_signature(
  secret: &str,
  signature: &str,
  request_id: &str,
  data_id: &str,
) -> bool {
  let (mut ts, mut v1) = (None, None);
  for part in signature.split(',') {
    match part.split_once('=').map(|(k, v)| (k.trim(), v.trim())) {
      Some(("ts", value)) => ts = Some(value),
      Some(("v1", value)) => v1 = Some(value),
      _ => {}
    }
  }
  let (Some(ts), Some(v1)) = (ts, v1) else {
    return false;
  };

  let manifest = format!(
    "id:{};request-id:{request_id};ts:{ts};",
    data_id.to_lowercase()
  );

  let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
    return false;
  };
  mac.update(manifest.as_bytes());
  let expected = hex::encode(mac.finalize().into_bytes());

  expected.as_bytes().ct_eq(v1.to_ascii_lowercase().as_bytes()).into()
}

pub fn map_status(status: &str, _detail: Option<&str>) -> StatusPair {
  use OrderStatus as O;
  use PaymentStatus as P;

  match status {
    "processed" => StatusPair::new(P::Approved, O::Paid),
    "processing" => StatusPair::new(P::InProcess, O::Processing),
    "cancelled" => StatusPair::new(P::Cancelled, O::Cancelled),
    "expired" => StatusPair::new(P::Cancelled, O::Expired),
    "failed" => StatusPair::new(P::Rejected, O::Cancelled),
    "refunded" => StatusPair::new(P::Refunded, O::Refunded),
    _ => StatusPair::PENDING,
  }
}

/// Request body for `POST /v1/orders`.
pub fn order_body(req: &ChargeRequest<'_>) -> Value {
  let amount = utils::format_amount(req.amount);

  let mut names = req.payer.nome.split_whitespace();
  let first_name = names.next().unwrap_or(req.payer.nome).to_string();
  let last_name = match names.collect::<Vec<_>>().join(" ") {
    rest if rest.is_empty() => first_name.clone(),
    rest => rest,
  };

  let mut payer = json!({
    "email": req.payer.email,
    "first_name": first_name,
    "last_name": last_name,
  });
  if let Some(cpf) = req.payer.cpf.map(utils::digits)
    && !cpf.is_empty()
  {
    payer["identification"] = json!({ "type": "CPF", "number": cpf });
  }

  json!({
    "type": "online",
    "processing_mode": "automatic",
    "external_reference": req.external_reference,
    "description": req.description,
    "total_amount": amount,
    "payer": payer,
    "transactions": {
      "payments": [{
        "amount": amount,
        "payment_method": { "id": "pix", "type": "bank_transfer" },
        "expiration_time": format!("PT{}M", req.expiration.as_secs() / 60),
      }]
    },
  })
}

fn charge_from_order(body: Value) -> Result<PixCharge, Error> {
  let order: Order = decode(body.clone())?;

  let method = body
    .pointer("/transactions/payments/0/payment_method")
    .cloned()
    .unwrap_or(Value::Null);
  let field = |name: &str| {
    method
      .get(name)
      .or_else(|| method.get("data").and_then(|data| data.get(name)))
      .and_then(Value::as_str)
      .filter(|value| !value.is_empty())
      .map(str::to_string)
  };

  let (Some(pix_payload), Some(pix_image_base64)) =
    (field("qr_code"), field("qr_code_base64"))
  else {
    return Err(Error::Decode("QR Code PIX não retornado".into()));
  };

  Ok(PixCharge {
    status: map_status(&order.status, order.status_detail.as_deref()),
    charge_id: order.id,
    pix_payload,
    pix_image_base64,
    raw: body,
  })
}

#[async_trait]
impl PaymentGateway for MercadoPago {
  fn provider(&self) -> Provider {
    Provider::MercadoPago
  }

  fn expiration(&self) -> Duration {
    Duration::from_secs(15 * 60)
  }

  fn map_status(&self, status: &str, detail: Option<&str>) -> StatusPair {
    map_status(status, detail)
  }

  async fn create_pix_charge(
    &self,
    req: &ChargeRequest<'_>,
  ) -> Result<PixCharge, Error> {
    let idempotency_key = format!(
      "{}-{}",
      req.external_reference,
      Utc::now().timestamp_millis()
    );

    let resp = self
      .client
      .post(format!("{BASE_URL}/v1/orders"))
      .bearer_auth(&self.settings.access_token)
      .header("X-Idempotency-Key", idempotency_key)
      .json(&order_body(req))
      .send()
      .await?;

    let charge =
      charge_from_order(read_json(resp, "Erro ao criar pagamento").await?)?;
    info!(
      "Mercado Pago order {} created for {}",
      charge.charge_id, req.external_reference
    );
    Ok(charge)
  }

  async fn notification(
    &self,
    headers: &HeaderMap,
    body: &[u8],
  ) -> Result<Option<Notification>, Error> {
    let body: Value =
      json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;

    let data_id = match body.pointer("/data/id") {
      Some(Value::String(id)) => id.clone(),
      Some(Value::Number(id)) => id.to_string(),
      _ => String::new(),
    };
    self.check_signature(headers, &data_id)?;

    let kind = body.get("type").and_then(Value::as_str).unwrap_or_default();
    let action = body.get("action").and_then(Value::as_str).unwrap_or_default();
    if kind != "order" && action != "order.updated" {
      debug!("Ignoring Mercado Pago notification type={kind} action={action}");
      return Ok(None);
    }
    if data_id.is_empty() {
      return Ok(None);
    }

    let raw = self.fetch_order(&data_id).await?;
    let order: Order = decode(raw.clone())?;

    Ok(Some(Notification {
      status: self.map_status(&order.status, order.status_detail.as_deref()),
      charge_id: order.id,
      external_reference: order
        .external_reference
        .filter(|reference| !reference.is_empty()),
      raw,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::Payer;

  fn sign(secret: &str, manifest: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(manifest.as_bytes());
    hex::encode(mac.finalize().into_bytes())
  }

  fn request<'a>(nome: &'a str, cpf: Option<&'a str>) -> ChargeRequest<'a> {
    ChargeRequest {
      payer: Payer { nome, email: "ana@naipe.com.br", telefone: None, cpf },
      amount: 3500,
      description: "2x Ingresso - Naipe VIP",
      external_reference: "pedido-1",
      expiration: Duration::from_secs(15 * 60),
    }
  }

  fn gateway(secret: Option<&str>, strict: bool) -> MercadoPago {
    MercadoPago::new(Settings {
      access_token: "TEST-token".into(),
      webhook_secret: secret.map(str::to_string),
      strict_signatures: strict,
    })
    .unwrap()
  }

  #[test]
  fn test_signature() {
    let v1 = sign("secret", "id:abc123;request-id:req-1;ts:1700000000;");
    let header = format!("ts=1700000000,v1={v1}");

    assert!(verify_signature("secret", &header, "req-1", "ABC123"));
    assert!(!verify_signature("other", &header, "req-1", "ABC123"));
    assert!(!verify_signature("secret", &header, "req-2", "ABC123"));
    assert!(!verify_signature("secret", "ts=1700000000", "req-1", "abc123"));
    assert!(!verify_signature("secret", "", "req-1", "abc123"));
  }

  #[test]
  fn test_status_mapping() {
    use OrderStatus as O;
    use PaymentStatus as P;

    let cases = [
      ("processed", Some("accredited"), P::Approved, O::Paid),
      ("action_required", Some("waiting_transfer"), P::Pending, O::Pending),
      ("processing", None, P::InProcess, O::Processing),
      ("cancelled", None, P::Cancelled, O::Cancelled),
      ("cancelled", Some("expired"), P::Cancelled, O::Cancelled),
      ("charged_back", None, P::Pending, O::Pending),
      ("expired", None, P::Cancelled, O::Expired),
      ("failed", None, P::Rejected, O::Cancelled),
      ("refunded", None, P::Refunded, O::Refunded),
      ("created", None, P::Pending, O::Pending),
    ];

    for (status, detail, payment, order) in cases {
      assert_eq!(
        map_status(status, detail),
        StatusPair::new(payment, order),
        "{status}"
      );
    }
  }

  #[test]
  fn test_order_body() {
    let body = order_body(&request("Ana Maria Souza", Some("123.456.789-09")));

    assert_eq!(body["total_amount"], "35.00");
    assert_eq!(body["payer"]["first_name"], "Ana");
    assert_eq!(body["payer"]["last_name"], "Maria Souza");
    assert_eq!(body["payer"]["identification"]["number"], "12345678909");

    let payment = &body["transactions"]["payments"][0];
    assert_eq!(payment["amount"], "35.00");
    assert_eq!(payment["payment_method"]["id"], "pix");
    assert_eq!(payment["expiration_time"], "PT15M");
  }

  #[test]
  fn test_order_body_single_name_without_cpf() {
    let body = order_body(&request("Ana", None));
    assert_eq!(body["payer"]["last_name"], "Ana");
    assert!(body["payer"].get("identification").is_none());
  }

  #[test]
  fn test_charge_from_order() {
    let body = json!({
      "id": "ORD01",
      "status": "action_required",
      "status_detail": "waiting_transfer",
      "external_reference": "pedido-1",
      "transactions": { "payments": [{
        "payment_method": {
          "id": "pix",
          "qr_code": "00020126...",
          "qr_code_base64": "iVBORw0KGgo=",
        }
      }]}
    });

    let charge = charge_from_order(body).unwrap();
    assert_eq!(charge.charge_id, "ORD01");
    assert_eq!(charge.pix_payload, "00020126...");
    assert_eq!(charge.status, StatusPair::PENDING);

    let without_qr = json!({ "id": "ORD02", "status": "action_required" });
    assert!(matches!(charge_from_order(without_qr), Err(Error::Decode(_))));
  }

  #[tokio::test]
  async fn test_unrelated_notifications_are_ignored() {
    let body = json!({ "type": "payment", "action": "payment.created", "data": { "id": "1" } });
    let notification = gateway(None, false)
      .notification(&HeaderMap::new(), body.to_string().as_bytes())
      .await
      .unwrap();
    assert!(notification.is_none());
  }

  #[tokio::test]
  async fn test_strict_signatures() {
    let body = json!({ "type": "order", "data": { "id": "ORD01" } }).to_string();

    let missing_secret = gateway(None, true);
    assert!(matches!(
      missing_secret.notification(&HeaderMap::new(), body.as_bytes()).await,
      Err(Error::InvalidSignature)
    ));

    let mut headers = HeaderMap::new();
    headers.insert("x-signature", "ts=1,v1=deadbeef".parse().unwrap());
    headers.insert("x-request-id", "req-1".parse().unwrap());
    assert!(matches!(
      gateway(Some("secret"), true).notification(&headers, body.as_bytes()).await,
      Err(Error::InvalidSignature)
    ));
  }
}
