//! Offline gateway for local development. Charges carry a well-formed but
//! unpayable PIX payload; approval goes through the dev-only
//! `simular-pagamento` endpoint.

use axum::http::HeaderMap;
use json::{Value, json};
use rand::Rng;
use serde::Deserialize;

use super::{
  ChargeRequest, Error, Notification, PaymentGateway, PixCharge, StatusPair,
  decode,
};
use crate::{
  entity::{OrderStatus, PaymentStatus, Provider},
  prelude::*,
};

pub struct Simulated;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Delivery {
  #[serde(default)]
  charge_id: String,
  #[serde(default)]
  external_reference: Option<String>,
  status: String,
}

pub fn pix_payload(order_id: &str, amount: i64) -> String {
  let crc: u16 = rand::thread_rng().r#gen();
  format!(
    "00020126580014BR.GOV.BCB.PIX0136{order_id}520400005303986540{}\
     5802BR5913NAIPE VIP6008SAOPAULO62070503***6304{crc:04X}",
    utils::format_amount(amount)
  )
}

pub fn map_status(status: &str) -> StatusPair {
  use OrderStatus as O;
  use PaymentStatus as P;

  match status {
    "approved" => StatusPair::new(P::Approved, O::Paid),
    "in_process" => StatusPair::new(P::InProcess, O::Processing),
    "rejected" => StatusPair::new(P::Rejected, O::Cancelled),
    "cancelled" => StatusPair::new(P::Cancelled, O::Cancelled),
    "expired" => StatusPair::new(P::Cancelled, O::Expired),
    "refunded" => StatusPair::new(P::Refunded, O::Refunded),
    "charged_back" => StatusPair::new(P::ChargedBack, O::Cancelled),
    _ => StatusPair::PENDING,
  }
}

#[async_trait]
impl PaymentGateway for Simulated {
  fn provider(&self) -> Provider {
    Provider::Simulated
  }

  fn expiration(&self) -> Duration {
    Duration::from_secs(15 * 60)
  }

  fn map_status(&self, status: &str, _detail: Option<&str>) -> StatusPair {
    map_status(status)
  }

  async fn create_pix_charge(
    &self,
    req: &ChargeRequest<'_>,
  ) -> Result<PixCharge, Error> {
    let pix_payload = pix_payload(req.external_reference, req.amount);
    let pix_image_base64 = utils::qr_png_base64(&pix_payload, 300)
      .map_err(|e| Error::Provider(e.to_string()))?;
    let charge_id = format!("sim_{}", uuid::Uuid::new_v4().simple());

    debug!("Simulated charge {charge_id} for {}", req.external_reference);

    Ok(PixCharge {
      raw: json!({
        "id": charge_id,
        "simulado": true,
        "valor": req.amount,
        "externalReference": req.external_reference,
      }),
      charge_id,
      pix_payload,
      pix_image_base64,
      status: StatusPair::PENDING,
    })
  }

  async fn notification(
    &self,
    _headers: &HeaderMap,
    body: &[u8],
  ) -> Result<Option<Notification>, Error> {
    let raw: Value =
      json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))?;
    let delivery: Delivery = decode(raw.clone())?;

    Ok(Some(Notification {
      status: self.map_status(&delivery.status, None),
      charge_id: delivery.charge_id,
      external_reference: delivery.external_reference,
      raw,
    }))
  }
}
