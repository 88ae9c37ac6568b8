//! PIX payment attached one-to-one to an order

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::order;

#[derive(
  Copy,
  Clone,
  Debug,
  PartialEq,
  Eq,
  Hash,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  #[sea_orm(string_value = "pending")]
  Pending,
  #[sea_orm(string_value = "approved")]
  Approved,
  #[sea_orm(string_value = "in_process")]
  InProcess,
  #[sea_orm(string_value = "rejected")]
  Rejected,
  #[sea_orm(string_value = "cancelled")]
  Cancelled,
  #[sea_orm(string_value = "refunded")]
  Refunded,
  #[sea_orm(string_value = "charged_back")]
  ChargedBack,
}

impl PaymentStatus {
  /// Forward-only transitions. `cancelled` may still be approved when the
  /// provider confirms a late payment.
  pub fn can_become(self, next: PaymentStatus) -> bool {
    use PaymentStatus::*;

    self == next
      || matches!(
        (self, next),
        (Pending, _)
          | (InProcess, Approved | Rejected | Cancelled)
          | (Approved, Refunded | ChargedBack)
          | (Cancelled, Approved)
      )
  }
}

/// Gateway that produced the charge.
#[derive(
  Copy,
  Clone,
  Debug,
  PartialEq,
  Eq,
  EnumIter,
  DeriveActiveEnum,
  Serialize,
  Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Provider {
  #[sea_orm(string_value = "asaas")]
  Asaas,
  #[sea_orm(string_value = "mercado_pago")]
  MercadoPago,
  #[sea_orm(string_value = "simulado")]
  #[serde(rename = "simulado")]
  Simulated,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pagamentos")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  #[sea_orm(unique)]
  pub pedido_id: String,
  pub gateway: Provider,
  pub gateway_charge_id: Option<String>,
  pub metodo: String,
  pub status: PaymentStatus,
  pub valor: i64,
  #[sea_orm(column_type = "Text", nullable)]
  pub pix_qr_code: Option<String>,
  #[sea_orm(column_type = "Text", nullable)]
  pub pix_qr_code_base64: Option<String>,
  pub pix_expiration: Option<DateTime>,
  pub pago_em: Option<DateTime>,
  #[serde(skip_serializing)]
  pub raw_response: Option<Json>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "order::Entity",
    from = "Column::PedidoId",
    to = "order::Column::Id",
    on_delete = "Cascade"
  )]
  Order,
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Order.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
