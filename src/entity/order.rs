//! Order ("pedido") and its status lattice

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{event, user};

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
pub enum OrderStatus {
  #[sea_orm(string_value = "pendente")]
  #[serde(rename = "pendente")]
  Pending,
  #[sea_orm(string_value = "processando")]
  #[serde(rename = "processando")]
  Processing,
  #[sea_orm(string_value = "pago")]
  #[serde(rename = "pago")]
  Paid,
  #[sea_orm(string_value = "cancelado")]
  #[serde(rename = "cancelado")]
  Cancelled,
  #[sea_orm(string_value = "expirado")]
  #[serde(rename = "expirado")]
  Expired,
  #[sea_orm(string_value = "reembolsado")]
  #[serde(rename = "reembolsado")]
  Refunded,
}

impl OrderStatus {
  /// Statuses whose quantities count against the per-user limit.
  pub const RESERVING: [OrderStatus; 3] =
    [OrderStatus::Paid, OrderStatus::Pending, OrderStatus::Processing];

  /// Whether a webhook may move an order from `self` to `next`.
  ///
  /// Re-applying the current status is always allowed. `expirado` may still
  /// become `pago`: expiry is only flipped lazily on read, while the gateway
  /// remains the source of truth for money received.
  pub fn can_become(self, next: OrderStatus) -> bool {
    use OrderStatus::*;

    self == next
      || matches!(
        (self, next),
        (Pending, _)
          | (Processing, Paid | Expired | Cancelled)
          | (Paid, Refunded | Cancelled)
          | (Expired, Paid)
      )
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pedidos")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  #[sea_orm(unique)]
  pub numero: String,
  pub usuario_id: String,
  pub evento_id: String,
  pub status: OrderStatus,
  pub quantidade_total: i32,
  /// centavos
  pub valor_total: i64,
  pub expires_at: Option<DateTime>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  pub fn is_expired_at(&self, now: DateTime) -> bool {
    self.status == OrderStatus::Pending
      && self.expires_at.is_some_and(|expires_at| expires_at < now)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UsuarioId",
    to = "user::Column::Id"
  )]
  User,
  #[sea_orm(
    belongs_to = "event::Entity",
    from = "Column::EventoId",
    to = "event::Column::Id"
  )]
  Event,
  #[sea_orm(has_many = "super::order_item::Entity")]
  Items,
  #[sea_orm(has_one = "super::payment::Entity")]
  Payment,
  #[sea_orm(has_many = "super::ticket::Entity")]
  Tickets,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<event::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Event.def()
  }
}

impl Related<super::order_item::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Items.def()
  }
}

impl Related<super::payment::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Payment.def()
  }
}

impl Related<super::ticket::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Tickets.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
