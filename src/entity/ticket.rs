use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{event, lot, order};

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
pub enum TicketStatus {
  #[sea_orm(string_value = "ativo")]
  #[serde(rename = "ativo")]
  Active,
  #[sea_orm(string_value = "utilizado")]
  #[serde(rename = "utilizado")]
  Used,
  #[sea_orm(string_value = "cancelado")]
  #[serde(rename = "cancelado")]
  Cancelled,
  #[sea_orm(string_value = "transferido")]
  #[serde(rename = "transferido")]
  Transferred,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingressos")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  #[sea_orm(unique)]
  pub codigo: String,
  pub pedido_id: String,
  pub pedido_item_id: String,
  pub usuario_id: String,
  pub evento_id: String,
  pub lote_id: String,
  pub nome_titular: String,
  pub status: TicketStatus,
  /// PNG data URL
  #[sea_orm(column_type = "Text", nullable)]
  pub qr_code: Option<String>,
  pub utilizado_em: Option<DateTime>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "order::Entity",
    from = "Column::PedidoId",
    to = "order::Column::Id"
  )]
  Order,
  #[sea_orm(
    belongs_to = "event::Entity",
    from = "Column::EventoId",
    to = "event::Column::Id"
  )]
  Event,
  #[sea_orm(
    belongs_to = "lot::Entity",
    from = "Column::LoteId",
    to = "lot::Column::Id"
  )]
  Lot,
}

impl Related<order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Order.def()
  }
}

impl Related<event::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Event.def()
  }
}

impl Related<lot::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lot.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
