//! Price tier ("lote") of the event

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::event;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lotes")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub evento_id: String,
  pub nome: String,
  pub descricao: Option<String>,
  /// Unit price in centavos
  pub preco: i64,
  pub quantidade_total: i32,
  /// Only grows, bumped when an order is confirmed
  pub quantidade_vendida: i32,
  pub limite_por_usuario: i32,
  pub ordem: i32,
  pub ativo: bool,
  pub data_inicio_vendas: Option<DateTime>,
  pub data_fim_vendas: Option<DateTime>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl Model {
  pub fn available(&self) -> i32 {
    (self.quantidade_total - self.quantidade_vendida).max(0)
  }

  pub fn sold_out(&self) -> bool {
    self.quantidade_total - self.quantidade_vendida <= 0
  }

  /// Both bounds are optional and inclusive.
  pub fn in_sales_window(&self, now: DateTime) -> bool {
    if let Some(start) = self.data_inicio_vendas
      && now < start
    {
      return false;
    }
    if let Some(end) = self.data_fim_vendas
      && now > end
    {
      return false;
    }
    true
  }

  pub fn purchasable(&self, now: DateTime) -> bool {
    self.ativo && !self.sold_out() && self.in_sales_window(now)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "event::Entity",
    from = "Column::EventoId",
    to = "event::Column::Id"
  )]
  Event,
  #[sea_orm(has_many = "super::order_item::Entity")]
  OrderItems,
}

impl Related<event::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Event.def()
  }
}

impl Related<super::order_item::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::OrderItems.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
