use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{lot, order};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pedido_itens")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub pedido_id: String,
  pub lote_id: String,
  pub quantidade: i32,
  pub preco_unitario: i64,
  pub subtotal: i64,
  pub created_at: DateTime,
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

impl Related<lot::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lot.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
