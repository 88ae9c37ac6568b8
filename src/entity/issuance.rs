//! Marker row claiming ticket issuance for an order. The primary key on
//! `pedido_id` lets only one writer win.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "emissoes")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub pedido_id: String,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
