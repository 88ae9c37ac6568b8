use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub nome: String,
  #[sea_orm(unique)]
  pub email: String,
  /// digits only
  #[sea_orm(unique)]
  pub telefone: String,
  #[serde(skip_serializing)]
  pub senha_hash: String,
  pub email_verificado: bool,
  pub telefone_verificado: bool,
  pub ativo: bool,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::session::Entity")]
  Sessions,
  #[sea_orm(has_many = "super::order::Entity")]
  Orders,
}

impl Related<super::session::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Sessions.def()
  }
}

impl Related<super::order::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Orders.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
