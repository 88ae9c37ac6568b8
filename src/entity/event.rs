//! The single sellable event. `ativo` gates visibility, `vendas_abertas`
//! gates purchases.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "eventos")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: String,
  pub nome: String,
  #[sea_orm(unique)]
  pub slug: String,
  pub descricao: Option<String>,
  pub data_evento: DateTime,
  pub horario_inicio: Option<String>,
  pub horario_fim: Option<String>,
  pub local_nome: Option<String>,
  pub local_endereco: Option<String>,
  pub local_bairro: Option<String>,
  pub local_cidade: Option<String>,
  pub classificacao: String,
  pub imagem_url: Option<String>,
  pub ativo: bool,
  pub vendas_abertas: bool,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::lot::Entity")]
  Lots,
}

impl Related<super::lot::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Lots.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
