use sea_orm_migration::prelude::*;

use super::m20260105_000003_create_events::Eventos;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Lotes::Table)
          .if_not_exists()
          .col(ColumnDef::new(Lotes::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Lotes::EventoId).string().not_null())
          .col(ColumnDef::new(Lotes::Nome).string().not_null())
          .col(ColumnDef::new(Lotes::Descricao).text().null())
          // centavos
          .col(ColumnDef::new(Lotes::Preco).big_integer().not_null())
          .col(ColumnDef::new(Lotes::QuantidadeTotal).integer().not_null())
          .col(
            ColumnDef::new(Lotes::QuantidadeVendida)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(Lotes::LimitePorUsuario)
              .integer()
              .not_null()
              .default(4),
          )
          .col(ColumnDef::new(Lotes::Ordem).integer().not_null().default(0))
          .col(ColumnDef::new(Lotes::Ativo).boolean().not_null().default(true))
          .col(ColumnDef::new(Lotes::DataInicioVendas).date_time().null())
          .col(ColumnDef::new(Lotes::DataFimVendas).date_time().null())
          .col(ColumnDef::new(Lotes::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Lotes::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_lotes_evento")
              .from(Lotes::Table, Lotes::EventoId)
              .to(Eventos::Table, Eventos::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_lotes_evento")
          .table(Lotes::Table)
          .col(Lotes::EventoId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Lotes::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Lotes {
  Table,
  Id,
  EventoId,
  Nome,
  Descricao,
  Preco,
  QuantidadeTotal,
  QuantidadeVendida,
  LimitePorUsuario,
  Ordem,
  Ativo,
  DataInicioVendas,
  DataFimVendas,
  CreatedAt,
  UpdatedAt,
}
