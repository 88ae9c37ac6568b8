use sea_orm_migration::prelude::*;

use super::m20260105_000005_create_orders::{PedidoItens, Pedidos};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Ingressos::Table)
          .if_not_exists()
          .col(ColumnDef::new(Ingressos::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Ingressos::Codigo).string().not_null().unique_key())
          .col(ColumnDef::new(Ingressos::PedidoId).string().not_null())
          .col(ColumnDef::new(Ingressos::PedidoItemId).string().not_null())
          .col(ColumnDef::new(Ingressos::UsuarioId).string().not_null())
          .col(ColumnDef::new(Ingressos::EventoId).string().not_null())
          .col(ColumnDef::new(Ingressos::LoteId).string().not_null())
          .col(ColumnDef::new(Ingressos::NomeTitular).string().not_null())
          .col(
            ColumnDef::new(Ingressos::Status)
              .string()
              .not_null()
              .default("ativo"),
          )
          .col(ColumnDef::new(Ingressos::QrCode).text().null())
          .col(ColumnDef::new(Ingressos::UtilizadoEm).date_time().null())
          .col(ColumnDef::new(Ingressos::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_ingressos_pedido")
              .from(Ingressos::Table, Ingressos::PedidoId)
              .to(Pedidos::Table, Pedidos::Id),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_ingressos_pedido_item")
              .from(Ingressos::Table, Ingressos::PedidoItemId)
              .to(PedidoItens::Table, PedidoItens::Id),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_ingressos_pedido")
          .table(Ingressos::Table)
          .col(Ingressos::PedidoId)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_ingressos_usuario")
          .table(Ingressos::Table)
          .col(Ingressos::UsuarioId)
          .to_owned(),
      )
      .await?;

    // one row per order that has had tickets claimed
    manager
      .create_table(
        Table::create()
          .table(Emissoes::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Emissoes::PedidoId).string().not_null().primary_key(),
          )
          .col(ColumnDef::new(Emissoes::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_emissoes_pedido")
              .from(Emissoes::Table, Emissoes::PedidoId)
              .to(Pedidos::Table, Pedidos::Id),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Emissoes::Table).to_owned()).await?;
    manager
      .drop_table(Table::drop().table(Ingressos::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Ingressos {
  Table,
  Id,
  Codigo,
  PedidoId,
  PedidoItemId,
  UsuarioId,
  EventoId,
  LoteId,
  NomeTitular,
  Status,
  QrCode,
  UtilizadoEm,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum Emissoes {
  Table,
  PedidoId,
  CreatedAt,
}
