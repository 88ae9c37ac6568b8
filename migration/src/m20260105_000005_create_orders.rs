use sea_orm_migration::prelude::*;

use super::{
  m20260105_000001_create_users::Usuarios,
  m20260105_000003_create_events::Eventos, m20260105_000004_create_lots::Lotes,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Pedidos::Table)
          .if_not_exists()
          .col(ColumnDef::new(Pedidos::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Pedidos::Numero).string().not_null().unique_key())
          .col(ColumnDef::new(Pedidos::UsuarioId).string().not_null())
          .col(ColumnDef::new(Pedidos::EventoId).string().not_null())
          .col(
            ColumnDef::new(Pedidos::Status)
              .string()
              .not_null()
              .default("pendente"),
          )
          .col(ColumnDef::new(Pedidos::QuantidadeTotal).integer().not_null())
          .col(ColumnDef::new(Pedidos::ValorTotal).big_integer().not_null())
          .col(ColumnDef::new(Pedidos::ExpiresAt).date_time().null())
          .col(ColumnDef::new(Pedidos::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Pedidos::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_pedidos_usuario")
              .from(Pedidos::Table, Pedidos::UsuarioId)
              .to(Usuarios::Table, Usuarios::Id),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_pedidos_evento")
              .from(Pedidos::Table, Pedidos::EventoId)
              .to(Eventos::Table, Eventos::Id),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_pedidos_usuario")
          .table(Pedidos::Table)
          .col(Pedidos::UsuarioId)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(PedidoItens::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(PedidoItens::Id).string().not_null().primary_key(),
          )
          .col(ColumnDef::new(PedidoItens::PedidoId).string().not_null())
          .col(ColumnDef::new(PedidoItens::LoteId).string().not_null())
          .col(ColumnDef::new(PedidoItens::Quantidade).integer().not_null())
          .col(
            ColumnDef::new(PedidoItens::PrecoUnitario).big_integer().not_null(),
          )
          .col(ColumnDef::new(PedidoItens::Subtotal).big_integer().not_null())
          .col(ColumnDef::new(PedidoItens::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_pedido_itens_pedido")
              .from(PedidoItens::Table, PedidoItens::PedidoId)
              .to(Pedidos::Table, Pedidos::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_pedido_itens_lote")
              .from(PedidoItens::Table, PedidoItens::LoteId)
              .to(Lotes::Table, Lotes::Id),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_pedido_itens_lote")
          .table(PedidoItens::Table)
          .col(PedidoItens::LoteId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(PedidoItens::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Pedidos::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Pedidos {
  Table,
  Id,
  Numero,
  UsuarioId,
  EventoId,
  Status,
  QuantidadeTotal,
  ValorTotal,
  ExpiresAt,
  CreatedAt,
  UpdatedAt,
}

#[derive(DeriveIden)]
pub enum PedidoItens {
  Table,
  Id,
  PedidoId,
  LoteId,
  Quantidade,
  PrecoUnitario,
  Subtotal,
  CreatedAt,
}
