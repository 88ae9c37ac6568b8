use sea_orm_migration::prelude::*;

use super::m20260105_000005_create_orders::Pedidos;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Pagamentos::Table)
          .if_not_exists()
          .col(ColumnDef::new(Pagamentos::Id).string().not_null().primary_key())
          .col(
            ColumnDef::new(Pagamentos::PedidoId).string().not_null().unique_key(),
          )
          .col(ColumnDef::new(Pagamentos::Gateway).string().not_null())
          .col(ColumnDef::new(Pagamentos::GatewayChargeId).string().null())
          .col(
            ColumnDef::new(Pagamentos::Metodo)
              .string()
              .not_null()
              .default("pix"),
          )
          .col(
            ColumnDef::new(Pagamentos::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Pagamentos::Valor).big_integer().not_null())
          .col(ColumnDef::new(Pagamentos::PixQrCode).text().null())
          .col(ColumnDef::new(Pagamentos::PixQrCodeBase64).text().null())
          .col(ColumnDef::new(Pagamentos::PixExpiration).date_time().null())
          .col(ColumnDef::new(Pagamentos::PagoEm).date_time().null())
          .col(ColumnDef::new(Pagamentos::RawResponse).json().null())
          .col(ColumnDef::new(Pagamentos::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Pagamentos::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_pagamentos_pedido")
              .from(Pagamentos::Table, Pagamentos::PedidoId)
              .to(Pedidos::Table, Pedidos::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_pagamentos_gateway_charge")
          .table(Pagamentos::Table)
          .col(Pagamentos::GatewayChargeId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Pagamentos::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Pagamentos {
  Table,
  Id,
  PedidoId,
  Gateway,
  GatewayChargeId,
  Metodo,
  Status,
  Valor,
  PixQrCode,
  PixQrCodeBase64,
  PixExpiration,
  PagoEm,
  RawResponse,
  CreatedAt,
  UpdatedAt,
}
