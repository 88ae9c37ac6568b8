use sea_orm_migration::prelude::*;

use super::m20260105_000001_create_users::Usuarios;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Sessoes::Table)
          .if_not_exists()
          .col(ColumnDef::new(Sessoes::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Sessoes::UsuarioId).string().not_null())
          .col(ColumnDef::new(Sessoes::Token).string().not_null().unique_key())
          .col(ColumnDef::new(Sessoes::IpAddress).string().null())
          .col(ColumnDef::new(Sessoes::UserAgent).string().null())
          .col(ColumnDef::new(Sessoes::ExpiresAt).date_time().not_null())
          .col(ColumnDef::new(Sessoes::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_sessoes_usuario")
              .from(Sessoes::Table, Sessoes::UsuarioId)
              .to(Usuarios::Table, Usuarios::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_sessoes_expires_at")
          .table(Sessoes::Table)
          .col(Sessoes::ExpiresAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Sessoes::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Sessoes {
  Table,
  Id,
  UsuarioId,
  Token,
  IpAddress,
  UserAgent,
  ExpiresAt,
  CreatedAt,
}
