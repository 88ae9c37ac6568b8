use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Usuarios::Table)
          .if_not_exists()
          .col(ColumnDef::new(Usuarios::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Usuarios::Nome).string().not_null())
          .col(ColumnDef::new(Usuarios::Email).string().not_null().unique_key())
          .col(
            ColumnDef::new(Usuarios::Telefone).string().not_null().unique_key(),
          )
          .col(ColumnDef::new(Usuarios::SenhaHash).string().not_null())
          .col(
            ColumnDef::new(Usuarios::EmailVerificado)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Usuarios::TelefoneVerificado)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(
            ColumnDef::new(Usuarios::Ativo).boolean().not_null().default(true),
          )
          .col(ColumnDef::new(Usuarios::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Usuarios::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Usuarios::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Usuarios {
  Table,
  Id,
  Nome,
  Email,
  Telefone,
  SenhaHash,
  EmailVerificado,
  TelefoneVerificado,
  Ativo,
  CreatedAt,
  UpdatedAt,
}
