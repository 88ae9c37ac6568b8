use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Eventos::Table)
          .if_not_exists()
          .col(ColumnDef::new(Eventos::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Eventos::Nome).string().not_null())
          .col(ColumnDef::new(Eventos::Slug).string().not_null().unique_key())
          .col(ColumnDef::new(Eventos::Descricao).text().null())
          .col(ColumnDef::new(Eventos::DataEvento).date_time().not_null())
          .col(ColumnDef::new(Eventos::HorarioInicio).string().null())
          .col(ColumnDef::new(Eventos::HorarioFim).string().null())
          .col(ColumnDef::new(Eventos::LocalNome).string().null())
          .col(ColumnDef::new(Eventos::LocalEndereco).string().null())
          .col(ColumnDef::new(Eventos::LocalBairro).string().null())
          .col(ColumnDef::new(Eventos::LocalCidade).string().null())
          .col(
            ColumnDef::new(Eventos::Classificacao)
              .string()
              .not_null()
              .default("18+"),
          )
          .col(ColumnDef::new(Eventos::ImagemUrl).string().null())
          .col(ColumnDef::new(Eventos::Ativo).boolean().not_null().default(true))
          .col(
            ColumnDef::new(Eventos::VendasAbertas)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Eventos::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Eventos::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Eventos::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Eventos {
  Table,
  Id,
  Nome,
  Slug,
  Descricao,
  DataEvento,
  HorarioInicio,
  HorarioFim,
  LocalNome,
  LocalEndereco,
  LocalBairro,
  LocalCidade,
  Classificacao,
  ImagemUrl,
  Ativo,
  VendasAbertas,
  CreatedAt,
  UpdatedAt,
}
