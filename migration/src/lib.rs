pub use sea_orm_migration::prelude::*;

mod m20260105_000001_create_users;
mod m20260105_000002_create_sessions;
mod m20260105_000003_create_events;
mod m20260105_000004_create_lots;
mod m20260105_000005_create_orders;
mod m20260105_000006_create_payments;
mod m20260112_000007_create_tickets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260105_000001_create_users::Migration),
      Box::new(m20260105_000002_create_sessions::Migration),
      Box::new(m20260105_000003_create_events::Migration),
      Box::new(m20260105_000004_create_lots::Migration),
      Box::new(m20260105_000005_create_orders::Migration),
      Box::new(m20260105_000006_create_payments::Migration),
      Box::new(m20260112_000007_create_tickets::Migration),
    ]
  }
}
