use std::{env, sync::Arc};

use migration::{Migrator, MigratorTrait};

use crate::{
  gateway::{self, PaymentGateway, asaas, mercado_pago},
  prelude::*,
  sv,
};

/// How an order total is derived from the lot price and quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pricing {
  Unit,
  /// Fixed totals (centavos) for specific quantities. Anything missing from
  /// the table is charged per unit.
  Bundle(Vec<(i32, i64)>),
}

impl Pricing {
  pub fn bundle() -> Self {
    Self::Bundle(vec![(1, 2000), (2, 3500), (4, 6000)])
  }

  pub fn total(&self, unit_price: i64, quantity: i32) -> i64 {
    if let Pricing::Bundle(table) = self
      && let Some(&(_, total)) = table.iter().find(|(q, _)| *q == quantity)
    {
      return total;
    }
    unit_price * quantity as i64
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  pub production: bool,
  pub gateway: gateway::Settings,
  pub pricing: Pricing,
  /// Overrides the gateway's own charge lifetime.
  pub order_expiration: Option<Duration>,
  pub session_cleanup_interval: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:naipe.db?mode=rwc"),
      port: 3000,
      production: false,
      gateway: gateway::Settings::Simulated,
      pricing: Pricing::Unit,
      order_expiration: None,
      session_cleanup_interval: Duration::from_secs(60 * 60),
    }
  }
}

fn var(key: &str) -> Option<String> {
  env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn flag(key: &str) -> bool {
  var(key).is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

fn cleanup_interval(raw: &str) -> anyhow::Result<Duration> {
  let interval = humantime::parse_duration(raw)
    .context("Invalid SESSION_CLEANUP_INTERVAL")?;
  anyhow::ensure!(!interval.is_zero(), "SESSION_CLEANUP_INTERVAL must be positive");
  Ok(interval)
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let default = Self::default();
    let strict_signatures = flag("WEBHOOK_STRICT_SIGNATURES");

    let gateway = match var("PAYMENT_GATEWAY").as_deref() {
      None | Some("mercado_pago") => {
        gateway::Settings::MercadoPago(mercado_pago::Settings {
          access_token: var("MERCADO_PAGO_ACCESS_TOKEN").unwrap_or_default(),
          webhook_secret: var("MERCADO_PAGO_WEBHOOK_SECRET"),
          strict_signatures,
        })
      }
      Some("asaas") => gateway::Settings::Asaas(asaas::Settings {
        api_key: var("ASAAS_API_KEY").unwrap_or_default(),
        environment: var("ASAAS_ENVIRONMENT")
          .unwrap_or_else(|| "production".into()),
        webhook_token: var("ASAAS_WEBHOOK_TOKEN"),
        strict_signatures,
      }),
      Some("simulado") => gateway::Settings::Simulated,
      Some(other) => anyhow::bail!("Unknown PAYMENT_GATEWAY `{other}`"),
    };

    let pricing = match var("PRICING").as_deref() {
      None | Some("unit") => Pricing::Unit,
      Some("bundle") => Pricing::bundle(),
      Some(other) => anyhow::bail!("Unknown PRICING `{other}`"),
    };

    let order_expiration = var("ORDER_EXPIRATION_MINUTES")
      .map(|minutes| minutes.parse::<u64>())
      .transpose()
      .context("ORDER_EXPIRATION_MINUTES must be a whole number")?
      .map(|minutes| Duration::from_secs(minutes * 60));

    let session_cleanup_interval = match var("SESSION_CLEANUP_INTERVAL") {
      Some(raw) => cleanup_interval(&raw)?,
      None => default.session_cleanup_interval,
    };

    Ok(Self {
      database_url: var("DATABASE_URL").unwrap_or(default.database_url),
      port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(default.port),
      production: var("APP_ENV").is_some_and(|env| env == "production"),
      gateway,
      pricing,
      order_expiration,
      session_cleanup_interval,
    })
  }

  pub fn secure_cookies(&self) -> bool {
    self.production
  }

  pub fn allow_simulated_payments(&self) -> bool {
    !self.production
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub session: sv::Session<'a>,
  pub catalog: sv::Catalog<'a>,
  pub order: sv::Order<'a>,
  pub payment: sv::Payment<'a>,
  pub ticket: sv::Ticket<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    let gateway = gateway::connect(&config.gateway)
      .context("Failed to configure payment gateway")?;
    info!("Payment gateway: {:?}", gateway.provider());

    Ok(Self::with_gateway(db, config, gateway))
  }

  pub fn with_gateway(
    db: DatabaseConnection,
    config: Config,
    gateway: Arc<dyn PaymentGateway>,
  ) -> Self {
    Self { db, config, gateway }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.db),
      session: sv::Session::new(&self.db),
      catalog: sv::Catalog::new(&self.db),
      order: sv::Order::new(&self.db, &self.config, self.gateway.as_ref()),
      payment: sv::Payment::new(&self.db),
      ticket: sv::Ticket::new(&self.db),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unit_pricing() {
    assert_eq!(Pricing::Unit.total(2000, 1), 2000);
    assert_eq!(Pricing::Unit.total(2000, 3), 6000);
  }

  #[test]
  fn test_bundle_pricing_falls_back_to_unit() {
    let pricing = Pricing::bundle();
    assert_eq!(pricing.total(2000, 1), 2000);
    assert_eq!(pricing.total(2000, 2), 3500);
    assert_eq!(pricing.total(2000, 4), 6000);
    assert_eq!(pricing.total(2000, 3), 6000);
  }

  #[test]
  fn test_cleanup_interval() {
    assert_eq!(cleanup_interval("30m").unwrap(), Duration::from_secs(30 * 60));
    assert!(cleanup_interval("0s").is_err());
    assert!(cleanup_interval("soon").is_err());
  }
}
