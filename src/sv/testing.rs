//! Fixtures shared by service and router tests.

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use axum::http::HeaderMap;
use migration::{Migrator, MigratorTrait};
use uuid::Uuid;

use crate::{
  entity::{OrderStatus, PaymentStatus, Provider, event, lot, user},
  gateway::{
    self, ChargeRequest, Notification, PaymentGateway, PixCharge, StatusPair,
  },
  prelude::*,
  state::{AppState, Config},
};

pub async fn setup_db() -> DatabaseConnection {
  let db = Database::connect("sqlite::memory:").await.unwrap();
  Migrator::up(&db, None).await.unwrap();
  db
}

pub async fn seed_event(db: &DatabaseConnection) -> event::Model {
  let now = Utc::now().naive_utc();
  event::ActiveModel {
    id: Set(Uuid::new_v4().to_string()),
    nome: Set("Naipe VIP".into()),
    slug: Set(format!("naipe-vip-{}", Uuid::new_v4().simple())),
    descricao: Set(None),
    data_evento: Set(now + TimeDelta::days(30)),
    horario_inicio: Set(Some("22:00".into())),
    horario_fim: Set(Some("05:00".into())),
    local_nome: Set(Some("Casa Naipe".into())),
    local_endereco: Set(None),
    local_bairro: Set(Some("Centro".into())),
    local_cidade: Set(Some("Ribeirão Preto".into())),
    classificacao: Set("18+".into()),
    imagem_url: Set(None),
    ativo: Set(true),
    vendas_abertas: Set(true),
    created_at: Set(now),
    updated_at: Set(now),
  }
  .insert(db)
  .await
  .unwrap()
}

pub async fn seed_lot(
  db: &DatabaseConnection,
  evento_id: &str,
  preco: i64,
  total: i32,
  vendida: i32,
  limite: i32,
) -> lot::Model {
  let now = Utc::now().naive_utc();
  lot::ActiveModel {
    id: Set(Uuid::new_v4().to_string()),
    evento_id: Set(evento_id.to_string()),
    nome: Set("1º Lote".into()),
    descricao: Set(None),
    preco: Set(preco),
    quantidade_total: Set(total),
    quantidade_vendida: Set(vendida),
    limite_por_usuario: Set(limite),
    ordem: Set(1),
    ativo: Set(true),
    data_inicio_vendas: Set(None),
    data_fim_vendas: Set(None),
    created_at: Set(now),
    updated_at: Set(now),
  }
  .insert(db)
  .await
  .unwrap()
}

pub async fn seed_user(db: &DatabaseConnection, nome: &str) -> user::Model {
  let now = Utc::now().naive_utc();
  let id = Uuid::new_v4();
  let phone: String = id.as_u128().to_string().chars().take(11).collect();

  user::ActiveModel {
    id: Set(id.to_string()),
    nome: Set(nome.to_string()),
    email: Set(format!("{}@naipe.test", id.simple())),
    telefone: Set(phone),
    senha_hash: Set("not-a-hash".into()),
    email_verificado: Set(false),
    telefone_verificado: Set(false),
    ativo: Set(true),
    created_at: Set(now),
    updated_at: Set(now),
  }
  .insert(db)
  .await
  .unwrap()
}

/// Gateway double that records calls and can be told to refuse charges.
#[derive(Default)]
pub struct FakeGateway {
  pub refuse_with: Option<String>,
  /// Provider status reported for new charges, `pending` when unset.
  pub charge_status: Option<String>,
  pub charges: AtomicUsize,
}

impl FakeGateway {
  pub fn refusing(message: &str) -> Self {
    Self { refuse_with: Some(message.to_string()), ..Default::default() }
  }

  pub fn charges(&self) -> usize {
    self.charges.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  fn provider(&self) -> Provider {
    Provider::Simulated
  }

  fn expiration(&self) -> Duration {
    Duration::from_secs(15 * 60)
  }

  fn map_status(&self, status: &str, _detail: Option<&str>) -> StatusPair {
    gateway::simulated::map_status(status)
  }

  async fn create_pix_charge(
    &self,
    req: &ChargeRequest<'_>,
  ) -> Result<PixCharge, gateway::Error> {
    self.charges.fetch_add(1, Ordering::SeqCst);

    if let Some(message) = &self.refuse_with {
      return Err(gateway::Error::Provider(message.clone()));
    }

    Ok(PixCharge {
      charge_id: format!("fake_{}", req.external_reference),
      pix_payload: format!("00020126FAKE{}", req.external_reference),
      pix_image_base64: "iVBORw0KGgo=".into(),
      status: self
        .map_status(self.charge_status.as_deref().unwrap_or("pending"), None),
      raw: json::json!({ "amount": req.amount }),
    })
  }

  async fn notification(
    &self,
    _headers: &HeaderMap,
    body: &[u8],
  ) -> Result<Option<Notification>, gateway::Error> {
    gateway::Simulated.notification(&HeaderMap::new(), body).await
  }
}

pub fn notification(reference: &str, status: StatusPair) -> Notification {
  Notification {
    charge_id: format!("fake_{reference}"),
    external_reference: Some(reference.to_string()),
    status,
    raw: json::json!({ "test": true }),
  }
}

pub fn approved() -> StatusPair {
  StatusPair::new(PaymentStatus::Approved, OrderStatus::Paid)
}

pub fn app(db: DatabaseConnection, gateway: FakeGateway) -> Arc<AppState> {
  Arc::new(AppState::with_gateway(db, Config::default(), Arc::new(gateway)))
}
