//! Ticket issuance and ticket reads.
//!
//! Issuance runs once per paid order. A cheap existence check filters most
//! re-deliveries, the `emissoes` marker settles the concurrent ones.

use sea_orm::{DbErr, sea_query::Expr};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::{TicketStatus, event, issuance, lot, order, order_item, ticket, user},
  prelude::*,
  sv,
};

const CODE_ATTEMPTS: usize = 5;
const QR_SIZE: u32 = 300;
const FALLBACK_HOLDER: &str = "Participante";

pub fn qr_payload(codigo: &str, evento: &str) -> String {
  json::json!({
    "codigo": codigo,
    "evento": evento,
    "tipo": "ingresso_naipevip",
  })
  .to_string()
}

#[derive(Debug, Serialize)]
pub struct TicketEvent {
  pub nome: String,
  pub slug: String,
  pub data_evento: DateTime,
  pub horario_inicio: Option<String>,
  pub local_bairro: Option<String>,
}

impl From<event::Model> for TicketEvent {
  fn from(event: event::Model) -> Self {
    Self {
      nome: event.nome,
      slug: event.slug,
      data_evento: event.data_evento,
      horario_inicio: event.horario_inicio,
      local_bairro: event.local_bairro,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct TicketLot {
  pub nome: String,
  pub preco: i64,
}

#[derive(Debug, Serialize)]
pub struct TicketView {
  #[serde(flatten)]
  pub ingresso: ticket::Model,
  pub evento: Option<TicketEvent>,
  pub lote: Option<TicketLot>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub qr_code_image: Option<String>,
}

pub struct Ticket<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Ticket<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Issues one ticket per unit bought in `pedido_id`. Returns how many were
  /// written by this call, zero when another delivery got there first.
  ///
  /// The claim, the sold counters and the tickets commit together. A batch
  /// that writes no ticket rolls back, so the next delivery retries it.
  pub async fn issue(&self, pedido_id: &str) -> Result<usize> {
    let Some(order) = order::Entity::find_by_id(pedido_id).one(self.db).await?
    else {
      error!("Cannot issue tickets: order {pedido_id} not found");
      return Ok(0);
    };

    let existing = ticket::Entity::find()
      .filter(ticket::Column::PedidoId.eq(&order.id))
      .count(self.db)
      .await?;
    if existing > 0 {
      debug!("Order {} already has {existing} tickets", order.numero);
      return Ok(0);
    }

    let items = order.find_related(order_item::Entity).all(self.db).await?;
    let holder = order
      .find_related(user::Entity)
      .one(self.db)
      .await?
      .map(|user| user.nome)
      .filter(|nome| !nome.trim().is_empty())
      .unwrap_or_else(|| FALLBACK_HOLDER.to_string());

    let txn = self.db.begin().await?;
    if !claim(&txn, &order, &items).await? {
      debug!("Issuance for order {} already claimed", order.numero);
      return Ok(0);
    }

    let mut issued = 0;
    for item in &items {
      for _ in 0..item.quantidade {
        match issue_one(&txn, &order, item, &holder).await {
          Ok(ticket) => {
            debug!("Ticket {} issued for order {}", ticket.codigo, order.numero);
            issued += 1;
          }
          Err(err) => {
            error!("Failed to issue ticket for order {}: {err}", order.numero)
          }
        }
      }
    }

    let expected: i32 = items.iter().map(|item| item.quantidade).sum();
    if issued == 0 && expected > 0 {
      txn.rollback().await?;
      return Err(Error::Internal(format!(
        "no ticket could be issued for order {}",
        order.numero
      )));
    }

    txn.commit().await?;
    info!("Issued {issued} tickets for order {}", order.numero);
    Ok(issued)
  }

  /// The user's tickets, newest first.
  pub async fn list(&self, usuario_id: &str) -> Result<Vec<TicketView>> {
    let tickets = ticket::Entity::find()
      .filter(ticket::Column::UsuarioId.eq(usuario_id))
      .order_by_desc(ticket::Column::CreatedAt)
      .all(self.db)
      .await?;

    let mut views = Vec::with_capacity(tickets.len());
    for ticket in tickets {
      views.push(self.view(ticket, false).await?);
    }
    Ok(views)
  }

  /// One ticket of the user by its code, with a freshly rendered QR image.
  pub async fn by_code(
    &self,
    usuario_id: &str,
    codigo: &str,
  ) -> Result<TicketView> {
    let ticket = ticket::Entity::find()
      .filter(ticket::Column::Codigo.eq(codigo))
      .filter(ticket::Column::UsuarioId.eq(usuario_id))
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("Ingresso não encontrado"))?;

    self.view(ticket, true).await
  }

  async fn view(&self, ticket: ticket::Model, with_qr: bool) -> Result<TicketView> {
    let evento = ticket.find_related(event::Entity).one(self.db).await?;
    let lote = ticket
      .find_related(lot::Entity)
      .one(self.db)
      .await?
      .map(|lot| TicketLot { nome: lot.nome, preco: lot.preco });

    let qr_code_image = if with_qr {
      let payload = qr_payload(&ticket.codigo, &ticket.evento_id);
      Some(utils::qr_data_url(&payload, QR_SIZE)?)
    } else {
      None
    };

    Ok(TicketView {
      ingresso: ticket,
      evento: evento.map(Into::into),
      lote,
      qr_code_image,
    })
  }
}

/// Writes the issuance marker and moves the sold counters. `false` when the
/// marker already exists.
async fn claim<C: ConnectionTrait>(
  conn: &C,
  order: &order::Model,
  items: &[order_item::Model],
) -> Result<bool> {
  let now = Utc::now().naive_utc();

  let marker = issuance::ActiveModel {
    pedido_id: Set(order.id.clone()),
    created_at: Set(now),
  };
  match marker.insert(conn).await {
    Ok(_) => {}
    Err(err) if sv::is_unique_violation(&err) => return Ok(false),
    Err(err) => return Err(err.into()),
  }

  for item in items {
    let q = item.quantidade;
    let bumped = lot::Entity::update_many()
      .col_expr(
        lot::Column::QuantidadeVendida,
        Expr::col(lot::Column::QuantidadeVendida).add(q),
      )
      .col_expr(lot::Column::UpdatedAt, Expr::value(now))
      .filter(lot::Column::Id.eq(&item.lote_id))
      .filter(
        Expr::col(lot::Column::QuantidadeVendida)
          .lte(Expr::col(lot::Column::QuantidadeTotal).sub(q)),
      )
      .exec(conn)
      .await?;

    if bumped.rows_affected == 0 {
      error!(
        "Oversell on lot {}: order {} paid for {q} beyond capacity",
        item.lote_id, order.numero
      );
    }
  }

  Ok(true)
}

async fn issue_one<C: ConnectionTrait>(
  conn: &C,
  order: &order::Model,
  item: &order_item::Model,
  holder: &str,
) -> Result<ticket::Model> {
  let mut last = None;

  for _ in 0..CODE_ATTEMPTS {
    let codigo = utils::ticket_code();
    let qr_code =
      utils::qr_data_url(&qr_payload(&codigo, &order.evento_id), QR_SIZE)?;

    let ticket = ticket::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      codigo: Set(codigo),
      pedido_id: Set(order.id.clone()),
      pedido_item_id: Set(item.id.clone()),
      usuario_id: Set(order.usuario_id.clone()),
      evento_id: Set(order.evento_id.clone()),
      lote_id: Set(item.lote_id.clone()),
      nome_titular: Set(holder.to_string()),
      status: Set(TicketStatus::Active),
      qr_code: Set(Some(qr_code)),
      utilizado_em: Set(None),
      created_at: Set(Utc::now().naive_utc()),
    };

    match ticket.insert(conn).await {
      Ok(ticket) => return Ok(ticket),
      Err(err) if sv::is_unique_violation(&err) => {
        warn!("Ticket code collision, retrying");
        last = Some(err);
      }
      Err(err) => return Err(err.into()),
    }
  }

  Err(
    last
      .unwrap_or_else(|| DbErr::Custom("no ticket code attempts".into()))
      .into(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::OrderStatus,
    state::Config,
    sv::{
      order::Purchase,
      testing::{FakeGateway, seed_event, seed_lot, seed_user, setup_db},
    },
  };

  async fn paid_order(
    db: &DatabaseConnection,
    lot: &lot::Model,
    buyer: &user::Model,
    quantidade: i32,
  ) -> String {
    let gateway = FakeGateway::default();
    let config = Config::default();
    let checkout = sv::Order::new(db, &config, &gateway)
      .create(buyer, Purchase { lot_id: &lot.id, quantidade, cpf: None })
      .await
      .unwrap();

    let mut active: order::ActiveModel =
      order::Entity::find_by_id(&checkout.pedido.id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .into();
    active.status = Set(OrderStatus::Paid);
    active.update(db).await.unwrap();

    checkout.pedido.id
  }

  async fn sold(db: &DatabaseConnection, lot: &lot::Model) -> i32 {
    lot::Entity::find_by_id(&lot.id)
      .one(db)
      .await
      .unwrap()
      .unwrap()
      .quantidade_vendida
  }

  #[test]
  fn test_qr_payload() {
    let payload: json::Value =
      json::from_str(&qr_payload("AB12CD34", "evt-1")).unwrap();
    assert_eq!(payload["codigo"], "AB12CD34");
    assert_eq!(payload["evento"], "evt-1");
    assert_eq!(payload["tipo"], "ingresso_naipevip");
  }

  #[tokio::test]
  async fn test_issue_once() {
    let db = setup_db().await;
    let event = seed_event(&db).await;
    let lot = seed_lot(&db, &event.id, 2000, 100, 0, 4).await;
    let buyer = seed_user(&db, "Ana").await;
    let pedido_id = paid_order(&db, &lot, &buyer, 3).await;
    let sv = Ticket::new(&db);

    assert_eq!(sv.issue(&pedido_id).await.unwrap(), 3);
    assert_eq!(sv.issue(&pedido_id).await.unwrap(), 0);

    let tickets = ticket::Entity::find()
      .filter(ticket::Column::PedidoId.eq(&pedido_id))
      .all(&db)
      .await
      .unwrap();
    assert_eq!(tickets.len(), 3);
    assert_eq!(sold(&db, &lot).await, 3);

    for ticket in &tickets {
      assert_eq!(ticket.codigo.len(), 8);
      assert!(ticket.codigo.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
      assert_eq!(ticket.status, TicketStatus::Active);
      assert_eq!(ticket.nome_titular, "Ana");
      assert!(ticket.qr_code.as_ref().unwrap().starts_with("data:image/png;base64,"));
    }
  }

  #[tokio::test]
  async fn test_claim_marker_blocks_second_writer() {
    let db = setup_db().await;
    let event = seed_event(&db).await;
    let lot = seed_lot(&db, &event.id, 2000, 100, 0, 4).await;
    let buyer = seed_user(&db, "Ana").await;
    let pedido_id = paid_order(&db, &lot, &buyer, 2).await;

    // a concurrent delivery that claimed but has not written tickets yet
    issuance::ActiveModel {
      pedido_id: Set(pedido_id.clone()),
      created_at: Set(Utc::now().naive_utc()),
    }
    .insert(&db)
    .await
    .unwrap();

    assert_eq!(Ticket::new(&db).issue(&pedido_id).await.unwrap(), 0);
    assert_eq!(sold(&db, &lot).await, 0);
  }

  #[tokio::test]
  async fn test_failed_batch_releases_claim() {
    let db = setup_db().await;
    let event = seed_event(&db).await;
    let lot = seed_lot(&db, &event.id, 2000, 100, 0, 4).await;
    let buyer = seed_user(&db, "Ana").await;
    let pedido_id = paid_order(&db, &lot, &buyer, 2).await;
    let sv = Ticket::new(&db);

    db.execute_unprepared(
      "CREATE TRIGGER ingressos_offline BEFORE INSERT ON ingressos \
       BEGIN SELECT RAISE(ABORT, 'ingressos offline'); END",
    )
    .await
    .unwrap();

    assert!(sv.issue(&pedido_id).await.is_err());
    let marker = issuance::Entity::find_by_id(&pedido_id).one(&db).await.unwrap();
    assert!(marker.is_none());
    assert_eq!(sold(&db, &lot).await, 0);

    db.execute_unprepared("DROP TRIGGER ingressos_offline").await.unwrap();

    assert_eq!(sv.issue(&pedido_id).await.unwrap(), 2);
    assert_eq!(sold(&db, &lot).await, 2);
    assert_eq!(sv.issue(&pedido_id).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_oversell_is_logged_not_blocking() {
    let db = setup_db().await;
    let event = seed_event(&db).await;
    let lot = seed_lot(&db, &event.id, 2000, 10, 8, 4).await;
    let buyer = seed_user(&db, "Ana").await;
    let pedido_id = paid_order(&db, &lot, &buyer, 2).await;

    let mut full: lot::ActiveModel = lot.clone().into();
    full.quantidade_vendida = Set(9);
    full.update(&db).await.unwrap();

    assert_eq!(Ticket::new(&db).issue(&pedido_id).await.unwrap(), 2);
    assert_eq!(sold(&db, &lot).await, 9);
  }

  #[tokio::test]
  async fn test_missing_order_is_noop() {
    let db = setup_db().await;
    assert_eq!(Ticket::new(&db).issue("missing").await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_reads_are_owner_only() {
    let db = setup_db().await;
    let event = seed_event(&db).await;
    let lot = seed_lot(&db, &event.id, 2000, 100, 0, 4).await;
    let ana = seed_user(&db, "Ana").await;
    let bia = seed_user(&db, "Bia").await;
    let pedido_id = paid_order(&db, &lot, &ana, 2).await;
    let sv = Ticket::new(&db);
    sv.issue(&pedido_id).await.unwrap();

    let tickets = sv.list(&ana.id).await.unwrap();
    assert_eq!(tickets.len(), 2);
    assert!(tickets.iter().all(|t| t.qr_code_image.is_none()));
    assert_eq!(tickets[0].evento.as_ref().unwrap().nome, event.nome);
    assert_eq!(tickets[0].lote.as_ref().unwrap().preco, 2000);
    assert!(sv.list(&bia.id).await.unwrap().is_empty());

    let codigo = tickets[0].ingresso.codigo.clone();
    let view = sv.by_code(&ana.id, &codigo).await.unwrap();
    assert!(view.qr_code_image.unwrap().starts_with("data:image/png;base64,"));

    let err = sv.by_code(&bia.id, &codigo).await.unwrap_err();
    assert_eq!(err.to_string(), "Ingresso não encontrado");
  }
}
