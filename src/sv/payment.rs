//! Applies gateway notifications to payments and orders.

use crate::{
  entity::{OrderStatus, PaymentStatus, order, payment},
  gateway::{Notification, StatusPair},
  prelude::*,
  sv,
};

/// What a notification did. Every variant is acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Carried no reference to one of our orders.
  Ignored,
  /// Referenced an order we do not know.
  Unmatched,
  /// Would move the order or payment backwards.
  Stale { pedido_id: String, current: OrderStatus },
  Applied { pedido_id: String, status: StatusPair, tickets: usize },
}

pub struct Payment<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Payment<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  async fn find(
    &self,
    pedido_id: &str,
    charge_id: &str,
  ) -> Result<Option<payment::Model>> {
    let by_order = payment::Entity::find()
      .filter(payment::Column::PedidoId.eq(pedido_id))
      .one(self.db)
      .await?;
    if by_order.is_some() || charge_id.is_empty() {
      return Ok(by_order);
    }

    let by_charge = payment::Entity::find()
      .filter(payment::Column::GatewayChargeId.eq(charge_id))
      .one(self.db)
      .await?;
    Ok(by_charge)
  }

  pub async fn apply_notification(&self, note: &Notification) -> Result<Outcome> {
    let Some(reference) = note.external_reference.as_deref() else {
      debug!("Notification for charge {} has no reference", note.charge_id);
      return Ok(Outcome::Ignored);
    };

    let payment = self.find(reference, &note.charge_id).await?;
    let pedido_id = payment.as_ref().map_or(reference, |p| p.pedido_id.as_str());

    let Some(order) = order::Entity::find_by_id(pedido_id).one(self.db).await?
    else {
      warn!("Notification for unknown order {pedido_id}");
      return Ok(Outcome::Unmatched);
    };

    let next = note.status;
    let allowed = order.status.can_become(next.order)
      && payment.as_ref().is_none_or(|p| p.status.can_become(next.payment));
    if !allowed {
      warn!(
        "Ignoring stale notification for order {}: {:?}/{:?} -> {:?}/{:?}",
        order.numero,
        order.status,
        payment.as_ref().map(|p| p.status),
        next.order,
        next.payment,
      );
      return Ok(Outcome::Stale { pedido_id: order.id, current: order.status });
    }

    let now = Utc::now().naive_utc();
    let txn = self.db.begin().await?;

    if let Some(payment) = payment {
      let newly_paid =
        next.payment == PaymentStatus::Approved && payment.pago_em.is_none();
      let missing_charge = payment.gateway_charge_id.is_none();

      let mut active: payment::ActiveModel = payment.into();
      active.status = Set(next.payment);
      active.raw_response = Set(Some(note.raw.clone()));
      if missing_charge && !note.charge_id.is_empty() {
        active.gateway_charge_id = Set(Some(note.charge_id.clone()));
      }
      if newly_paid {
        active.pago_em = Set(Some(now));
      }
      active.updated_at = Set(now);
      active.update(&txn).await?;
    } else {
      warn!("Order {} has no payment row, updating order only", order.numero);
    }

    let pedido_id = order.id.clone();
    let numero = order.numero.clone();
    let mut active: order::ActiveModel = order.into();
    active.status = Set(next.order);
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;
    info!("Order {numero} is now {:?} ({:?})", next.order, next.payment);

    let mut tickets = 0;
    if next.payment == PaymentStatus::Approved {
      tickets = match sv::Ticket::new(self.db).issue(&pedido_id).await {
        Ok(issued) => issued,
        Err(err) => {
          error!("Ticket issuance for order {numero} failed: {err}");
          0
        }
      };
    }

    Ok(Outcome::Applied { pedido_id, status: next, tickets })
  }

  /// Approves a pending order as if the gateway had confirmed it.
  pub async fn simulate(
    &self,
    usuario_id: &str,
    pedido_id: &str,
  ) -> Result<order::Model> {
    let order = order::Entity::find_by_id(pedido_id)
      .filter(order::Column::UsuarioId.eq(usuario_id))
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("Pedido não encontrado"))?;

    if order.status != OrderStatus::Pending {
      return Err(Error::validation("Pedido não está pendente"));
    }

    let charge_id = order
      .find_related(payment::Entity)
      .one(self.db)
      .await?
      .and_then(|payment| payment.gateway_charge_id)
      .unwrap_or_default();

    let note = Notification {
      charge_id,
      external_reference: Some(order.id.clone()),
      status: StatusPair::new(PaymentStatus::Approved, OrderStatus::Paid),
      raw: json::json!({ "simulado": true }),
    };

    match self.apply_notification(&note).await? {
      Outcome::Applied { .. } => {}
      other => {
        return Err(Error::Internal(format!("simulated payment: {other:?}")));
      }
    }

    info!("Payment simulated for order {}", order.numero);
    order::Entity::find_by_id(&order.id)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("Pedido não encontrado"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{lot, ticket},
    state::Config,
    sv::{
      order::Purchase,
      testing::{
        FakeGateway, approved, notification, seed_event, seed_lot, seed_user,
        setup_db,
      },
    },
  };

  struct Fixture {
    db: DatabaseConnection,
    lot: lot::Model,
    usuario_id: String,
    pedido_id: String,
  }

  async fn fixture(quantidade: i32) -> Fixture {
    let db = setup_db().await;
    let event = seed_event(&db).await;
    let lot = seed_lot(&db, &event.id, 2000, 100, 0, 4).await;
    let buyer = seed_user(&db, "Ana").await;

    let gateway = FakeGateway::default();
    let config = Config::default();
    let checkout = sv::Order::new(&db, &config, &gateway)
      .create(&buyer, Purchase { lot_id: &lot.id, quantidade, cpf: None })
      .await
      .unwrap();

    Fixture { db, lot, usuario_id: buyer.id, pedido_id: checkout.pedido.id }
  }

  async fn state(f: &Fixture) -> (order::Model, payment::Model, u64) {
    let order = order::Entity::find_by_id(&f.pedido_id)
      .one(&f.db)
      .await
      .unwrap()
      .unwrap();
    let payment = payment::Entity::find()
      .filter(payment::Column::PedidoId.eq(&f.pedido_id))
      .one(&f.db)
      .await
      .unwrap()
      .unwrap();
    let tickets = ticket::Entity::find()
      .filter(ticket::Column::PedidoId.eq(&f.pedido_id))
      .count(&f.db)
      .await
      .unwrap();
    (order, payment, tickets)
  }

  #[tokio::test]
  async fn test_approval_issues_tickets() {
    let f = fixture(3).await;

    let outcome = Payment::new(&f.db)
      .apply_notification(&notification(&f.pedido_id, approved()))
      .await
      .unwrap();
    assert_eq!(
      outcome,
      Outcome::Applied {
        pedido_id: f.pedido_id.clone(),
        status: approved(),
        tickets: 3
      }
    );

    let (order, payment, tickets) = state(&f).await;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(payment.status, PaymentStatus::Approved);
    assert!(payment.pago_em.is_some());
    assert_eq!(payment.raw_response, Some(json::json!({ "test": true })));
    assert_eq!(tickets, 3);

    let lot = lot::Entity::find_by_id(&f.lot.id)
      .one(&f.db)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(lot.quantidade_vendida, 3);
  }

  #[tokio::test]
  async fn test_redelivery_is_idempotent() {
    let f = fixture(2).await;
    let sv = Payment::new(&f.db);
    let note = notification(&f.pedido_id, approved());

    sv.apply_notification(&note).await.unwrap();
    let (_, first, _) = state(&f).await;

    let outcome = sv.apply_notification(&note).await.unwrap();
    assert!(matches!(outcome, Outcome::Applied { tickets: 0, .. }));

    let (order, payment, tickets) = state(&f).await;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(payment.pago_em, first.pago_em);
    assert_eq!(tickets, 2);
  }

  #[tokio::test]
  async fn test_stale_notification_is_ignored() {
    let f = fixture(1).await;
    let sv = Payment::new(&f.db);
    sv.apply_notification(&notification(&f.pedido_id, approved()))
      .await
      .unwrap();

    let pending = StatusPair::PENDING;
    let outcome =
      sv.apply_notification(&notification(&f.pedido_id, pending)).await.unwrap();
    assert_eq!(
      outcome,
      Outcome::Stale { pedido_id: f.pedido_id.clone(), current: OrderStatus::Paid }
    );

    let (order, payment, _) = state(&f).await;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(payment.status, PaymentStatus::Approved);
  }

  #[tokio::test]
  async fn test_late_approval_of_expired_order() {
    let f = fixture(1).await;
    let sv = Payment::new(&f.db);

    let expired = StatusPair::new(PaymentStatus::Cancelled, OrderStatus::Expired);
    sv.apply_notification(&notification(&f.pedido_id, expired)).await.unwrap();

    let outcome = sv
      .apply_notification(&notification(&f.pedido_id, approved()))
      .await
      .unwrap();
    assert!(matches!(outcome, Outcome::Applied { tickets: 1, .. }));
  }

  #[tokio::test]
  async fn test_correlates_by_charge_id() {
    let f = fixture(1).await;
    let mut note = notification(&f.pedido_id, approved());
    note.external_reference = Some("some-other-reference".into());

    let outcome = Payment::new(&f.db).apply_notification(&note).await.unwrap();
    assert!(
      matches!(outcome, Outcome::Applied { ref pedido_id, .. } if *pedido_id == f.pedido_id)
    );
  }

  #[tokio::test]
  async fn test_unknown_and_unreferenced() {
    let db = setup_db().await;
    let sv = Payment::new(&db);

    let outcome =
      sv.apply_notification(&notification("missing", approved())).await.unwrap();
    assert_eq!(outcome, Outcome::Unmatched);

    let mut note = notification("missing", approved());
    note.external_reference = None;
    assert_eq!(sv.apply_notification(&note).await.unwrap(), Outcome::Ignored);
  }

  #[tokio::test]
  async fn test_simulate() {
    let f = fixture(2).await;
    let sv = Payment::new(&f.db);

    let err = sv.simulate("someone-else", &f.pedido_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let order = sv.simulate(&f.usuario_id, &f.pedido_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let (_, payment, tickets) = state(&f).await;
    assert_eq!(payment.raw_response, Some(json::json!({ "simulado": true })));
    assert_eq!(tickets, 2);

    let err = sv.simulate(&f.usuario_id, &f.pedido_id).await.unwrap_err();
    assert_eq!(err.to_string(), "Pedido não está pendente");
  }
}
