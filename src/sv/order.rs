//! Checkout and order reads.
//!
//! An order and its single line item are written together in one
//! transaction. Only the gateway step can fail after that, in which case the
//! order is discarded again.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::{
    OrderStatus, PaymentStatus, TicketStatus, event, lot, order, order_item,
    payment, ticket, user,
  },
  gateway::{ChargeRequest, Payer, PaymentGateway},
  prelude::*,
  state::Config,
  sv,
};

pub const MAX_QUANTITY: i32 = 10;

#[derive(Debug, Clone)]
pub struct Purchase<'a> {
  pub lot_id: &'a str,
  pub quantidade: i32,
  pub cpf: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct LotSummary {
  pub id: String,
  pub nome: String,
  pub preco: i64,
}

impl From<lot::Model> for LotSummary {
  fn from(lot: lot::Model) -> Self {
    Self { id: lot.id, nome: lot.nome, preco: lot.preco }
  }
}

#[derive(Debug, Serialize)]
pub struct EventSummary {
  pub nome: String,
  pub data: DateTime,
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
  pub id: String,
  pub numero: String,
  pub quantidade: i32,
  pub valor_total: i64,
  pub expires_at: DateTime,
  pub lote: LotSummary,
  pub evento: EventSummary,
}

#[derive(Debug, Serialize)]
pub struct Pix {
  pub qr_code: String,
  pub qr_code_base64: String,
  pub copia_cola: String,
  pub expiration: DateTime,
}

#[derive(Debug, Serialize)]
pub struct Checkout {
  pub pedido: PlacedOrder,
  pub pix: Pix,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
  pub id: String,
  pub numero: String,
  pub status: OrderStatus,
  pub quantidade_total: i32,
  pub valor_total: i64,
  pub expires_at: Option<DateTime>,
  pub created_at: DateTime,
  pub expirado: bool,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
  pub id: String,
  pub quantidade: i32,
  pub preco_unitario: i64,
  pub subtotal: i64,
  pub lote: Option<LotSummary>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetails {
  pub pedido: OrderView,
  pub evento: Option<event::Model>,
  pub itens: Vec<ItemView>,
  pub pagamento: Option<payment::Model>,
}

#[derive(Debug, Serialize)]
pub struct ListedEvent {
  pub nome: String,
  pub slug: String,
  pub data_evento: DateTime,
}

#[derive(Debug, Serialize)]
pub struct ListedPayment {
  pub status: PaymentStatus,
  pub metodo: String,
  pub pago_em: Option<DateTime>,
}

#[derive(Debug, Serialize)]
pub struct ListedOrder {
  #[serde(flatten)]
  pub pedido: order::Model,
  pub evento: Option<ListedEvent>,
  pub pagamento: Option<ListedPayment>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub total_pedidos: u64,
  pub total_ingressos: u64,
  pub tem_ingresso_ativo: bool,
}

pub struct Order<'a> {
  db: &'a DatabaseConnection,
  config: &'a Config,
  gateway: &'a dyn PaymentGateway,
}

impl<'a> Order<'a> {
  pub fn new(
    db: &'a DatabaseConnection,
    config: &'a Config,
    gateway: &'a dyn PaymentGateway,
  ) -> Self {
    Self { db, config, gateway }
  }

  pub fn expiration(&self) -> Duration {
    self.config.order_expiration.unwrap_or_else(|| self.gateway.expiration())
  }

  /// Quantity of `lot_id` the user holds in paid or still-payable orders.
  pub async fn already_reserved(
    &self,
    usuario_id: &str,
    lot_id: &str,
  ) -> Result<i32> {
    let items = order_item::Entity::find()
      .inner_join(order::Entity)
      .filter(order_item::Column::LoteId.eq(lot_id))
      .filter(order::Column::UsuarioId.eq(usuario_id))
      .filter(order::Column::Status.is_in(OrderStatus::RESERVING))
      .all(self.db)
      .await?;

    Ok(items.iter().map(|item| item.quantidade).sum())
  }

  pub async fn create(
    &self,
    buyer: &user::Model,
    purchase: Purchase<'_>,
  ) -> Result<Checkout> {
    let quantidade = purchase.quantidade;
    if !(1..=MAX_QUANTITY).contains(&quantidade) {
      return Err(Error::validation("Quantidade inválida"));
    }

    let Some((lot, event)) = sv::Catalog::new(self.db)
      .lot(purchase.lot_id)
      .await?
    else {
      return Err(Error::not_found("Lote não encontrado"));
    };

    let now = Utc::now().naive_utc();
    if !event.ativo || !event.vendas_abertas || !lot.in_sales_window(now) {
      return Err(Error::validation("Vendas encerradas para este lote"));
    }

    let available = lot.available();
    if available < quantidade {
      return Err(Error::validation(format!(
        "Apenas {available} ingressos disponíveis"
      )));
    }

    let limit = lot.limite_por_usuario;
    if quantidade > limit {
      return Err(Error::validation(format!(
        "Limite de {limit} ingressos por pessoa"
      )));
    }

    let already = self.already_reserved(&buyer.id, &lot.id).await?;
    if already + quantidade > limit {
      let remaining = limit - already;
      return Err(Error::validation(if remaining > 0 {
        format!(
          "Você já possui {already} ingresso(s). Pode comprar mais {remaining}."
        )
      } else {
        format!("Você já atingiu o limite de {limit} ingressos.")
      }));
    }

    let valor_total = self.config.pricing.total(lot.preco, quantidade);
    let expiration = self.expiration();
    let expires_at = now
      + TimeDelta::from_std(expiration)
        .map_err(|e| Error::Internal(e.to_string()))?;

    let order = self
      .insert_pending(buyer, &lot, quantidade, valor_total, expires_at)
      .await?;

    let description = format!("{} - {} ({quantidade}x)", event.nome, lot.nome);
    let request = ChargeRequest {
      payer: Payer {
        nome: &buyer.nome,
        email: &buyer.email,
        telefone: Some(buyer.telefone.as_str()),
        cpf: purchase.cpf,
      },
      amount: valor_total,
      description: &description,
      external_reference: &order.id,
      expiration,
    };

    let charge = match self.gateway.create_pix_charge(&request).await {
      Ok(charge) => charge,
      Err(err) => {
        warn!("Charge for order {} failed: {err}", order.numero);
        self.discard(&order.id).await;
        return Err(err.into());
      }
    };

    let payment = payment::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      pedido_id: Set(order.id.clone()),
      gateway: Set(self.gateway.provider()),
      gateway_charge_id: Set(Some(charge.charge_id.clone())),
      metodo: Set("pix".into()),
      status: Set(charge.status.payment),
      valor: Set(valor_total),
      pix_qr_code: Set(Some(charge.pix_payload.clone())),
      pix_qr_code_base64: Set(Some(charge.pix_image_base64.clone())),
      pix_expiration: Set(Some(expires_at)),
      pago_em: Set(None),
      raw_response: Set(Some(charge.raw)),
      created_at: Set(now),
      updated_at: Set(now),
    };

    // the order stays payable even without its payment row
    if let Err(err) = payment.insert(self.db).await {
      error!("Failed to store payment for order {}: {err}", order.id);
    }

    info!(
      "Order {} created: {quantidade}x {} for {}",
      order.numero, lot.nome, buyer.email
    );

    Ok(Checkout {
      pix: Pix {
        qr_code: charge.pix_payload.clone(),
        qr_code_base64: charge.pix_image_base64,
        copia_cola: charge.pix_payload,
        expiration: expires_at,
      },
      pedido: PlacedOrder {
        id: order.id,
        numero: order.numero,
        quantidade,
        valor_total,
        expires_at,
        evento: EventSummary { nome: event.nome, data: event.data_evento },
        lote: lot.into(),
      },
    })
  }

  async fn insert_pending(
    &self,
    buyer: &user::Model,
    lot: &lot::Model,
    quantidade: i32,
    valor_total: i64,
    expires_at: DateTime,
  ) -> Result<order::Model> {
    let now = Utc::now().naive_utc();
    let txn = self.db.begin().await?;

    let order = order::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      numero: Set(utils::order_number()),
      usuario_id: Set(buyer.id.clone()),
      evento_id: Set(lot.evento_id.clone()),
      status: Set(OrderStatus::Pending),
      quantidade_total: Set(quantidade),
      valor_total: Set(valor_total),
      expires_at: Set(Some(expires_at)),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    order_item::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      pedido_id: Set(order.id.clone()),
      lote_id: Set(lot.id.clone()),
      quantidade: Set(quantidade),
      preco_unitario: Set(valor_total / quantidade as i64),
      subtotal: Set(valor_total),
      created_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(order)
  }

  /// Removes a pending order and its items. Safe to call more than once.
  async fn discard(&self, id: &str) {
    let result = async {
      order_item::Entity::delete_many()
        .filter(order_item::Column::PedidoId.eq(id))
        .exec(self.db)
        .await?;
      order::Entity::delete_by_id(id).exec(self.db).await
    };

    if let Err(err) = result.await {
      error!("Failed to discard order {id}: {err}");
    }
  }

  async fn owned(&self, usuario_id: &str, id: &str) -> Result<order::Model> {
    order::Entity::find_by_id(id)
      .filter(order::Column::UsuarioId.eq(usuario_id))
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("Pedido não encontrado"))
  }

  /// Full order for its owner. A pending order past its deadline is
  /// persisted as `expirado` here.
  pub async fn by_id(&self, usuario_id: &str, id: &str) -> Result<OrderDetails> {
    let mut order = self.owned(usuario_id, id).await?;

    let expirado = order.is_expired_at(Utc::now().naive_utc());
    if expirado {
      let mut active: order::ActiveModel = order.into();
      active.status = Set(OrderStatus::Expired);
      active.updated_at = Set(Utc::now().naive_utc());
      order = active.update(self.db).await?;
      info!("Order {} expired", order.numero);
    }

    let itens = order
      .find_related(order_item::Entity)
      .find_also_related(lot::Entity)
      .all(self.db)
      .await?
      .into_iter()
      .map(|(item, lot)| ItemView {
        id: item.id,
        quantidade: item.quantidade,
        preco_unitario: item.preco_unitario,
        subtotal: item.subtotal,
        lote: lot.map(Into::into),
      })
      .collect();

    let pagamento = order.find_related(payment::Entity).one(self.db).await?;
    let evento = order.find_related(event::Entity).one(self.db).await?;

    Ok(OrderDetails {
      pedido: OrderView {
        id: order.id,
        numero: order.numero,
        status: order.status,
        quantidade_total: order.quantidade_total,
        valor_total: order.valor_total,
        expires_at: order.expires_at,
        created_at: order.created_at,
        expirado,
      },
      evento,
      itens,
      pagamento,
    })
  }

  /// The user's orders, newest first.
  pub async fn list(&self, usuario_id: &str) -> Result<Vec<ListedOrder>> {
    let orders = order::Entity::find()
      .filter(order::Column::UsuarioId.eq(usuario_id))
      .order_by_desc(order::Column::CreatedAt)
      .find_also_related(event::Entity)
      .all(self.db)
      .await?;

    let ids: HashSet<&str> =
      orders.iter().map(|(order, _)| order.id.as_str()).collect();
    let mut payments: HashMap<String, payment::Model> = payment::Entity::find()
      .filter(payment::Column::PedidoId.is_in(ids))
      .all(self.db)
      .await?
      .into_iter()
      .map(|payment| (payment.pedido_id.clone(), payment))
      .collect();

    Ok(
      orders
        .into_iter()
        .map(|(order, event)| ListedOrder {
          pagamento: payments.remove(&order.id).map(|payment| ListedPayment {
            status: payment.status,
            metodo: payment.metodo,
            pago_em: payment.pago_em,
          }),
          evento: event.map(|event| ListedEvent {
            nome: event.nome,
            slug: event.slug,
            data_evento: event.data_evento,
          }),
          pedido: order,
        })
        .collect(),
    )
  }

  pub async fn stats(&self, usuario_id: &str) -> Result<DashboardStats> {
    let total_pedidos = order::Entity::find()
      .filter(order::Column::UsuarioId.eq(usuario_id))
      .count(self.db)
      .await?;

    let total_ingressos = ticket::Entity::find()
      .filter(ticket::Column::UsuarioId.eq(usuario_id))
      .filter(ticket::Column::Status.eq(TicketStatus::Active))
      .count(self.db)
      .await?;

    Ok(DashboardStats {
      total_pedidos,
      total_ingressos,
      tem_ingresso_ativo: total_ingressos > 0,
    })
  }
}
