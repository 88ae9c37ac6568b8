use chrono::Datelike;
use serde::Serialize;

use crate::{
  entity::{TicketStatus, event, lot, ticket},
  prelude::*,
};

const MAPS_SEARCH: &str = "https://www.google.com/maps/search/";

const WEEKDAYS: [&str; 7] = [
  "segunda-feira", "terça-feira", "quarta-feira", "quinta-feira",
  "sexta-feira", "sábado", "domingo",
];

const MONTHS: [&str; 12] = [
  "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho",
  "agosto", "setembro", "outubro", "novembro", "dezembro",
];

/// `2026-03-14` -> `Sábado, 14 de março`
pub fn long_date(date: DateTime) -> String {
  let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
  let month = MONTHS[date.month0() as usize];

  let mut chars = weekday.chars();
  let weekday = match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  };
  format!("{weekday}, {} de {month}", date.day())
}

#[derive(Debug, Serialize)]
pub struct EventView {
  #[serde(flatten)]
  pub event: event::Model,
  pub data_formatada: String,
}

#[derive(Debug, Serialize)]
pub struct LotView {
  pub id: String,
  pub nome: String,
  pub descricao: Option<String>,
  pub preco: i64,
  pub quantidade_disponivel: i32,
  pub limite_por_usuario: i32,
  pub ordem: i32,
  pub disponivel: bool,
  pub esgotado: bool,
}

impl LotView {
  pub fn new(lot: lot::Model, now: DateTime) -> Self {
    Self {
      quantidade_disponivel: lot.available(),
      disponivel: lot.purchasable(now),
      esgotado: lot.sold_out(),
      id: lot.id,
      nome: lot.nome,
      descricao: lot.descricao,
      preco: lot.preco,
      limite_por_usuario: lot.limite_por_usuario,
      ordem: lot.ordem,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct Listing {
  pub evento: EventView,
  pub lotes: Vec<LotView>,
}

/// Venue details, disclosed only to ticket holders.
#[derive(Debug, Serialize)]
pub struct Venue {
  pub nome: Option<String>,
  pub endereco: Option<String>,
  pub bairro: Option<String>,
  pub cidade: Option<String>,
  #[serde(rename = "mapsUrl")]
  pub maps_url: String,
}

impl Venue {
  fn new(event: event::Model) -> Self {
    let parts = [&event.local_endereco, &event.local_bairro, &event.local_cidade];
    let address = parts
      .into_iter()
      .flatten()
      .map(String::as_str)
      .collect::<Vec<_>>()
      .join(", ");

    let params = [("api", "1"), ("query", address.as_str())];
    let maps_url = reqwest::Url::parse_with_params(MAPS_SEARCH, params)
      .map(String::from)
      .unwrap_or_else(|_| MAPS_SEARCH.to_string());

    Self {
      nome: event.local_nome,
      endereco: event.local_endereco,
      bairro: event.local_bairro,
      cidade: event.local_cidade,
      maps_url,
    }
  }
}

pub struct Catalog<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Catalog<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn active_event(&self) -> Result<Option<event::Model>> {
    let event = event::Entity::find()
      .filter(event::Column::Ativo.eq(true))
      .filter(event::Column::VendasAbertas.eq(true))
      .order_by_asc(event::Column::DataEvento)
      .one(self.db)
      .await?;
    Ok(event)
  }

  pub async fn listing(&self) -> Result<Listing> {
    let Some(event) = self.active_event().await? else {
      return Err(Error::not_found("Nenhum evento disponível no momento"));
    };

    let now = Utc::now().naive_utc();
    let lotes = event
      .find_related(lot::Entity)
      .filter(lot::Column::Ativo.eq(true))
      .order_by_asc(lot::Column::Ordem)
      .all(self.db)
      .await?
      .into_iter()
      .map(|lot| LotView::new(lot, now))
      .collect();

    Ok(Listing {
      evento: EventView { data_formatada: long_date(event.data_evento), event },
      lotes,
    })
  }

  /// An active lot together with its event.
  pub async fn lot(
    &self,
    id: &str,
  ) -> Result<Option<(lot::Model, event::Model)>> {
    let found = lot::Entity::find_by_id(id)
      .filter(lot::Column::Ativo.eq(true))
      .find_also_related(event::Entity)
      .one(self.db)
      .await?;

    Ok(found.and_then(|(lot, event)| Some((lot, event?))))
  }

  pub async fn venue(&self, usuario_id: &str) -> Result<Venue> {
    let Some(ticket) = ticket::Entity::find()
      .filter(ticket::Column::UsuarioId.eq(usuario_id))
      .filter(ticket::Column::Status.eq(TicketStatus::Active))
      .one(self.db)
      .await?
    else {
      return Err(Error::Forbidden("Você não possui ingresso ativo".into()));
    };

    let event = ticket
      .find_related(event::Entity)
      .one(self.db)
      .await?
      .ok_or_else(|| Error::not_found("Evento não encontrado"))?;

    Ok(Venue::new(event))
  }
}
