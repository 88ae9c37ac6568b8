use uuid::Uuid;

use crate::{
  entity::{session, user},
  prelude::*,
};

pub fn lifetime() -> TimeDelta {
  TimeDelta::days(7)
}

pub struct Session<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Session<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    usuario_id: &str,
    ip_address: Option<String>,
    user_agent: Option<String>,
  ) -> Result<session::Model> {
    let now = Utc::now().naive_utc();
    let session = session::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      usuario_id: Set(usuario_id.to_string()),
      token: Set(utils::session_token()),
      ip_address: Set(ip_address),
      user_agent: Set(user_agent),
      expires_at: Set(now + lifetime()),
      created_at: Set(now),
    };

    Ok(session.insert(self.db).await?)
  }

  /// Resolves a token to its active user. Expired sessions are deleted on
  /// the way.
  pub async fn validate(&self, token: &str) -> Result<Option<user::Model>> {
    let Some(session) = session::Entity::find()
      .filter(session::Column::Token.eq(token))
      .one(self.db)
      .await?
    else {
      return Ok(None);
    };

    if session.expires_at < Utc::now().naive_utc() {
      debug!("Session {} expired", session.id);
      session.delete(self.db).await?;
      return Ok(None);
    }

    let user = user::Entity::find_by_id(&session.usuario_id)
      .filter(user::Column::Ativo.eq(true))
      .one(self.db)
      .await?;

    Ok(user)
  }

  pub async fn delete(&self, token: &str) -> Result<()> {
    session::Entity::delete_many()
      .filter(session::Column::Token.eq(token))
      .exec(self.db)
      .await?;
    Ok(())
  }

  pub async fn clean_expired(&self) -> Result<u64> {
    let result = session::Entity::delete_many()
      .filter(session::Column::ExpiresAt.lt(Utc::now().naive_utc()))
      .exec(self.db)
      .await?;
    Ok(result.rows_affected)
  }
}
