use serde::Deserialize;
use uuid::Uuid;

use crate::{entity::user, prelude::*};

const BCRYPT_COST: u32 = if cfg!(test) { 4 } else { 12 };

const INVALID_CREDENTIALS: &str = "E-mail/telefone ou senha incorretos";

#[derive(Debug, Deserialize)]
pub struct Signup {
  #[serde(default)]
  pub nome: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub telefone: String,
  #[serde(default)]
  pub senha: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
  pub nome: Option<String>,
  pub email: Option<String>,
  pub telefone: Option<String>,
}

fn validate_name(nome: &str) -> Result<()> {
  if nome.trim().chars().count() < 3 {
    return Err(Error::validation("Nome deve ter pelo menos 3 caracteres"));
  }
  Ok(())
}

fn validate_email(email: &str) -> Result<()> {
  if !utils::is_valid_email(email.trim()) {
    return Err(Error::validation("E-mail inválido"));
  }
  Ok(())
}

fn normalize_phone(telefone: &str) -> Result<String> {
  let digits = utils::digits(telefone);
  if !(10..=11).contains(&digits.len()) {
    return Err(Error::validation("Telefone inválido"));
  }
  Ok(digits)
}

async fn hash_password(senha: String) -> Result<String> {
  tokio::task::spawn_blocking(move || bcrypt::hash(senha, BCRYPT_COST))
    .await
    .map_err(|e| Error::Internal(e.to_string()))?
    .map_err(|e| Error::Internal(format!("bcrypt: {e}")))
}

async fn verify_password(senha: String, hash: String) -> Result<bool> {
  tokio::task::spawn_blocking(move || bcrypt::verify(senha, &hash))
    .await
    .map_err(|e| Error::Internal(e.to_string()))?
    .map_err(|e| Error::Internal(format!("bcrypt: {e}")))
}

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  async fn email_taken(&self, email: &str, except: Option<&str>) -> Result<bool> {
    let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = except {
      query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.count(self.db).await? > 0)
  }

  async fn phone_taken(&self, phone: &str, except: Option<&str>) -> Result<bool> {
    let mut query =
      user::Entity::find().filter(user::Column::Telefone.eq(phone));
    if let Some(id) = except {
      query = query.filter(user::Column::Id.ne(id));
    }
    Ok(query.count(self.db).await? > 0)
  }

  pub async fn signup(&self, form: Signup) -> Result<user::Model> {
    if [&form.nome, &form.email, &form.telefone, &form.senha]
      .iter()
      .any(|field| field.trim().is_empty())
    {
      return Err(Error::validation("Todos os campos são obrigatórios"));
    }

    validate_name(&form.nome)?;
    validate_email(&form.email)?;
    let telefone = normalize_phone(&form.telefone)?;
    if form.senha.chars().count() < 8 {
      return Err(Error::validation("Senha deve ter pelo menos 8 caracteres"));
    }

    let email = form.email.trim().to_lowercase();
    if self.email_taken(&email, None).await? {
      return Err(Error::Conflict("Este e-mail já está cadastrado".into()));
    }
    if self.phone_taken(&telefone, None).await? {
      return Err(Error::Conflict("Este telefone já está cadastrado".into()));
    }

    let now = Utc::now().naive_utc();
    let user = user::ActiveModel {
      id: Set(Uuid::new_v4().to_string()),
      nome: Set(form.nome.trim().to_string()),
      email: Set(email),
      telefone: Set(telefone),
      senha_hash: Set(hash_password(form.senha).await?),
      email_verificado: Set(false),
      telefone_verificado: Set(false),
      ativo: Set(true),
      created_at: Set(now),
      updated_at: Set(now),
    };

    let user = user.insert(self.db).await?;
    info!("New account {} ({})", user.id, user.email);
    Ok(user)
  }

  /// Looks the account up by e-mail (anything containing `@`) or by phone
  /// digits and checks the password.
  pub async fn authenticate(
    &self,
    identifier: &str,
    senha: &str,
  ) -> Result<user::Model> {
    let query = if identifier.contains('@') {
      user::Entity::find()
        .filter(user::Column::Email.eq(identifier.trim().to_lowercase()))
    } else {
      user::Entity::find()
        .filter(user::Column::Telefone.eq(utils::digits(identifier)))
    };

    let Some(user) = query.one(self.db).await? else {
      return Err(Error::unauthorized(INVALID_CREDENTIALS));
    };

    if !user.ativo {
      return Err(Error::unauthorized(
        "Conta desativada. Entre em contato com o suporte.",
      ));
    }

    if !verify_password(senha.to_string(), user.senha_hash.clone()).await? {
      return Err(Error::unauthorized(INVALID_CREDENTIALS));
    }

    Ok(user)
  }

  pub async fn update_profile(
    &self,
    user: user::Model,
    update: ProfileUpdate,
  ) -> Result<user::Model> {
    let nome = update.nome.filter(|v| !v.trim().is_empty());
    let email = update.email.filter(|v| !v.trim().is_empty());
    let telefone = update.telefone.filter(|v| !v.trim().is_empty());

    if nome.is_none() && email.is_none() && telefone.is_none() {
      return Err(Error::validation("Nenhum dado para atualizar"));
    }

    let id = user.id.clone();
    let mut active: user::ActiveModel = user.into();

    if let Some(nome) = nome {
      validate_name(&nome)?;
      active.nome = Set(nome.trim().to_string());
    }

    if let Some(email) = email {
      validate_email(&email)?;
      let email = email.trim().to_lowercase();
      if self.email_taken(&email, Some(&id)).await? {
        return Err(Error::Conflict("Este e-mail já está em uso".into()));
      }
      active.email = Set(email);
    }

    if let Some(telefone) = telefone {
      let telefone = normalize_phone(&telefone)?;
      if self.phone_taken(&telefone, Some(&id)).await? {
        return Err(Error::Conflict("Este telefone já está em uso".into()));
      }
      active.telefone = Set(telefone);
    }

    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::testing::setup_db;

  fn signup(email: &str, telefone: &str) -> Signup {
    Signup {
      nome: "Ana Souza".into(),
      email: email.into(),
      telefone: telefone.into(),
      senha: "segredo123".into(),
    }
  }

  #[tokio::test]
  async fn test_signup_normalizes_contact() {
    let db = setup_db().await;

    let user = User::new(&db)
      .signup(signup("Ana@Naipe.com.br", "(16) 99613-0592"))
      .await
      .unwrap();

    assert_eq!(user.email, "ana@naipe.com.br");
    assert_eq!(user.telefone, "16996130592");
    assert_ne!(user.senha_hash, "segredo123");
    assert!(user.ativo);
  }

  #[tokio::test]
  async fn test_signup_validation() {
    let db = setup_db().await;
    let sv = User::new(&db);

    let mut form = signup("ana@naipe.com.br", "16996130592");
    form.senha = "curta".into();
    assert!(matches!(sv.signup(form).await, Err(Error::Validation(_))));

    let form = signup("ana@naipe", "16996130592");
    assert!(matches!(sv.signup(form).await, Err(Error::Validation(_))));

    let form = signup("ana@naipe.com.br", "9961");
    assert!(matches!(sv.signup(form).await, Err(Error::Validation(_))));
  }

  #[tokio::test]
  async fn test_signup_rejects_duplicates() {
    let db = setup_db().await;
    let sv = User::new(&db);

    sv.signup(signup("ana@naipe.com.br", "16996130592")).await.unwrap();

    let err = sv
      .signup(signup("ANA@naipe.com.br", "16900000000"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Este e-mail já está cadastrado");

    let err = sv
      .signup(signup("bia@naipe.com.br", "16 99613 0592"))
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Este telefone já está cadastrado");
  }

  #[tokio::test]
  async fn test_authenticate_by_email_or_phone() {
    let db = setup_db().await;
    let sv = User::new(&db);
    let user =
      sv.signup(signup("ana@naipe.com.br", "16996130592")).await.unwrap();

    let by_email =
      sv.authenticate(" ANA@naipe.com.br ", "segredo123").await.unwrap();
    assert_eq!(by_email.id, user.id);

    let by_phone =
      sv.authenticate("(16) 99613-0592", "segredo123").await.unwrap();
    assert_eq!(by_phone.id, user.id);

    let err = sv.authenticate("ana@naipe.com.br", "errada123").await;
    assert!(matches!(err, Err(Error::Unauthorized(_))));

    let err = sv.authenticate("ninguem@naipe.com.br", "segredo123").await;
    assert_eq!(err.unwrap_err().to_string(), INVALID_CREDENTIALS);
  }

  #[tokio::test]
  async fn test_inactive_account_cannot_login() {
    let db = setup_db().await;
    let sv = User::new(&db);
    let user =
      sv.signup(signup("ana@naipe.com.br", "16996130592")).await.unwrap();

    let mut active: user::ActiveModel = user.into();
    active.ativo = Set(false);
    active.update(&db).await.unwrap();

    let err = sv.authenticate("ana@naipe.com.br", "segredo123").await;
    assert_eq!(
      err.unwrap_err().to_string(),
      "Conta desativada. Entre em contato com o suporte."
    );
  }

  #[tokio::test]
  async fn test_update_profile() {
    let db = setup_db().await;
    let sv = User::new(&db);
    let ana =
      sv.signup(signup("ana@naipe.com.br", "16996130592")).await.unwrap();
    sv.signup(signup("bia@naipe.com.br", "16900000000")).await.unwrap();

    let err = sv
      .update_profile(ana.clone(), ProfileUpdate::default())
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Nenhum dado para atualizar");

    let taken = ProfileUpdate {
      email: Some("bia@naipe.com.br".into()),
      ..Default::default()
    };
    let err = sv.update_profile(ana.clone(), taken).await.unwrap_err();
    assert_eq!(err.to_string(), "Este e-mail já está em uso");

    let rename = ProfileUpdate {
      nome: Some("  Ana Maria ".into()),
      ..Default::default()
    };
    let updated = sv.update_profile(ana, rename).await.unwrap();
    assert_eq!(updated.nome, "Ana Maria");
    assert_eq!(updated.email, "ana@naipe.com.br");
  }
}
