//! Cookie sessions: the `Auth` extractor and the account endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, StatusCode, header, request::Parts},
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::Body;
use crate::{
  entity::user,
  prelude::*,
  state::{AppState, Config},
  sv::{
    self,
    user::{ProfileUpdate, Signup},
  },
};

pub const SESSION_COOKIE: &str = "session_token";

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
  let max_age = sv::session::lifetime().num_seconds();
  Cookie::build((SESSION_COOKIE, token))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(config.secure_cookies())
    .max_age(::time::Duration::seconds(max_age))
    .build()
}

fn clear_session(jar: CookieJar) -> CookieJar {
  jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub enum Visitor {
  Anonymous,
  Expired,
  Known(user::Model),
}

/// Resolves the session cookie, if any, to its user.
pub async fn visitor(app: &AppState, jar: &CookieJar) -> Result<Visitor> {
  let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
  else {
    return Ok(Visitor::Anonymous);
  };

  Ok(match app.sv().session.validate(&token).await? {
    Some(user) => Visitor::Known(user),
    None => Visitor::Expired,
  })
}

/// A request carrying a valid session. An expired cookie is cleared in the
/// rejection.
pub struct Auth(pub user::Model);

impl FromRequestParts<Arc<AppState>> for Auth {
  type Rejection = Response;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self, Self::Rejection> {
    let jar = CookieJar::from_headers(&parts.headers);

    match visitor(app, &jar).await {
      Ok(Visitor::Known(user)) => Ok(Auth(user)),
      Ok(Visitor::Anonymous) => {
        Err(Error::unauthorized("Não autenticado").into_response())
      }
      Ok(Visitor::Expired) => Err(
        (
          clear_session(jar),
          Error::unauthorized("Sessão inválida ou expirada"),
        )
          .into_response(),
      ),
      Err(err) => Err(err.into_response()),
    }
  }
}

fn client_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
  let text = |name: header::HeaderName| {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
  };

  let ip = text(header::HeaderName::from_static("x-forwarded-for"))
    .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
    .or_else(|| text(header::HeaderName::from_static("x-real-ip")));

  (ip, text(header::USER_AGENT))
}

pub async fn signup(
  State(app): State<Arc<AppState>>,
  Body(form): Body<Signup>,
) -> Result<impl IntoResponse> {
  let usuario = app.sv().user.signup(form).await?;

  Ok((
    StatusCode::CREATED,
    Json(json::json!({
      "message": "Conta criada com sucesso",
      "usuario": usuario,
    })),
  ))
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
  #[serde(default)]
  pub identificador: String,
  #[serde(default)]
  pub senha: String,
}

pub async fn login(
  State(app): State<Arc<AppState>>,
  jar: CookieJar,
  headers: HeaderMap,
  Body(req): Body<LoginReq>,
) -> Result<impl IntoResponse> {
  if req.identificador.trim().is_empty() || req.senha.is_empty() {
    return Err(Error::validation("E-mail/telefone e senha são obrigatórios"));
  }

  let usuario = app.sv().user.authenticate(&req.identificador, &req.senha).await?;

  let (ip, user_agent) = client_info(&headers);
  let session = app.sv().session.create(&usuario.id, ip, user_agent).await?;
  info!("User {} logged in", usuario.id);

  Ok((
    jar.add(session_cookie(session.token, &app.config)),
    Json(json::json!({
      "message": "Login realizado com sucesso",
      "usuario": usuario,
    })),
  ))
}

pub async fn logout(
  State(app): State<Arc<AppState>>,
  jar: CookieJar,
) -> Result<impl IntoResponse> {
  if let Some(cookie) = jar.get(SESSION_COOKIE) {
    app.sv().session.delete(cookie.value()).await?;
  }

  Ok((
    clear_session(jar),
    Json(json::json!({ "message": "Logout realizado com sucesso" })),
  ))
}

pub async fn me(Auth(user): Auth) -> Json<json::Value> {
  Json(json::json!({ "usuario": user }))
}

pub async fn update_me(
  State(app): State<Arc<AppState>>,
  Auth(user): Auth,
  Body(update): Body<ProfileUpdate>,
) -> Result<Json<json::Value>> {
  let usuario = app.sv().user.update_profile(user, update).await?;

  Ok(Json(json::json!({
    "message": "Dados atualizados com sucesso",
    "usuario": usuario,
  })))
}
