//! Route gating and the login/logout flow.
//!
//! Being authenticated means exactly one thing: a credential is present.
//! There is no expiry or refresh; a refused credential is discovered by the
//! next request that gets a 401/403.

use std::fmt;
use tracing::info;

use crate::api::api_types::{LoginRequest, LoginResponse};
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::SessionStore;

/// Login endpoint, relative to the API base.
const LOGIN_PATH: &str = "/admin/auth/login";

/// Screens of the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Login,
  Dashboard,
  Products,
  Categories,
  Orders,
}

impl Route {
  pub fn is_protected(self) -> bool {
    !matches!(self, Route::Login)
  }

  pub fn path(self) -> &'static str {
    match self {
      Route::Login => "/login",
      Route::Dashboard => "/dashboard",
      Route::Products => "/products",
      Route::Categories => "/categories",
      Route::Orders => "/orders",
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

/// Outcome of a gated navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
  Render(Route),
  Redirect(Route),
}

/// Binary gate over the session's credential.
#[derive(Clone)]
pub struct AuthGate {
  session: SessionStore,
}

impl AuthGate {
  pub fn new(session: SessionStore) -> Self {
    Self { session }
  }

  /// A credential is present in memory or in persistent storage.
  pub fn is_authenticated(&self) -> bool {
    self.session.has_credential()
  }

  pub fn require_auth(&self, route: Route) -> Navigation {
    if route.is_protected() && !self.is_authenticated() {
      info!(target_route = %route, "not authenticated, redirecting to login");
      Navigation::Redirect(Route::Login)
    } else {
      Navigation::Render(route)
    }
  }
}

/// Exchanges administrator credentials for a bearer token.
#[derive(Clone)]
pub struct AuthService {
  client: ApiClient,
  session: SessionStore,
}

impl AuthService {
  pub fn new(client: ApiClient, session: SessionStore) -> Self {
    Self { client, session }
  }

  /// Log in and store the returned credential.
  ///
  /// A refused login is reported as [`ApiError::Rejected`] so it is not
  /// mistaken for a revoked session.
  pub async fn login(&self, email: &str, password: &str) -> color_eyre::Result<()> {
    let raw = self
      .client
      .post(LOGIN_PATH, &LoginRequest { email, password })
      .await
      .map_err(|e| {
        if e.is_auth_failure() {
          let body = e.body().cloned().unwrap_or_default();
          ApiError::rejected(
            body.code.as_deref(),
            body.message.as_deref().unwrap_or("Invalid credentials"),
          )
        } else {
          e
        }
      })?;

    let response: LoginResponse = serde_json::from_value(raw).map_err(ApiError::from)?;
    let token = response
      .data
      .and_then(|d| d.access_token)
      .filter(|t| !t.is_empty());

    match token {
      Some(token) if response.ok => {
        self.session.set_credential(&token)?;
        info!(email, "logged in");
        Ok(())
      }
      _ => Err(ApiError::rejected(response.code.as_deref(), "Invalid credentials").into()),
    }
  }

  /// Forget the credential.
  pub fn logout(&self) -> color_eyre::Result<()> {
    self.session.clear()?;
    info!("logged out");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::ProductListQuery;
  use crate::api::{Products, ResourceCache};
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::session::{MemoryTokenStorage, SqliteTokenStorage};
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn setup(server: &MockServer) -> (SessionStore, ApiClient) {
    let session = SessionStore::new(MemoryTokenStorage::default());
    let client = ApiClient::new(&format!("{}/api/v1", server.uri()), session.clone()).unwrap();
    (session, client)
  }

  #[test]
  fn test_gate_redirects_only_protected_routes() {
    let session = SessionStore::new(MemoryTokenStorage::default());
    let gate = AuthGate::new(session.clone());

    assert!(!gate.is_authenticated());
    assert_eq!(gate.require_auth(Route::Orders), Navigation::Redirect(Route::Login));
    assert_eq!(gate.require_auth(Route::Login), Navigation::Render(Route::Login));

    session.set_credential("T1").unwrap();
    assert!(gate.is_authenticated());
    assert_eq!(gate.require_auth(Route::Orders), Navigation::Render(Route::Orders));
  }

  #[test]
  fn test_gate_sees_persisted_credential_before_hydrate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.db");
    SessionStore::new(SqliteTokenStorage::open_at(&path).unwrap())
      .set_credential("T1")
      .unwrap();

    let fresh = SessionStore::new(SqliteTokenStorage::open_at(&path).unwrap());
    assert_eq!(fresh.credential(), None);
    assert!(AuthGate::new(fresh).is_authenticated());
  }

  #[test]
  fn test_clearing_session_redirects_next_navigation() {
    let session = SessionStore::new(MemoryTokenStorage::default());
    session.set_credential("T1").unwrap();
    let gate = AuthGate::new(session.clone());
    assert_eq!(gate.require_auth(Route::Dashboard), Navigation::Render(Route::Dashboard));

    session.clear().unwrap();

    assert!(!gate.is_authenticated());
    assert_eq!(gate.require_auth(Route::Dashboard), Navigation::Redirect(Route::Login));
  }

  #[tokio::test]
  async fn test_login_then_requests_carry_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/admin/auth/login"))
      .and(body_json(json!({"email": "a@b.com", "password": "x"})))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"accessToken": "T1"}})),
      )
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/v1/products"))
      .and(header("Authorization", "Bearer T1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {"items": []}})))
      .expect(1)
      .mount(&server)
      .await;

    let (session, client) = setup(&server);
    let auth = AuthService::new(client.clone(), session.clone());

    auth.login("a@b.com", "x").await.unwrap();
    assert_eq!(session.credential().as_deref(), Some("T1"));

    let products: ResourceCache<Products> = ResourceCache::new(client, CacheLayer::new(MemoryStorage::new()));
    products.list(&ProductListQuery::default()).await.unwrap();
  }

  #[tokio::test]
  async fn test_login_without_token_is_invalid_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/admin/auth/login"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "data": {}})))
      .mount(&server)
      .await;

    let (session, client) = setup(&server);
    let err = AuthService::new(client, session.clone())
      .login("a@b.com", "wrong")
      .await
      .unwrap_err();
    let err = err.downcast_ref::<ApiError>().unwrap();

    assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    assert_eq!(session.credential(), None);
  }

  #[tokio::test]
  async fn test_refused_login_is_not_an_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v1/admin/auth/login"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"ok": false, "code": "BAD_LOGIN"})))
      .mount(&server)
      .await;

    let (session, client) = setup(&server);
    let err = AuthService::new(client, session)
      .login("a@b.com", "wrong")
      .await
      .unwrap_err();
    let err = err.downcast_ref::<ApiError>().unwrap();

    assert!(!err.is_auth_failure());
    assert_eq!(err.user_message("Login failed"), "Invalid credentials");
  }

  #[tokio::test]
  async fn test_logout_clears_credential() {
    let server = MockServer::start().await;
    let (session, client) = setup(&server);
    session.set_credential("T1").unwrap();

    let auth = AuthService::new(client, session.clone());
    let gate = AuthGate::new(session.clone());
    auth.logout().unwrap();

    assert_eq!(session.credential(), None);
    assert!(!gate.is_authenticated());
  }
}
