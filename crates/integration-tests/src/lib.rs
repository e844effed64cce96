//! Integration tests for the product catalog.
//!
//! Each test spawns the full router on an ephemeral port, backed by the
//! in-memory catalog/identity store and an in-memory session store, and
//! talks to it over real HTTP with `reqwest`. No database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p product-catalog-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_products` - Product JSON API and role gating
//! - `api_users` - Registration, cookie login, tokens and roles
//! - `cart` - The per-user cart over both surfaces
//! - `browser` - HTML pages, redirects and anti-forgery checks

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;

use reqwest::{Client, StatusCode, redirect};
use secrecy::SecretString;
use serde_json::{Value, json};

use product_catalog_core::RoleName;
use product_catalog_server::config::{CatalogConfig, Environment, JwtConfig};
use product_catalog_server::db::{IdentityRepository, MemoryStore};
use product_catalog_server::middleware::create_session_layer;
use product_catalog_server::models::User;
use product_catalog_server::services::AssignRoleRequest;
use product_catalog_server::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "pass1234";

/// Configuration for a server that never touches a database.
#[must_use]
pub fn test_config() -> CatalogConfig {
    CatalogConfig {
        database_url: SecretString::from("postgres://unused/unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://127.0.0.1".to_owned(),
        environment: Environment::Development,
        session_idle_minutes: 20,
        jwt: JwtConfig {
            key: SecretString::from("integration-test-signing-key-7f3a9c1e5b2d8f4a6c0e9b7d5f3a1c8e"),
            issuer: "catalog-tests".to_owned(),
            audience: "catalog-tests".to_owned(),
            duration_minutes: 60,
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A running server plus direct access to its store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    pub store: MemoryStore,
}

impl TestApp {
    /// Start a fresh server with empty stores.
    pub async fn spawn() -> Self {
        let config = test_config();
        let store = MemoryStore::new();
        let state = AppState::in_memory(config.clone(), store.clone());
        let session_layer =
            create_session_layer(tower_sessions::MemoryStore::default(), &config);
        let router = product_catalog_server::app(state.clone(), session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Test server failed");
        });

        Self { addr, state, store }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Client with a cookie jar that does not follow redirects.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register a user directly through the identity service.
    pub async fn register(&self, email: &str) -> User {
        self.state
            .identity()
            .register(email, PASSWORD)
            .await
            .expect("Failed to register test user")
    }

    /// Register a user holding the `Admin` role.
    pub async fn register_staff(&self, email: &str) -> User {
        let user = self.register(email).await;
        let name = RoleName::parse("Admin").expect("valid role name");

        let role = match self
            .store
            .find_role_by_name(&name)
            .await
            .expect("Role lookup failed")
        {
            Some(role) => role,
            None => self
                .state
                .identity()
                .create_role("Admin")
                .await
                .expect("Failed to create role"),
        };

        self.state
            .identity()
            .assign_role(AssignRoleRequest {
                user_id: Some(user.id.to_string()),
                role_id: Some(role.id.to_string()),
                role_name: Some("Admin".to_owned()),
            })
            .await
            .expect("Failed to assign role");
        user
    }

    /// Obtain a bearer token from `/api/user/auth`.
    pub async fn token(&self, email: &str) -> String {
        let resp = Self::client()
            .post(self.url("/api/user/auth"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to request token");
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = resp.json().await.expect("Token response is not JSON");
        body["token"]
            .as_str()
            .expect("Token response has no token")
            .to_owned()
    }

    /// Sign `client` in with a cookie session through the browser form.
    pub async fn browser_login(&self, client: &Client, email: &str) {
        let token = self.csrf_token(client, "/account/login").await;
        let resp = client
            .post(self.url("/account/login"))
            .form(&[
                ("email", email),
                ("password", PASSWORD),
                ("returnUrl", "/product"),
                ("csrf_token", token.as_str()),
            ])
            .send()
            .await
            .expect("Failed to post login form");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    }

    /// Load `path` with `client` and read the anti-forgery token it renders.
    pub async fn csrf_token(&self, client: &Client, path: &str) -> String {
        let html = client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to load page")
            .text()
            .await
            .expect("Page is not text");
        extract_csrf_token(&html).expect("Page has no anti-forgery token")
    }
}

/// Read the value of the first `csrf_token` hidden input.
#[must_use]
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker)? + marker.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(str::to_owned)
}
