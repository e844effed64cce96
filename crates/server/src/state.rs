//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::CatalogConfig;
use crate::db::{
    CartRepository, IdentityRepository, MemoryStore, PgCart, PgCatalog, PgIdentity,
    ProductRepository,
};
use crate::services::{CartService, IdentityService, ProductService, TokenIssuer};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out services bound to
/// the configured stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CatalogConfig,
    products: Arc<dyn ProductRepository>,
    cart: Arc<dyn CartRepository>,
    identity: Arc<dyn IdentityRepository>,
    tokens: TokenIssuer,
    pool: Option<PgPool>,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: CatalogConfig, pool: PgPool) -> Self {
        Self::build(
            config,
            Arc::new(PgCatalog::new(pool.clone())),
            Arc::new(PgCart::new(pool.clone())),
            Arc::new(PgIdentity::new(pool.clone())),
            Some(pool),
        )
    }

    /// State backed by one shared in-memory store.
    #[must_use]
    pub fn in_memory(config: CatalogConfig, store: MemoryStore) -> Self {
        Self::build(
            config,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            None,
        )
    }

    fn build(
        config: CatalogConfig,
        products: Arc<dyn ProductRepository>,
        cart: Arc<dyn CartRepository>,
        identity: Arc<dyn IdentityRepository>,
        pool: Option<PgPool>,
    ) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                products,
                cart,
                identity,
                tokens,
                pool,
            }),
        }
    }

    /// Get a reference to the catalog configuration.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    /// The database pool, when running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn products(&self) -> ProductService<'_> {
        ProductService::new(self.inner.products.as_ref())
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_> {
        CartService::new(self.inner.cart.as_ref())
    }

    #[must_use]
    pub fn identity(&self) -> IdentityService<'_> {
        IdentityService::new(self.inner.identity.as_ref())
    }

    /// Bearer token issuer.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }
}
