//! Product catalog service.

use tracing::instrument;

use product_catalog_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::{Product, ProductDraft};

/// CRUD over catalog products.
///
/// Absent input, identity mismatches and concurrency conflicts are reported
/// as `Ok(None)` and logged; only unexpected store failures are `Err`.
pub struct ProductService<'a> {
    products: &'a dyn ProductRepository,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductRepository) -> Self {
        Self { products }
    }

    /// Store a new product and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the insert fails.
    #[instrument(skip(self, draft))]
    pub async fn create(
        &self,
        draft: Option<ProductDraft>,
    ) -> Result<Option<Product>, RepositoryError> {
        let Some(draft) = draft else {
            tracing::warn!("create called without a product");
            return Ok(None);
        };

        let product = self.products.insert(draft).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(Some(product))
    }

    /// Every product in store order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn read(&self) -> Result<Vec<Product>, RepositoryError> {
        self.products.list().await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.products.find(id).await
    }

    /// Overwrite product `id` with `draft`.
    ///
    /// Returns `Ok(None)` without touching the store when `draft` is absent or
    /// names a different product, and `Ok(None)` when the row changed or
    /// vanished since it was read. Conflicts are not retried.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` for store failures other than a stale version.
    #[instrument(skip(self, draft), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        draft: Option<ProductDraft>,
    ) -> Result<Option<Product>, RepositoryError> {
        let Some(draft) = draft else {
            tracing::warn!("update called without a product");
            return Ok(None);
        };

        if draft.id != Some(id) {
            tracing::warn!(body_id = ?draft.id, "product id does not match route id");
            return Ok(None);
        }

        match self.products.update(id, draft).await {
            Ok(product) => {
                tracing::info!(version = %product.version, "product updated");
                Ok(Some(product))
            }
            Err(RepositoryError::Stale) => {
                tracing::error!("product changed or was removed since it was read");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove product `id`. Returns `false` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the delete fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let deleted = self.products.delete(id).await?;
        if deleted {
            tracing::info!("product deleted");
        } else {
            tracing::warn!("delete requested for a missing product");
        }
        Ok(deleted)
    }
}
