//! Cart service.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use product_catalog_core::{CartItemId, ProductId, UserId};

use crate::db::{CartRepository, RepositoryError};
use crate::models::CartItem;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity is below one or would overflow the cart line.
    #[error("invalid quantity {0}")]
    InvalidQuantity(i32),

    /// The product to add does not exist.
    #[error("product {0} does not exist")]
    ProductNotFound(ProductId),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A user's cart with totals.
#[derive(Debug, Clone, Default)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub item_count: i64,
    pub subtotal: Decimal,
}

impl From<Vec<CartItem>> for CartSummary {
    fn from(items: Vec<CartItem>) -> Self {
        let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
        let subtotal = items.iter().map(CartItem::line_total).sum();
        Self {
            items,
            item_count,
            subtotal,
        }
    }
}

/// The single cart used by both the browser and the API.
///
/// Every operation is scoped to the caller's `UserId`.
pub struct CartService<'a> {
    cart: &'a dyn CartRepository,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(cart: &'a dyn CartRepository) -> Self {
        Self { cart }
    }

    /// Add `quantity` of a product to the user's cart, merging with an
    /// existing line for the same product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a quantity below one or one
    /// that would overflow the existing line, and `CartError::ProductNotFound`
    /// when the product does not exist.
    #[instrument(skip(self), fields(user_id = %user, product_id = %product))]
    pub async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItem, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let line = self
            .cart
            .upsert(user, product, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::InvalidReference => CartError::ProductNotFound(product),
                RepositoryError::OutOfRange => CartError::InvalidQuantity(quantity),
                other => CartError::Repository(other),
            })?;

        tracing::info!(quantity = line.quantity, "cart line updated");
        Ok(line)
    }

    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn get_cart(&self, user: UserId) -> Result<CartSummary, CartError> {
        Ok(self.cart.lines(user).await?.into())
    }

    /// Remove one line. A missing line, or one owned by another user, is a
    /// no-op that returns `false`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user, cart_item_id = %item))]
    pub async fn remove_from_cart(&self, user: UserId, item: CartItemId) -> Result<bool, CartError> {
        let removed = self.cart.remove(user, item).await?;
        if !removed {
            tracing::debug!("nothing to remove");
        }
        Ok(removed)
    }

    /// Empty the user's cart. Other users' lines are untouched.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear_cart(&self, user: UserId) -> Result<u64, CartError> {
        let removed = self.cart.clear(user).await?;
        tracing::info!(removed, "cart cleared");
        Ok(removed)
    }
}
