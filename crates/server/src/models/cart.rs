//! Cart line type.

use rust_decimal::Decimal;

use product_catalog_core::{CartItemId, UserId};

use super::Product;

/// One product in a user's cart.
///
/// There is at most one line per `(user_id, product.id)`; adding the same
/// product again increases `quantity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: i32,
    pub user_id: UserId,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}
