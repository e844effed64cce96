//! `PostgreSQL` cart repository.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use product_catalog_core::{CartItemId, ProductId, UserId};

use super::products::ProductRow;
use super::{CartRepository, RepositoryError};
use crate::models::{CartItem, Product};

const LINE_QUERY: &str = r"
    SELECT c.id, c.quantity, c.user_id,
           p.id AS product_id, p.name, p.price, p.description,
           p.image_type, p.image_file, p.version
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
";

/// Cart rows in `PostgreSQL`.
#[derive(Clone)]
pub struct PgCart {
    pool: PgPool,
}

impl PgCart {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    quantity: i32,
    user_id: UserId,
    product_id: ProductId,
    name: String,
    price: Decimal,
    description: String,
    image_type: Option<String>,
    image_file: Option<Vec<u8>>,
    version: i32,
}

impl TryFrom<CartLineRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let product = Product::try_from(ProductRow {
            id: row.product_id,
            name: row.name,
            price: row.price,
            description: row.description,
            image_type: row.image_type,
            image_file: row.image_file,
            version: row.version,
        })?;

        Ok(Self {
            id: row.id,
            product,
            quantity: row.quantity,
            user_id: row.user_id,
        })
    }
}

#[async_trait]
impl CartRepository for PgCart {
    async fn upsert(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        // The WHERE guard skips the update instead of overflowing int4.
        let id: Option<CartItemId> = sqlx::query_scalar(
            r"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            WHERE cart_items.quantity <= 2147483647 - EXCLUDED.quantity
            RETURNING id
            ",
        )
        .bind(user)
        .bind(product)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "cart line already exists"))?;
        let id = id.ok_or(RepositoryError::OutOfRange)?;

        let row: CartLineRow = sqlx::query_as(&format!("{LINE_QUERY} WHERE c.id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        CartItem::try_from(row)
    }

    async fn lines(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartLineRow> =
            sqlx::query_as(&format!("{LINE_QUERY} WHERE c.user_id = $1 ORDER BY c.id"))
                .bind(user)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    async fn remove(&self, user: UserId, item: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item)
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self, user: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
