//! `PostgreSQL` product repository.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use product_catalog_core::{Price, ProductId, RowVersion};

use super::{ProductRepository, RepositoryError};
use crate::models::{Product, ProductDraft, ProductImage};

pub(crate) const PRODUCT_COLUMNS: &str =
    "id, name, price, description, image_type, image_file, version";

/// Product rows in `PostgreSQL`.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image_type: Option<String>,
    pub image_file: Option<Vec<u8>>,
    pub version: i32,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;

        let image = match (row.image_type, row.image_file) {
            (Some(content_type), Some(data)) => Some(ProductImage { content_type, data }),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "product {} has image bytes without a type or vice versa",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            price,
            description: row.description,
            image,
            version: RowVersion::new(row.version),
        })
    }
}

#[async_trait]
impl ProductRepository for PgCatalog {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    async fn insert(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let (image_type, image_file) = split_image(draft.image);

        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO products (name, price, description, image_type, image_file)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(draft.price)
        .bind(&draft.description)
        .bind(image_type)
        .bind(image_file)
        .fetch_one(&self.pool)
        .await?;

        Product::try_from(row)
    }

    async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let (image_type, image_file) = split_image(draft.image);

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE products
            SET name = $2, price = $3, description = $4,
                image_type = $5, image_file = $6, version = version + 1
            WHERE id = $1 AND ($7::INT4 IS NULL OR version = $7)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(draft.price)
        .bind(&draft.description)
        .bind(image_type)
        .bind(image_file)
        .bind(draft.version.map(|v| v.as_i32()))
        .fetch_optional(&self.pool)
        .await?;

        row.map_or(Err(RepositoryError::Stale), Product::try_from)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn split_image(image: Option<ProductImage>) -> (Option<String>, Option<Vec<u8>>) {
    image.map_or((None, None), |i| (Some(i.content_type), Some(i.data)))
}
