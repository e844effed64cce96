//! In-process store implementing every repository trait.
//!
//! Mirrors the `PostgreSQL` constraints that services rely on: unique user
//! and role names, one cart line per `(user, product)`, cart lines cascading
//! with their product, and version-checked product updates.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use product_catalog_core::{CartItemId, Email, ProductId, RoleId, RoleName, RowVersion, UserId};

use super::{
    CartRepository, IdentityRepository, NewUser, ProductRepository, RepositoryError,
};
use crate::models::{CartItem, Product, ProductDraft, Role, User};

/// Shared in-memory tables. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    last_product_id: i32,
    cart: BTreeMap<CartItemId, CartLine>,
    last_cart_id: i32,
    users: HashMap<UserId, (User, String)>,
    roles: HashMap<RoleId, Role>,
    memberships: BTreeSet<(UserId, RoleId)>,
}

struct CartLine {
    user: UserId,
    product: ProductId,
    quantity: i32,
}

impl Tables {
    fn materialize(&self, id: CartItemId, line: &CartLine) -> Result<CartItem, RepositoryError> {
        let product = self.products.get(&line.product).cloned().ok_or_else(|| {
            RepositoryError::DataCorruption(format!("cart line {id} points at a missing product"))
        })?;
        Ok(CartItem {
            id,
            product,
            quantity: line.quantity,
            user_id: line.user,
        })
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.last_product_id += 1;
        let id = ProductId::new(tables.last_product_id);
        let product = draft.into_product(id, RowVersion::INITIAL);
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.products.get_mut(&id) else {
            return Err(RepositoryError::Stale);
        };
        if draft.version.is_some_and(|v| v != current.version) {
            return Err(RepositoryError::Stale);
        }

        let next = current.version.next();
        *current = draft.into_product(id, next);
        Ok(current.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.products.remove(&id).is_none() {
            return Ok(false);
        }
        tables.cart.retain(|_, line| line.product != id);
        Ok(true)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn upsert(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.products.contains_key(&product) {
            return Err(RepositoryError::InvalidReference);
        }

        let existing = tables
            .cart
            .iter()
            .find(|(_, line)| line.user == user && line.product == product)
            .map(|(id, _)| *id);

        let id = if let Some(id) = existing {
            if let Some(line) = tables.cart.get_mut(&id) {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(RepositoryError::OutOfRange)?;
            }
            id
        } else {
            tables.last_cart_id += 1;
            let id = CartItemId::new(tables.last_cart_id);
            tables.cart.insert(
                id,
                CartLine {
                    user,
                    product,
                    quantity,
                },
            );
            id
        };

        let line = tables
            .cart
            .get(&id)
            .ok_or(RepositoryError::NotFound)?;
        tables.materialize(id, line)
    }

    async fn lines(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let tables = self.tables.read().await;
        tables
            .cart
            .iter()
            .filter(|(_, line)| line.user == user)
            .map(|(id, line)| tables.materialize(*id, line))
            .collect()
    }

    async fn remove(&self, user: UserId, item: CartItemId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;
        match tables.cart.get(&item) {
            Some(line) if line.user == user => {
                tables.cart.remove(&item);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear(&self, user: UserId) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let before = tables.cart.len();
        tables.cart.retain(|_, line| line.user != user);
        Ok((before - tables.cart.len()) as u64)
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let normalized = user.user_name.to_uppercase();
        if tables
            .users
            .values()
            .any(|(u, _)| u.user_name.to_uppercase() == normalized)
        {
            return Err(RepositoryError::Conflict("user name already exists".to_owned()));
        }

        let created = User {
            id: UserId::generate(),
            user_name: user.user_name,
            email: user.email,
            email_confirmed: true,
            created_at: Utc::now(),
        };
        tables
            .users
            .insert(created.id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .get(&id)
            .map(|(user, _)| user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let normalized = email.normalized();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|(user, _)| user.email.normalized() == normalized)
            .cloned())
    }

    async fn create_role(&self, name: &RoleName) -> Result<Role, RepositoryError> {
        let mut tables = self.tables.write().await;
        let normalized = name.normalized();
        if tables.roles.values().any(|r| r.name.normalized() == normalized) {
            return Err(RepositoryError::Conflict("role already exists".to_owned()));
        }

        let role = Role {
            id: RoleId::generate(),
            name: name.clone(),
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError> {
        let normalized = name.normalized();
        Ok(self
            .tables
            .read()
            .await
            .roles
            .values()
            .find(|r| r.name.normalized() == normalized)
            .cloned())
    }

    async fn add_to_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user) || !tables.roles.contains_key(&role) {
            return Err(RepositoryError::InvalidReference);
        }
        if !tables.memberships.insert((user, role)) {
            return Err(RepositoryError::Conflict("user already in role".to_owned()));
        }
        Ok(())
    }

    async fn roles_for(&self, user: UserId) -> Result<Vec<Role>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables
            .memberships
            .iter()
            .filter(|(member, _)| *member == user)
            .filter_map(|(_, role)| tables.roles.get(role).cloned())
            .collect();
        roles.sort_by_key(|r| r.name.normalized());
        Ok(roles)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use product_catalog_core::Price;

    use super::*;

    fn draft(name: &str) -> ProductDraft {
        ProductDraft {
            id: None,
            name: name.to_owned(),
            price: Price::from_cents(100),
            description: "d".to_owned(),
            image: None,
            version: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = ProductRepository::insert(&store, draft("a")).await.unwrap();
        let b = ProductRepository::insert(&store, draft("b")).await.unwrap();
        assert!(a.id.as_i32() > 0);
        assert!(b.id > a.id);
        assert_eq!(a.version, RowVersion::INITIAL);
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let store = MemoryStore::new();
        let product = ProductRepository::insert(&store, draft("a")).await.unwrap();

        let updated = ProductRepository::update(
            &store,
            product.id,
            ProductDraft {
                version: Some(product.version),
                ..draft("b")
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.version.as_i32(), 2);

        let stale = ProductRepository::update(
            &store,
            product.id,
            ProductDraft {
                version: Some(product.version),
                ..draft("c")
            },
        )
        .await;
        assert!(matches!(stale, Err(RepositoryError::Stale)));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_cart() {
        let store = MemoryStore::new();
        let user = UserId::generate();
        let product = ProductRepository::insert(&store, draft("a")).await.unwrap();
        store.upsert(user, product.id, 1).await.unwrap();

        assert!(ProductRepository::delete(&store, product.id).await.unwrap());
        assert!(store.lines(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_rejects_missing_product() {
        let store = MemoryStore::new();
        let result = store.upsert(UserId::generate(), ProductId::new(99), 1).await;
        assert!(matches!(result, Err(RepositoryError::InvalidReference)));
    }
}
