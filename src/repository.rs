//! Storage access for users and their addresses

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::entity::{address, user};
use crate::pagination::PageWindow;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A user row to insert, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub birth_date: Option<chrono::NaiveDate>,
    pub addresses: Vec<NewAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub cep: i32,
    pub street: String,
    pub street_number: i32,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// Repository trait for user persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user together with its addresses
    async fn create(&self, user: NewUser) -> StoreResult<user::Model>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<user::Model>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<user::Model>>;

    /// Name-ordered slice (ties by id) plus the total user count, read together
    async fn page(&self, window: PageWindow) -> StoreResult<(Vec<user::Model>, u64)>;

    /// Delete a user; its addresses go with it
    async fn delete(&self, id: i32) -> StoreResult<bool>;

    /// Delete every user
    async fn clear(&self) -> StoreResult<()>;

    async fn add_address(&self, user_id: i32, address: NewAddress) -> StoreResult<address::Model>;

    async fn find_address(&self, id: i32) -> StoreResult<Option<address::Model>>;

    /// Addresses of each given user, id-ordered; users without any are absent
    async fn addresses_for_users(&self, user_ids: &[i32]) -> StoreResult<HashMap<i32, Vec<address::Model>>>;
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i32, user::Model>,
    addresses: BTreeMap<i32, address::Model>,
    last_user_id: i32,
    last_address_id: i32,
}

impl Tables {
    fn insert_address(&mut self, user_id: i32, input: NewAddress) -> address::Model {
        self.last_address_id += 1;
        let model = address::Model {
            id: self.last_address_id,
            cep: input.cep,
            street: input.street,
            street_number: input.street_number,
            complement: input.complement,
            neighborhood: input.neighborhood,
            city: input.city,
            state: input.state,
            user_id,
        };
        self.addresses.insert(model.id, model.clone());
        model
    }
}

/// In-memory implementation of UserRepository (for development/testing)
///
/// Mirrors the relational constraints: unique email, address ownership and
/// cascading deletes.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: NewUser) -> StoreResult<user::Model> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::UniqueViolation("users.email".to_string()));
        }

        tables.last_user_id += 1;
        let model = user::Model {
            id: tables.last_user_id,
            name: input.name,
            email: input.email,
            password: input.password_hash,
            birth_date: input.birth_date,
        };
        tables.users.insert(model.id, model.clone());

        for address in input.addresses {
            tables.insert_address(model.id, address);
        }

        tracing::debug!(user_id = model.id, "inserted user");
        Ok(model)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<user::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<user::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn page(&self, window: PageWindow) -> StoreResult<(Vec<user::Model>, u64)> {
        let tables = self.tables.read().await;

        // BTreeMap iterates in id order, so the stable sort keeps ties id-ordered
        let mut users: Vec<&user::Model> = tables.users.values().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));

        let total = users.len() as u64;
        let page = users
            .into_iter()
            .skip(usize::try_from(window.skip).unwrap_or(usize::MAX))
            .take(usize::try_from(window.num_users).unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn delete(&self, id: i32) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.addresses.retain(|_, a| a.user_id != id);

        tracing::debug!(user_id = id, "deleted user");
        Ok(true)
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.clear();
        tables.addresses.clear();
        Ok(())
    }

    async fn add_address(&self, user_id: i32, address: NewAddress) -> StoreResult<address::Model> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKeyViolation("addresses.user_id".to_string()));
        }

        Ok(tables.insert_address(user_id, address))
    }

    async fn find_address(&self, id: i32) -> StoreResult<Option<address::Model>> {
        let tables = self.tables.read().await;
        Ok(tables.addresses.get(&id).cloned())
    }

    async fn addresses_for_users(&self, user_ids: &[i32]) -> StoreResult<HashMap<i32, Vec<address::Model>>> {
        let tables = self.tables.read().await;

        let mut result: HashMap<i32, Vec<address::Model>> = HashMap::new();
        for address in tables.addresses.values().filter(|a| user_ids.contains(&a.user_id)) {
            result.entry(address.user_id).or_default().push(address.clone());
        }

        Ok(result)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{new_address, new_user};
    use super::*;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = InMemoryUserRepository::new();

        let created = repo.create(new_user("User Name", "name@email.com")).await.unwrap();
        assert_eq!(created.id, 1);

        let by_id = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(by_id, Some(created.clone()));

        let by_email = repo.find_by_email("name@email.com").await.unwrap();
        assert_eq!(by_email, Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let repo = InMemoryUserRepository::new();
        let first = repo.create(new_user("First", "name@email.com")).await.unwrap();

        let result = repo.create(new_user("Second", "name@email.com")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation(_))));

        let stored = repo.find_by_email("name@email.com").await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_page_orders_by_name_then_id() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("Carol", "c@email.com")).await.unwrap();
        repo.create(new_user("Alice", "a1@email.com")).await.unwrap();
        repo.create(new_user("Bob", "b@email.com")).await.unwrap();
        repo.create(new_user("Alice", "a2@email.com")).await.unwrap();

        let (page, total) = repo.page(PageWindow { num_users: 3, skip: 0 }).await.unwrap();
        assert_eq!(total, 4);
        let emails: Vec<_> = page.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["a1@email.com", "a2@email.com", "b@email.com"]);

        let (page, _) = repo.page(PageWindow { num_users: 10, skip: 3 }).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Carol");
    }

    #[tokio::test]
    async fn test_delete_cascades_to_addresses() {
        let repo = InMemoryUserRepository::new();
        let mut input = new_user("User Name", "name@email.com");
        input.addresses = vec![new_address("Avenida Paulista"), new_address("Avenida da Liberdade")];
        let user = repo.create(input).await.unwrap();
        let extra = repo.add_address(user.id, new_address("Rua Augusta")).await.unwrap();

        let owned = repo.addresses_for_users(&[user.id]).await.unwrap();
        let ids: Vec<i32> = owned[&user.id].iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, extra.id]);

        assert!(repo.delete(user.id).await.unwrap());
        for id in ids {
            assert!(repo.find_address(id).await.unwrap().is_none());
        }
        assert!(!repo.delete(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_address_requires_owner() {
        let repo = InMemoryUserRepository::new();
        let result = repo.add_address(42, new_address("Rua Augusta")).await;
        assert!(matches!(result, Err(StoreError::ForeignKeyViolation(_))));
    }
}
