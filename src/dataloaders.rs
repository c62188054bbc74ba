//! DataLoader utilities for batch loading
//!
//! Loads `User.addresses` for a whole page at once instead of once per user.
//! A loader lives for one request, so its cache never outlives it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::entity::address;
use crate::repository::UserRepository;

/// Fetches many values with one backend call
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
{
    /// Keys missing from the returned map have no value
    async fn load_batch(&self, keys: &[K]) -> crate::Result<HashMap<K, V>>;
}

/// Per-request cache in front of a [`BatchLoader`]
pub struct DataLoader<K, V, L> {
    loader: L,
    cache: Mutex<HashMap<K, V>>,
}

impl<K, V, L> DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
    L: BatchLoader<K, V>,
{
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn load(&self, key: K) -> crate::Result<Option<V>> {
        let mut found = self.load_many(vec![key.clone()]).await?;
        Ok(found.remove(&key))
    }

    /// Serve cached keys, fetch the rest in one batch
    pub async fn load_many(&self, keys: Vec<K>) -> crate::Result<HashMap<K, V>> {
        // held across the fetch: concurrent loads in one request queue up on purpose
        let mut cache = self.cache.lock().await;

        let (cached, missing): (Vec<K>, Vec<K>) = keys.into_iter().partition(|k| cache.contains_key(k));
        let mut result: HashMap<K, V> = cached
            .into_iter()
            .filter_map(|k| cache.get(&k).cloned().map(|v| (k, v)))
            .collect();

        if !missing.is_empty() {
            for (key, value) in self.loader.load_batch(&missing).await? {
                cache.insert(key.clone(), value.clone());
                result.insert(key, value);
            }
        }

        Ok(result)
    }

    /// Drop a cached value so the next load refetches it
    pub async fn clear(&self, key: &K) {
        self.cache.lock().await.remove(key);
    }
}

/// Addresses of a user, keyed by user id
pub struct UserAddresses {
    repository: Arc<dyn UserRepository>,
}

#[async_trait]
impl BatchLoader<i32, Vec<address::Model>> for UserAddresses {
    async fn load_batch(&self, keys: &[i32]) -> crate::Result<HashMap<i32, Vec<address::Model>>> {
        let mut found = self.repository.addresses_for_users(keys).await?;

        // users without addresses are cached as empty
        for key in keys {
            found.entry(*key).or_default();
        }

        Ok(found)
    }
}

pub type AddressLoader = DataLoader<i32, Vec<address::Model>, UserAddresses>;

impl AddressLoader {
    pub fn for_repository(repository: Arc<dyn UserRepository>) -> Self {
        DataLoader::new(UserAddresses { repository })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{new_address, new_user, CountingRepository};
    use crate::ApiError;

    struct Unavailable;

    #[async_trait]
    impl BatchLoader<i32, Vec<address::Model>> for Unavailable {
        async fn load_batch(&self, _keys: &[i32]) -> crate::Result<HashMap<i32, Vec<address::Model>>> {
            Err(ApiError::internal("backend unavailable"))
        }
    }

    #[tokio::test]
    async fn test_address_loader_batches_and_caches() {
        let repository = Arc::new(CountingRepository::new());
        let mut input = new_user("User Name", "name@email.com");
        input.addresses = vec![new_address("Avenida Paulista"), new_address("Rua Augusta")];
        let owner = repository.create(input).await.unwrap();
        let other = repository.create(new_user("Other", "other@email.com")).await.unwrap();
        let before = repository.calls();

        let loader = AddressLoader::for_repository(repository.clone());
        let loaded = loader.load_many(vec![owner.id, other.id]).await.unwrap();
        assert_eq!(loaded[&owner.id].len(), 2);
        assert!(loaded[&other.id].is_empty());
        assert_eq!(repository.calls(), before + 1);

        let cached = loader.load(other.id).await.unwrap();
        assert_eq!(cached, Some(Vec::new()));
        assert_eq!(repository.calls(), before + 1);
    }

    #[tokio::test]
    async fn test_address_loader_fetches_only_missing_keys() {
        let repository = Arc::new(CountingRepository::new());
        let owner = repository.create(new_user("User Name", "name@email.com")).await.unwrap();
        repository.add_address(owner.id, new_address("Avenida Paulista")).await.unwrap();
        let before = repository.calls();

        let loader = AddressLoader::for_repository(repository.clone());
        let first = loader.load(owner.id).await.unwrap().unwrap();
        assert_eq!(first[0].street, "Avenida Paulista");

        // unknown user ids come back empty rather than absent
        let loaded = loader.load_many(vec![owner.id, 99]).await.unwrap();
        assert_eq!(loaded[&owner.id], first);
        assert!(loaded[&99].is_empty());
        assert_eq!(repository.calls(), before + 2);
    }

    #[tokio::test]
    async fn test_cleared_key_is_refetched() {
        let repository = Arc::new(CountingRepository::new());
        let owner = repository.create(new_user("User Name", "name@email.com")).await.unwrap();

        let loader = AddressLoader::for_repository(repository.clone());
        assert_eq!(loader.load(owner.id).await.unwrap(), Some(Vec::new()));

        repository.add_address(owner.id, new_address("Rua Augusta")).await.unwrap();
        assert_eq!(loader.load(owner.id).await.unwrap(), Some(Vec::new()));

        loader.clear(&owner.id).await;
        let reloaded = loader.load(owner.id).await.unwrap().unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].street, "Rua Augusta");
    }

    #[tokio::test]
    async fn test_loader_propagates_errors() {
        let loader: DataLoader<i32, Vec<address::Model>, _> = DataLoader::new(Unavailable);
        let err = loader.load(1).await.unwrap_err();
        assert_eq!(err.code(), 500);
    }
}
