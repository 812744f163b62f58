//! Keyed record storage behind a swappable trait.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record already exists")]
    AlreadyExists,

    #[error("record not found")]
    NotFound,

    /// A writer panicked while holding the lock.
    #[error("repository lock poisoned")]
    Poisoned,
}

/// Key/value store for domain records.
///
/// `insert` refuses to overwrite and `update` refuses to create, so callers
/// cannot silently lose a record by mixing the two up.
pub trait Repository<K, V>: Send + Sync {
    fn insert(&self, key: K, value: V) -> Result<(), RepositoryError>;
    fn get(&self, key: &K) -> Result<Option<V>, RepositoryError>;
    fn update(&self, key: K, value: V) -> Result<(), RepositoryError>;
    fn remove(&self, key: &K) -> Result<Option<V>, RepositoryError>;
    /// All records, in no particular order.
    fn list(&self) -> Result<Vec<V>, RepositoryError>;
}

impl<K, V, R> Repository<K, V> for Arc<R>
where
    R: Repository<K, V> + ?Sized,
{
    fn insert(&self, key: K, value: V) -> Result<(), RepositoryError> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &K) -> Result<Option<V>, RepositoryError> {
        (**self).get(key)
    }

    fn update(&self, key: K, value: V) -> Result<(), RepositoryError> {
        (**self).update(key, value)
    }

    fn remove(&self, key: &K) -> Result<Option<V>, RepositoryError> {
        (**self).remove(key)
    }

    fn list(&self) -> Result<Vec<V>, RepositoryError> {
        (**self).list()
    }
}

/// In-memory store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRepository<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryRepository<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryRepository<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Repository<K, V> for InMemoryRepository<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn insert(&self, key: K, value: V) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        if map.contains_key(&key) {
            return Err(RepositoryError::AlreadyExists);
        }
        map.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> Result<Option<V>, RepositoryError> {
        let map = self.inner.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn update(&self, key: K, value: V) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        match map.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn remove(&self, key: &K) -> Result<Option<V>, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::Poisoned)?;
        Ok(map.remove(key))
    }

    fn list(&self) -> Result<Vec<V>, RepositoryError> {
        let map = self.inner.read().map_err(|_| RepositoryError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_does_not_overwrite_and_update_does_not_create() {
        let repo = InMemoryRepository::new();

        repo.insert(1u32, "a").unwrap();
        assert_eq!(repo.insert(1, "b"), Err(RepositoryError::AlreadyExists));
        assert_eq!(repo.update(2, "b"), Err(RepositoryError::NotFound));

        repo.update(1, "c").unwrap();
        assert_eq!(repo.get(&1).unwrap(), Some("c"));
    }

    #[test]
    fn remove_returns_the_record() {
        let repo = InMemoryRepository::new();
        repo.insert("k", 10u64).unwrap();

        assert_eq!(repo.remove(&"k").unwrap(), Some(10));
        assert_eq!(repo.remove(&"k").unwrap(), None);
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn shared_through_arc() {
        let repo = Arc::new(InMemoryRepository::new());
        let other = repo.clone();

        repo.insert(7u8, 'x').unwrap();
        assert_eq!(other.get(&7).unwrap(), Some('x'));
    }
}
