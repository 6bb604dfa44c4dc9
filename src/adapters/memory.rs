use crate::domain::model::EntityInterface;
use crate::domain::ports::EntityStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct Entry<T> {
    current: T,
    history: Vec<T>,
}

/// 記憶體內的實體儲存，保留每一個版本
#[derive(Debug)]
pub struct InMemoryEntityStore<T> {
    entries: RwLock<HashMap<Uuid, Entry<T>>>,
}

impl<T> InMemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for InMemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: EntityInterface + 'static> EntityStore<T> for InMemoryEntityStore<T> {
    async fn get(&self, id: Uuid) -> Result<Option<T>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&id).map(|entry| entry.current.clone()))
    }

    async fn get_by_fqn(&self, fqn: &str) -> Result<Option<T>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .find(|entry| entry.current.fully_qualified_name() == fqn)
            .map(|entry| entry.current.clone()))
    }

    async fn list(&self) -> Result<Vec<T>> {
        let entries = self.entries.read().await;
        Ok(entries.values().map(|entry| entry.current.clone()).collect())
    }

    async fn put(&self, entity: T) -> Result<()> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&entity.id()) {
            Some(entry) => {
                // 同一版本覆蓋歷史中的最後一筆
                if entry.current.version() != entity.version() {
                    entry.history.push(entry.current.clone());
                }
                entry.current = entity;
            }
            None => {
                entries.insert(
                    entity.id(),
                    Entry {
                        current: entity,
                        history: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<Option<T>> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&id).map(|entry| entry.current))
    }

    async fn versions(&self, id: Uuid) -> Result<Vec<T>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&id)
            .map(|entry| {
                std::iter::once(entry.current.clone())
                    .chain(entry.history.iter().rev().cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}
