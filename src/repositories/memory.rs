use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{next_revision, Entity, Predicate, Repository, StoreError, StoreResult};

pub(crate) struct MemoryRepository<T> {
    documents: RwLock<HashMap<String, T>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self { documents: RwLock::new(HashMap::new()), _entity: PhantomData }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn save(&self, entity: &mut T) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        if let Some(stored) = documents.get(entity.id()) {
            if stored.revision() != entity.revision() {
                return Err(StoreError::RevisionConflict {
                    kind: T::KIND,
                    id: entity.id().to_string(),
                });
            }
        }

        let next = next_revision(entity);
        documents.insert(next.id().to_string(), next.clone());
        *entity = next;
        Ok(())
    }

    async fn find_all_matching(&self, predicate: Predicate<'_, T>) -> StoreResult<Vec<T>> {
        let documents = self.documents.read().await;
        Ok(documents.values().filter(|entity| predicate(*entity)).cloned().collect())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        Ok(self.documents.write().await.remove(id).is_some())
    }
}
