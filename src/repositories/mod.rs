pub(crate) mod memory;
pub(crate) mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::models::{Attempt, Exam, GradePublication};

pub(crate) use memory::MemoryRepository;
pub(crate) use postgres::PgRepository;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{kind} {id} was modified concurrently")]
    RevisionConflict { kind: &'static str, id: String },
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// A document persisted under `KIND` and addressed by `id()`.
///
/// `revision` counts successful saves. A save only lands when the stored revision
/// still equals the one the entity was loaded with.
pub(crate) trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &str;

    fn revision(&self) -> i64;

    fn set_revision(&mut self, revision: i64);
}

macro_rules! impl_entity {
    ($ty:ty, $kind:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn revision(&self) -> i64 {
                self.revision
            }

            fn set_revision(&mut self, revision: i64) {
                self.revision = revision;
            }
        }
    };
}

impl_entity!(Exam, "exam");
impl_entity!(Attempt, "attempt");
impl_entity!(GradePublication, "grade_publication");

/// The document as it should be written by the next save of `entity`.
fn next_revision<T: Entity>(entity: &T) -> T {
    let mut next = entity.clone();
    next.set_revision(entity.revision() + 1);
    next
}

pub(crate) type Predicate<'a, T> = &'a (dyn Fn(&T) -> bool + Send + Sync);

#[async_trait]
pub(crate) trait Repository<T: Entity>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<T>>;

    /// Inserts or replaces, then bumps `entity`'s revision.
    ///
    /// Fails with [`StoreError::RevisionConflict`] when another writer saved the
    /// document after `entity` was loaded.
    async fn save(&self, entity: &mut T) -> StoreResult<()>;

    async fn find_all_matching(&self, predicate: Predicate<'_, T>) -> StoreResult<Vec<T>>;

    async fn delete(&self, id: &str) -> StoreResult<bool>;
}

/// Every repository the coordinator needs, behind one cheap handle.
#[derive(Clone)]
pub(crate) struct Store {
    pub(crate) exams: Arc<dyn Repository<Exam>>,
    pub(crate) attempts: Arc<dyn Repository<Attempt>>,
    pub(crate) publications: Arc<dyn Repository<GradePublication>>,
}

impl Store {
    pub(crate) fn in_memory() -> Self {
        Self {
            exams: Arc::new(MemoryRepository::<Exam>::default()),
            attempts: Arc::new(MemoryRepository::<Attempt>::default()),
            publications: Arc::new(MemoryRepository::<GradePublication>::default()),
        }
    }

    pub(crate) fn postgres(pool: PgPool) -> Self {
        Self {
            exams: Arc::new(PgRepository::<Exam>::new(pool.clone())),
            attempts: Arc::new(PgRepository::<Attempt>::new(pool.clone())),
            publications: Arc::new(PgRepository::<GradePublication>::new(pool)),
        }
    }
}
