use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::PgPool;

use super::{next_revision, Entity, Predicate, Repository, StoreError, StoreResult};
use crate::core::time::primitive_now_utc;

/// Stores each entity as a jsonb document in the shared `documents` table.
pub(crate) struct PgRepository<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PgRepository<T> {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool, _entity: PhantomData }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for PgRepository<T> {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        let body = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT body FROM documents WHERE kind = $1 AND id = $2",
        )
        .bind(T::KIND)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        body.map(serde_json::from_value).transpose().map_err(Into::into)
    }

    async fn save(&self, entity: &mut T) -> StoreResult<()> {
        let next = next_revision(entity);
        let body = serde_json::to_value(&next)?;

        // The conditional upsert doubles as a compare-and-set across processes.
        let result = sqlx::query(
            "INSERT INTO documents (kind, id, body, revision, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (kind, id) DO UPDATE
             SET body = EXCLUDED.body,
                 revision = EXCLUDED.revision,
                 updated_at = EXCLUDED.updated_at
             WHERE documents.revision = $6",
        )
        .bind(T::KIND)
        .bind(next.id())
        .bind(body)
        .bind(next.revision())
        .bind(primitive_now_utc())
        .bind(entity.revision())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RevisionConflict { kind: T::KIND, id: next.id().to_string() });
        }

        *entity = next;
        Ok(())
    }

    async fn find_all_matching(&self, predicate: Predicate<'_, T>) -> StoreResult<Vec<T>> {
        let rows = sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT body FROM documents WHERE kind = $1 ORDER BY updated_at",
        )
        .bind(T::KIND)
        .fetch_all(&self.pool)
        .await?;

        let mut matching = Vec::new();
        for body in rows {
            let entity: T = serde_json::from_value(body)?;
            if predicate(&entity) {
                matching.push(entity);
            }
        }
        Ok(matching)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE kind = $1 AND id = $2")
            .bind(T::KIND)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
