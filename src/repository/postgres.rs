//! PostgreSQL Entity Store: one `documents` table holding every collection as JSONB

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Pool, Postgres, Row, Transaction};

use super::store::{Collection, EntityStore, Precondition, StoredDocument, WriteOp};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn row_to_document(row: &sqlx::postgres::PgRow) -> StoredDocument {
        let revision: i64 = row.get("revision");
        StoredDocument {
            id: row.get("id"),
            revision: revision.max(0) as u64,
            body: row.get::<Value, _>("body"),
        }
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> AppResult<()> {
        match op {
            WriteOp::Put { collection, id, precondition, body } => {
                let affected = match precondition {
                    Precondition::Absent => sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, revision, body, updated_at)
                        VALUES ($1, $2, 1, $3, NOW())
                        ON CONFLICT (collection, id) DO NOTHING
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(&body)
                    .execute(&mut **tx)
                    .await?
                    .rows_affected(),
                    Precondition::Revision(expected) => sqlx::query(
                        r#"
                        UPDATE documents
                        SET body = $3, revision = revision + 1, updated_at = NOW()
                        WHERE collection = $1 AND id = $2 AND revision = $4
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(&body)
                    .bind(expected as i64)
                    .execute(&mut **tx)
                    .await?
                    .rows_affected(),
                    Precondition::Unconditional => sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, revision, body, updated_at)
                        VALUES ($1, $2, 1, $3, NOW())
                        ON CONFLICT (collection, id) DO UPDATE
                        SET body = EXCLUDED.body,
                            revision = documents.revision + 1,
                            updated_at = NOW()
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(&body)
                    .execute(&mut **tx)
                    .await?
                    .rows_affected(),
                };

                if affected == 0 {
                    return Err(AppError::Conflict(format!(
                        "{} {} changed since it was read",
                        collection, id
                    )));
                }
            }
            WriteOp::Append { collection, id, body, retain } => {
                let affected = sqlx::query(
                    r#"
                    INSERT INTO documents (collection, id, revision, body, updated_at)
                    VALUES ($1, $2, 1, $3, NOW())
                    ON CONFLICT (collection, id) DO NOTHING
                    "#,
                )
                .bind(collection.as_str())
                .bind(&id)
                .bind(&body)
                .execute(&mut **tx)
                .await?
                .rows_affected();

                if affected == 0 {
                    return Err(AppError::Conflict(format!("{} {} already exists", collection, id)));
                }

                if let Some(keep) = retain {
                    sqlx::query(
                        r#"
                        DELETE FROM documents
                        WHERE collection = $1
                          AND seq IN (
                              SELECT seq FROM documents
                              WHERE collection = $1
                              ORDER BY seq DESC
                              OFFSET $2
                          )
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(keep as i64)
                    .execute(&mut **tx)
                    .await?;
                }
            }
            WriteOp::Delete { collection, id, revision } => {
                let affected = sqlx::query(
                    "DELETE FROM documents WHERE collection = $1 AND id = $2 AND revision = $3",
                )
                .bind(collection.as_str())
                .bind(&id)
                .bind(revision as i64)
                .execute(&mut **tx)
                .await?
                .rows_affected();

                if affected == 0 {
                    return Err(AppError::Conflict(format!(
                        "{} {} changed since it was read",
                        collection, id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Option<StoredDocument>> {
        let row = sqlx::query(
            "SELECT id, revision, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_document))
    }

    async fn list(&self, collection: Collection) -> AppResult<Vec<StoredDocument>> {
        let rows = sqlx::query(
            "SELECT id, revision, body FROM documents WHERE collection = $1 ORDER BY seq",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_document).collect())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for op in ops {
            // Dropping the transaction on error rolls it back
            Self::apply(&mut tx, op).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
