use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::models::activity::{ActivityId, EventId};
use crate::db::models::passport::{Passport, PassportActivity, PassportId};
use crate::db::models::proof::ProofId;
use crate::db::models::user::UserId;
use crate::db::repositories::{PassportRepository, StoreErr, StoreResult};

const PASSPORT_FIELDS: &str = r#"
    id,
    user_id,
    event_id,
    progress,
    created_at
"#;

const PASSPORT_ACTIVITY_FIELDS: &str = r#"
    id,
    passport_id,
    activity_id,
    status,
    requires_proof,
    proof_id,
    completed_at
"#;

#[derive(Debug, Clone)]
pub struct PgPassportRepository {
    pool: PgPool,
}

impl PgPassportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, table: &'static str, id: &uuid::Uuid) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }
}

#[async_trait]
impl PassportRepository for PgPassportRepository {
    #[instrument(skip(self))]
    async fn register(&self, user_id: &UserId, event_id: &EventId) -> StoreResult<Passport> {
        if !self.exists("app_user", &user_id.0).await? {
            return Err(StoreErr::NotFound("user"));
        }
        if !self.exists("event", &event_id.0).await? {
            return Err(StoreErr::NotFound("event"));
        }

        sqlx::query(
            r#"
            INSERT INTO passport (id, user_id, event_id, progress, created_at)
            VALUES ($1, $2, $3, 0, NOW())
            ON CONFLICT (user_id, event_id)
            DO NOTHING
            "#,
        )
        .bind(PassportId::new())
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        let passport = sqlx::query_as::<_, Passport>(&format!(
            "SELECT {PASSPORT_FIELDS} FROM passport WHERE user_id = $1 AND event_id = $2"
        ))
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        let seeded = self.sync_missing_activities(&passport.id).await?;
        tracing::debug!(passport_id = %passport.id, seeded, "passport registered");

        Ok(passport)
    }

    #[instrument(skip(self))]
    async fn passport(&self, id: &PassportId) -> StoreResult<Passport> {
        sqlx::query_as::<_, Passport>(&format!(
            "SELECT {PASSPORT_FIELDS} FROM passport WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreErr::NotFound("passport"))
    }

    #[instrument(skip(self))]
    async fn activities(&self, id: &PassportId) -> StoreResult<Vec<PassportActivity>> {
        Ok(sqlx::query_as::<_, PassportActivity>(&format!(
            "SELECT {PASSPORT_ACTIVITY_FIELDS} FROM passport_activity WHERE passport_id = $1"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    #[instrument(skip(self))]
    async fn sync_missing_activities(&self, id: &PassportId) -> StoreResult<u64> {
        if !self.exists("passport", &id.0).await? {
            return Err(StoreErr::NotFound("passport"));
        }

        // requires_proof is snapshotted from the activity definition as it
        // stands right now; later edits do not touch seeded rows
        let result = sqlx::query(
            r#"
            INSERT INTO passport_activity (id, passport_id, activity_id, status, requires_proof)
            SELECT gen_random_uuid(), $1, a.id, 'pending', a.requires_proof
            FROM activity a
            WHERE a.event_id = (SELECT event_id FROM passport WHERE id = $1)
            ON CONFLICT (passport_id, activity_id)
            DO NOTHING
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn mark_activity_completed(
        &self,
        passport_id: &PassportId,
        activity_id: &ActivityId,
        proof_id: &ProofId,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE passport_activity
            SET status = 'completed',
                proof_id = $3,
                completed_at = NOW()
            WHERE passport_id = $1 AND activity_id = $2 AND status = 'pending'
            "#,
        )
        .bind(passport_id)
        .bind(activity_id)
        .bind(proof_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // either the row was never seeded (activity added after passport
            // creation without a sync) or it is already completed; the former
            // fails loudly, the latter is an idempotent retry
            let status = sqlx::query_scalar::<_, String>(
                "SELECT status FROM passport_activity WHERE passport_id = $1 AND activity_id = $2",
            )
            .bind(passport_id)
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await?;

            match status.as_deref() {
                Some("completed") => {
                    tracing::debug!(
                        passport_id = %passport_id,
                        activity_id = %activity_id,
                        "activity already completed, treating as reconciled"
                    );
                }
                _ => return Err(StoreErr::NotFound("passport activity")),
            }
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recompute_progress(&self, id: &PassportId) -> StoreResult<i32> {
        // full recomputation from the rows; never patched incrementally
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE passport
            SET progress = (
                SELECT COALESCE(
                    ROUND(
                        100.0 * COUNT(*) FILTER (WHERE status = 'completed')
                            / NULLIF(COUNT(*), 0)
                    )::INT,
                    0
                )
                FROM passport_activity
                WHERE passport_id = $1
            )
            WHERE id = $1
            RETURNING progress
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreErr::NotFound("passport"))
    }
}
