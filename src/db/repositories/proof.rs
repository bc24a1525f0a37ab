use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::models::proof::{
    NewProof, Proof, ProofId, ProofReceipt, ProofStatus, ProofSummary, ReviewQueue, StatusCounts,
};
use crate::db::repositories::{ProofRepository, ReviewContext, StoreErr, StoreResult};

const PROOF_FIELDS: &str = r#"
    id,
    user_id,
    activity_id,
    passport_id,
    kind,
    text_proof,
    image_url,
    status,
    rejection_reason,
    validated_by,
    validated_at,
    tokens_awarded,
    transaction_hash,
    created_at,
    updated_at
"#;

#[derive(Debug, Clone)]
pub struct PgProofRepository {
    pool: PgPool,
}

impl PgProofRepository {
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

    async fn current_status(&self, id: &ProofId) -> StoreResult<ProofStatus> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM proof WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreErr::NotFound("proof"))?;

        ProofStatus::try_from(status).map_err(StoreErr::InvalidInput)
    }
}

#[async_trait]
impl ProofRepository for PgProofRepository {
    #[instrument(skip(self, submission))]
    async fn submit(&self, submission: &NewProof) -> StoreResult<ProofReceipt> {
        submission.validate()?;

        // surface a dangling reference as not-found rather than letting the
        // insert bounce off a foreign key
        if !self.exists("app_user", &submission.user_id.0).await? {
            return Err(StoreErr::NotFound("user"));
        }
        if !self.exists("activity", &submission.activity_id.0).await? {
            return Err(StoreErr::NotFound("activity"));
        }
        if !self.exists("passport", &submission.passport_id.0).await? {
            return Err(StoreErr::NotFound("passport"));
        }

        // at most one proof row per (passport, activity); an existing row
        // decides between conflict and in-place resubmission
        let existing = sqlx::query_as::<_, (ProofId, String)>(
            "SELECT id, status FROM proof WHERE passport_id = $1 AND activity_id = $2",
        )
        .bind(&submission.passport_id)
        .bind(&submission.activity_id)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some((_, status)) if status == ProofStatus::Approved.as_str() => {
                Err(StoreErr::Conflict(
                    "activity already completed for this passport".to_string(),
                ))
            }
            Some((_, status)) if status == ProofStatus::Pending.as_str() => {
                Err(StoreErr::Conflict(
                    "a proof for this activity is already under review".to_string(),
                ))
            }
            Some((id, _)) => {
                // rejected: reuse the row, reset to pending, clear the
                // previous review outcome
                sqlx::query(
                    r#"
                    UPDATE proof
                    SET kind = $2,
                        text_proof = $3,
                        image_url = $4,
                        status = 'pending',
                        rejection_reason = NULL,
                        validated_by = NULL,
                        validated_at = NULL,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(&id)
                .bind(submission.kind.as_str())
                .bind(&submission.text_proof)
                .bind(&submission.image_url)
                .execute(&self.pool)
                .await?;

                tracing::debug!(proof_id = %id, "resubmitted rejected proof");
                Ok(ProofReceipt {
                    id,
                    status: ProofStatus::Pending,
                })
            }
            None => {
                let id = ProofId::new();
                sqlx::query(
                    r#"
                    INSERT INTO proof (
                        id,
                        user_id,
                        activity_id,
                        passport_id,
                        kind,
                        text_proof,
                        image_url,
                        status,
                        created_at,
                        updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', NOW(), NOW())
                    "#,
                )
                .bind(&id)
                .bind(&submission.user_id)
                .bind(&submission.activity_id)
                .bind(&submission.passport_id)
                .bind(submission.kind.as_str())
                .bind(&submission.text_proof)
                .bind(&submission.image_url)
                .execute(&self.pool)
                .await?;

                tracing::debug!(proof_id = %id, "created pending proof");
                Ok(ProofReceipt {
                    id,
                    status: ProofStatus::Pending,
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &ProofId) -> StoreResult<Proof> {
        sqlx::query_as::<_, Proof>(&format!(
            "SELECT {PROOF_FIELDS} FROM proof WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreErr::NotFound("proof"))
    }

    #[instrument(skip(self))]
    async fn load_for_review(&self, id: &ProofId) -> StoreResult<ReviewContext> {
        #[derive(sqlx::FromRow)]
        struct ReviewRow {
            #[sqlx(flatten)]
            proof: Proof,
            token_reward: i64,
            wallet_address: Option<String>,
        }

        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT
                p.id,
                p.user_id,
                p.activity_id,
                p.passport_id,
                p.kind,
                p.text_proof,
                p.image_url,
                p.status,
                p.rejection_reason,
                p.validated_by,
                p.validated_at,
                p.tokens_awarded,
                p.transaction_hash,
                p.created_at,
                p.updated_at,
                a.token_reward,
                u.wallet_address
            FROM proof p
            JOIN activity a ON a.id = p.activity_id
            JOIN app_user u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreErr::NotFound("proof"))?;

        Ok(ReviewContext {
            proof: row.proof,
            token_reward: row.token_reward,
            wallet_address: row.wallet_address,
        })
    }

    #[instrument(skip(self))]
    async fn queue(&self, status: Option<ProofStatus>) -> StoreResult<ReviewQueue> {
        let base = r#"
            SELECT
                p.id,
                p.status,
                p.kind,
                p.text_proof,
                p.image_url,
                p.rejection_reason,
                p.tokens_awarded,
                p.transaction_hash,
                p.created_at,
                u.login AS user_login,
                u.wallet_address,
                a.title AS activity_title,
                a.sponsor_name,
                a.token_reward,
                e.name AS event_name
            FROM proof p
            JOIN app_user u ON u.id = p.user_id
            JOIN activity a ON a.id = p.activity_id
            JOIN event e ON e.id = a.event_id
        "#;

        let proofs = match status {
            Some(status) => {
                sqlx::query_as::<_, ProofSummary>(&format!(
                    "{base} WHERE p.status = $1 ORDER BY p.created_at ASC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ProofSummary>(&format!("{base} ORDER BY p.created_at ASC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM proof GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => counts.pending = count,
                "approved" => counts.approved = count,
                "rejected" => counts.rejected = count,
                other => tracing::warn!(status = other, "unexpected proof status in counts"),
            }
        }

        Ok(ReviewQueue { proofs, counts })
    }

    #[instrument(skip(self, transaction_hash))]
    async fn approve(
        &self,
        id: &ProofId,
        validated_by: &str,
        tokens_awarded: i64,
        transaction_hash: Option<String>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE proof
            SET status = 'approved',
                validated_by = $2,
                validated_at = NOW(),
                tokens_awarded = $3,
                transaction_hash = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(validated_by)
        .bind(tokens_awarded)
        .bind(&transaction_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreErr::InvalidState(self.current_status(id).await?));
        }

        Ok(())
    }

    #[instrument(skip(self, reason))]
    async fn reject(&self, id: &ProofId, validated_by: &str, reason: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE proof
            SET status = 'rejected',
                rejection_reason = $3,
                validated_by = $2,
                validated_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(validated_by)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreErr::InvalidState(self.current_status(id).await?));
        }

        Ok(())
    }
}
