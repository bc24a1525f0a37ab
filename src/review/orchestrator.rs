use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::claim::ClaimGateway;
use crate::db::models::proof::{ProofId, ProofStatus};
use crate::db::repositories::{PassportRepository, ProofRepository, StoreErr};
use crate::review::{ReviewErr, ReviewResult};

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub transaction_hash: Option<String>,
    pub tokens_awarded: i64,
    pub progress: i32,
}

/// Drives admin decisions over submitted proofs and reconciles the proof
/// store and passport ledger with the outcome of the on-chain claim.
///
/// Partial-failure policy: the claim runs before any local mutation. A failed
/// claim leaves the proof `pending` and retryable; a successful claim is
/// followed by the proof transition, the passport activity completion and the
/// progress recomputation, in that order, so the only reconcilable gap is
/// "paid but still pending" rather than the unrecoverable "approved but
/// unpaid".
pub struct Orchestrator<P, L> {
    proofs: P,
    passports: L,
    gateway: Arc<dyn ClaimGateway>,

    /// The backend signing wallet is a serially-nonced resource shared by
    /// every approval; claims are dispatched one at a time. Holding the lock
    /// across the whole check-claim-commit sequence also means two racing
    /// approvals of one proof cannot both observe `pending`.
    wallet_lock: Mutex<()>,
}

impl<P, L> Orchestrator<P, L>
where
    P: ProofRepository,
    L: PassportRepository,
{
    pub fn new(proofs: P, passports: L, gateway: Arc<dyn ClaimGateway>) -> Self {
        Self {
            proofs,
            passports,
            gateway,
            wallet_lock: Mutex::new(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        proof_id: &ProofId,
        validated_by: &str,
    ) -> ReviewResult<ApprovalOutcome> {
        let _wallet = self.wallet_lock.lock().await;

        let ctx = self.proofs.load_for_review(proof_id).await?;
        if ctx.proof.status != ProofStatus::Pending {
            return Err(StoreErr::InvalidState(ctx.proof.status).into());
        }

        let receiver = ctx.wallet_address.ok_or_else(|| {
            StoreErr::InvalidInput("user has no connected wallet address".to_string())
        })?;

        // the completion row must exist before any tokens move; an activity
        // added after registration stays unapprovable until a sync seeds it
        let tracked = self
            .passports
            .activities(&ctx.proof.passport_id)
            .await?
            .iter()
            .any(|pa| pa.activity_id == ctx.proof.activity_id);
        if !tracked {
            return Err(StoreErr::NotFound("passport activity").into());
        }

        // side effect first: a claim failure must leave the proof pending and
        // retryable, never an approved-but-unpaid record
        let receipt = self.gateway.claim(&receiver, ctx.token_reward).await?;

        self.proofs
            .approve(
                proof_id,
                validated_by,
                ctx.token_reward,
                receipt.transaction_hash.clone(),
            )
            .await?;

        self.passports
            .mark_activity_completed(&ctx.proof.passport_id, &ctx.proof.activity_id, proof_id)
            .await?;

        let progress = self
            .passports
            .recompute_progress(&ctx.proof.passport_id)
            .await?;

        tracing::info!(
            proof_id = %proof_id,
            validated_by,
            tokens = ctx.token_reward,
            progress,
            hash = ?receipt.transaction_hash,
            "proof approved"
        );

        Ok(ApprovalOutcome {
            transaction_hash: receipt.transaction_hash,
            tokens_awarded: ctx.token_reward,
            progress,
        })
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        proof_id: &ProofId,
        validated_by: &str,
        reason: &str,
    ) -> ReviewResult<()> {
        if reason.trim().is_empty() {
            return Err(StoreErr::InvalidInput(
                "a rejection requires a human-readable reason".to_string(),
            )
            .into());
        }

        let proof = self.proofs.get(proof_id).await?;
        if proof.status != ProofStatus::Pending {
            return Err(StoreErr::InvalidState(proof.status).into());
        }

        self.proofs.reject(proof_id, validated_by, reason).await?;
        tracing::info!(proof_id = %proof_id, validated_by, reason, "proof rejected");

        Ok(())
    }
}
