use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::activity::{ActivityId, EventId};
use crate::db::models::passport::{Passport, PassportActivity, PassportId};
use crate::db::models::proof::{
    NewProof, Proof, ProofId, ProofReceipt, ProofStatus, ReviewQueue,
};
use crate::db::models::user::UserId;

pub mod passport;
pub mod proof;

#[cfg(test)]
pub mod mem;

/// Everything the orchestrator needs to review one proof, loaded in a single
/// round trip: the proof itself, the activity's snapshot reward and the
/// submitter's wallet address.
#[derive(Debug, Clone)]
pub struct ReviewContext {
    pub proof: Proof,
    pub token_reward: i64,
    pub wallet_address: Option<String>,
}

/// Proof submissions and their pending/approved/rejected lifecycle.
///
/// The `approve`/`reject` transitions are compare-and-set against
/// `status = 'pending'` so a concurrent writer loses with `InvalidState`
/// instead of silently double-transitioning.
#[async_trait]
pub trait ProofRepository: Send + Sync {
    async fn submit(&self, submission: &NewProof) -> StoreResult<ProofReceipt>;

    async fn get(&self, id: &ProofId) -> StoreResult<Proof>;

    async fn load_for_review(&self, id: &ProofId) -> StoreResult<ReviewContext>;

    async fn queue(&self, status: Option<ProofStatus>) -> StoreResult<ReviewQueue>;

    async fn approve(
        &self,
        id: &ProofId,
        validated_by: &str,
        tokens_awarded: i64,
        transaction_hash: Option<String>,
    ) -> StoreResult<()>;

    async fn reject(&self, id: &ProofId, validated_by: &str, reason: &str) -> StoreResult<()>;
}

/// Passports, their per-activity completion rows and the derived progress
/// percentage.
#[async_trait]
pub trait PassportRepository: Send + Sync {
    /// Insert-if-absent passport for the (user, event) pair, then seed any
    /// missing activity rows. Returns the existing passport when the user is
    /// already registered.
    async fn register(&self, user_id: &UserId, event_id: &EventId) -> StoreResult<Passport>;

    async fn passport(&self, id: &PassportId) -> StoreResult<Passport>;

    async fn activities(&self, id: &PassportId) -> StoreResult<Vec<PassportActivity>>;

    /// Inserts a pending row for every event activity the passport does not
    /// track yet, copying `requires_proof` from the current activity
    /// definition. Idempotent. Returns the number of rows seeded.
    async fn sync_missing_activities(&self, id: &PassportId) -> StoreResult<u64>;

    /// Transitions the (passport, activity) row `pending -> completed` and
    /// links the accepted proof. A missing row fails loudly with `NotFound`;
    /// an already-completed row is a no-op so a post-claim retry can
    /// reconcile.
    async fn mark_activity_completed(
        &self,
        passport_id: &PassportId,
        activity_id: &ActivityId,
        proof_id: &ProofId,
    ) -> StoreResult<()>;

    /// Recomputes `round(100 * completed / total)` (0 when the event has no
    /// activities) from the rows and persists it. Returns the new value.
    async fn recompute_progress(&self, id: &PassportId) -> StoreResult<i32>;
}

pub type StoreResult<T> = core::result::Result<T, StoreErr>;

#[derive(Debug, Error)]
pub enum StoreErr {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("proof is already {0}")]
    InvalidState(ProofStatus),

    #[error("{0}")]
    InvalidInput(String),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
