use chrono::NaiveDateTime;
use serde::Serialize;

use crate::uuid_ident;

uuid_ident!(ActivityId);
uuid_ident!(EventId);

/// Sponsor-owned unit of work within an event. The reward count and the
/// `requires_proof` flag are snapshotted into passport rows and proofs when
/// those records are created.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Activity {
    pub id: ActivityId,
    pub event_id: EventId,
    pub sponsor_name: String,
    pub title: String,
    pub token_reward: i64,
    pub requires_proof: bool,
    pub created_at: NaiveDateTime,
}
