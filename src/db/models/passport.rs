use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::activity::{ActivityId, EventId};
use crate::db::models::proof::ProofId;
use crate::db::models::user::UserId;
use crate::uuid_ident;

uuid_ident!(PassportId);
uuid_ident!(PassportActivityId);

/// Base passport table model. `progress` is derived and recomputed wholesale
/// after every completion-state change; it is never patched incrementally.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Passport {
    pub id: PassportId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub progress: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Completed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Completed => "completed",
        }
    }
}

impl TryFrom<String> for ActivityStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ActivityStatus::Pending),
            "completed" => Ok(ActivityStatus::Completed),
            other => Err(format!("unknown passport activity status '{other}'")),
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One user's relationship to one activity within one passport.
///
/// `requires_proof` is copied from the activity definition at seed time so
/// later activity edits do not retroactively change existing passports.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PassportActivity {
    pub id: PassportActivityId,
    pub passport_id: PassportId,
    pub activity_id: ActivityId,
    #[sqlx(try_from = "String")]
    pub status: ActivityStatus,
    pub requires_proof: bool,
    pub proof_id: Option<ProofId>,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassportView {
    pub passport: Passport,
    pub activities: Vec<PassportActivity>,
}
