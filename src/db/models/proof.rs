use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::activity::ActivityId;
use crate::db::models::passport::PassportId;
use crate::db::models::user::UserId;
use crate::db::repositories::StoreErr;
use crate::uuid_ident;

uuid_ident!(ProofId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Approved => "approved",
            ProofStatus::Rejected => "rejected",
        }
    }
}

impl TryFrom<String> for ProofStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ProofStatus::Pending),
            "approved" => Ok(ProofStatus::Approved),
            "rejected" => Ok(ProofStatus::Rejected),
            other => Err(format!("unknown proof status '{other}'")),
        }
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
    Text,
    Image,
    Both,
}

impl ProofKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofKind::Text => "text",
            ProofKind::Image => "image",
            ProofKind::Both => "both",
        }
    }
}

impl TryFrom<String> for ProofKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "text" => Ok(ProofKind::Text),
            "image" => Ok(ProofKind::Image),
            "both" => Ok(ProofKind::Both),
            other => Err(format!("unknown proof kind '{other}'")),
        }
    }
}

impl fmt::Display for ProofKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Base proof table model
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Proof {
    pub id: ProofId,
    pub user_id: UserId,
    pub activity_id: ActivityId,
    pub passport_id: PassportId,
    #[sqlx(try_from = "String")]
    pub kind: ProofKind,
    pub text_proof: Option<String>,
    pub image_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProofStatus,
    pub rejection_reason: Option<String>,
    pub validated_by: Option<String>,
    pub validated_at: Option<NaiveDateTime>,
    pub tokens_awarded: Option<i64>,
    pub transaction_hash: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A user's submission payload, validated before it touches storage.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProof {
    pub user_id: UserId,
    pub activity_id: ActivityId,
    pub passport_id: PassportId,
    pub kind: ProofKind,
    #[serde(default)]
    pub text_proof: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewProof {
    /// Checks that the declared kind matches the supplied content. `both`
    /// requires at least one of the two, not necessarily both.
    pub fn validate(&self) -> Result<(), StoreErr> {
        let has_text = self
            .text_proof
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        let has_image = self
            .image_url
            .as_deref()
            .is_some_and(|i| !i.trim().is_empty());

        match self.kind {
            ProofKind::Text if !has_text => Err(StoreErr::InvalidInput(
                "proof kind 'text' requires text content".to_string(),
            )),
            ProofKind::Image if !has_image => Err(StoreErr::InvalidInput(
                "proof kind 'image' requires an image reference".to_string(),
            )),
            ProofKind::Both if !has_text && !has_image => Err(StoreErr::InvalidInput(
                "proof kind 'both' requires text content or an image reference".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProofReceipt {
    pub id: ProofId,
    pub status: ProofStatus,
}

/// Review-queue entry: a proof joined with the activity/user/event summaries
/// an admin needs to make a call without further lookups.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProofSummary {
    pub id: ProofId,
    #[sqlx(try_from = "String")]
    pub status: ProofStatus,
    #[sqlx(try_from = "String")]
    pub kind: ProofKind,
    pub text_proof: Option<String>,
    pub image_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub tokens_awarded: Option<i64>,
    pub transaction_hash: Option<String>,
    pub created_at: NaiveDateTime,

    pub user_login: String,
    pub wallet_address: Option<String>,
    pub activity_title: String,
    pub sponsor_name: String,
    pub token_reward: i64,
    pub event_name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewQueue {
    pub proofs: Vec<ProofSummary>,
    pub counts: StatusCounts,
}

#[cfg(test)]
mod test {
    use super::*;

    fn submission(kind: ProofKind, text: Option<&str>, image: Option<&str>) -> NewProof {
        NewProof {
            user_id: UserId::new(),
            activity_id: ActivityId::new(),
            passport_id: PassportId::new(),
            kind,
            text_proof: text.map(str::to_string),
            image_url: image.map(str::to_string),
        }
    }

    #[test]
    fn test_text_kind_requires_text() {
        assert!(submission(ProofKind::Text, Some("done"), None).validate().is_ok());
        assert!(submission(ProofKind::Text, None, Some("img.png")).validate().is_err());
        assert!(submission(ProofKind::Text, Some("   "), None).validate().is_err());
    }

    #[test]
    fn test_image_kind_requires_image() {
        assert!(submission(ProofKind::Image, None, Some("img.png")).validate().is_ok());
        assert!(submission(ProofKind::Image, Some("done"), None).validate().is_err());
    }

    #[test]
    fn test_both_kind_accepts_either() {
        assert!(submission(ProofKind::Both, None, Some("img.png")).validate().is_ok());
        assert!(submission(ProofKind::Both, Some("done"), None).validate().is_ok());
        assert!(submission(ProofKind::Both, None, None).validate().is_err());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [ProofStatus::Pending, ProofStatus::Approved, ProofStatus::Rejected] {
            assert_eq!(
                ProofStatus::try_from(status.as_str().to_string()).unwrap(),
                status
            );
        }
        assert!(ProofStatus::try_from("validated".to_string()).is_err());
    }
}
