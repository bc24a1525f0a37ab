use thiserror::Error;

use crate::claim::ClaimErr;
use crate::db::repositories::StoreErr;

pub mod orchestrator;

pub use orchestrator::{ApprovalOutcome, Orchestrator};

pub type ReviewResult<T> = core::result::Result<T, ReviewErr>;

#[derive(Debug, Error)]
pub enum ReviewErr {
    #[error(transparent)]
    Store(#[from] StoreErr),

    #[error(transparent)]
    Claim(#[from] ClaimErr),
}
