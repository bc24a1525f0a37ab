use chrono::NaiveDateTime;
use serde::Serialize;

use crate::uuid_ident;

uuid_ident!(UserId);

/// Base user table model. `wallet_address` is absent until the user connects
/// a wallet; approvals for such users fail before any claim is attempted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AppUser {
    pub id: UserId,
    pub login: String,
    pub name: String,
    pub wallet_address: Option<String>,
    pub created_at: NaiveDateTime,
}
