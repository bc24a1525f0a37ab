use sqlx::PgPool;
use tracing::instrument;

use crate::util::env::Config;

pub mod models;
pub mod repositories;
pub mod schema;

pub mod prelude {
    pub use crate::db::models::activity::EventId;
    pub use crate::db::models::passport::{Passport, PassportId, PassportView};
    pub use crate::db::models::proof::{
        NewProof, Proof, ProofId, ProofReceipt, ProofStatus, ReviewQueue,
    };
    pub use crate::db::models::user::UserId;
    pub use crate::db::repositories::passport::PgPassportRepository;
    pub use crate::db::repositories::proof::PgProofRepository;
    pub use crate::db::repositories::{PassportRepository, ProofRepository, StoreErr};
}

/// Owns the connection pool. Constructed once in `main` and cloned into the
/// repositories; there is deliberately no ambient/static pool accessor.
#[derive(Debug, Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    #[instrument(skip(config))]
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(&config.database_url).await?;
        Ok(Self { pool })
    }
}
