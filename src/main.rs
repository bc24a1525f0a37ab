use std::sync::Arc;

use thiserror::Error;

use crate::api::server::{AppState, RouteError};
use crate::claim::ClaimGateway;
use crate::claim::engine::{EngineGateway, UnconfiguredGateway};
use crate::db::Db;
use crate::db::prelude::{PgPassportRepository, PgProofRepository};
use crate::review::Orchestrator;
use crate::util::env::{Config, EnvErr};

mod api;
mod claim;
mod db;
mod review;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Route(#[from] RouteError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    util::tracing::init();
    tracing::info!("starting swagly review service");

    let config = Config::from_env()?;

    let db = Db::connect(&config).await?;
    db::schema::ensure_schema(&db.pool).await?;

    // a deployment without engine credentials still serves submissions and
    // rejections; approvals surface the missing variable instead
    let gateway: Arc<dyn ClaimGateway> = match EngineGateway::new(&config) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            tracing::warn!(error = %err, "claim gateway unconfigured, approvals will fail");
            let missing = match err {
                claim::ClaimErr::Unconfigured(var) => var,
                _ => "engine credentials",
            };
            Arc::new(UnconfiguredGateway::new(missing))
        }
    };

    let proofs = PgProofRepository::new(db.pool.clone());
    let passports = PgPassportRepository::new(db.pool.clone());
    let orchestrator = Orchestrator::new(proofs.clone(), passports.clone(), gateway);

    let state = Arc::new(AppState {
        proofs,
        passports,
        orchestrator,
        admin_token: config.admin_token.clone(),
    });

    api::server::serve(state, &config).await?;

    Ok(())
}
