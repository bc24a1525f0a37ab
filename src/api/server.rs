use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::api::middleware::verify_admin::verify_admin_ident;
use crate::claim::ClaimErr;
use crate::db::prelude::*;
use crate::review::{Orchestrator, ReviewErr};
use crate::util::env::Config;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

pub struct AppState {
    pub proofs: PgProofRepository,
    pub passports: PgPassportRepository,
    pub orchestrator: Orchestrator<PgProofRepository, PgPassportRepository>,
    pub admin_token: String,
}

pub fn router(state: Arc<AppState>, cors_allow_origins: &str) -> Router {
    // review surface; everything here requires the admin token
    let admin_routes = Router::new()
        .route("/proof/queue", get(review_queue))
        .route("/proof/{id}/approve", post(approve_proof))
        .route("/proof/{id}/reject", post(reject_proof))
        .route("/passport/{id}/sync", post(sync_passport))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_admin_ident,
        ));

    Router::new()
        .merge(admin_routes)
        //
        // user-facing submission + reads
        .route("/proof", post(submit_proof))
        .route("/proof/{id}", get(proof_by_id))
        .route("/passport/register", post(register_passport))
        .route("/passport/{id}", get(passport_by_id))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(cors_layer(cors_allow_origins))
        .with_state(state)
}

fn cors_layer(allow_origins: &str) -> CorsLayer {
    if allow_origins.trim() == "*" {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allow_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Route handler errors end up in a response extension; surface them in the
/// logs here rather than letting them vanish into the wire.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument(skip(state, config))]
pub async fn serve(state: Arc<AppState>, config: &Config) -> Result<(), RouteError> {
    let app = router(state, &config.cors_allow_origins);

    let socket_addr = SocketAddr::new(
        IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        config.server_api_port,
    );
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tracing::info!(addr = %socket_addr, "server ready");
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Review(#[from] ReviewErr),

    #[error(transparent)]
    Store(#[from] StoreErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn store_response(err: &StoreErr) -> (StatusCode, String, Option<Value>) {
    match err {
        StoreErr::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found"), None),
        StoreErr::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
        StoreErr::InvalidState(status) => (
            StatusCode::CONFLICT,
            format!("proof is already {status}"),
            None,
        ),
        StoreErr::InvalidInput(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone(), None),
        StoreErr::Sqlx(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None),
    }
}

/// Gateway errors are forwarded verbatim, payload included, so the admin can
/// decide whether a retry is safe; the service never retries claims itself.
fn claim_response(err: &ClaimErr) -> (StatusCode, String, Option<Value>) {
    match err {
        ClaimErr::Unconfigured(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None),
        ClaimErr::Rejected { body, .. } => {
            (StatusCode::BAD_GATEWAY, err.to_string(), Some(body.clone()))
        }
        ClaimErr::Timeout => (StatusCode::GATEWAY_TIMEOUT, err.to_string(), None),
        ClaimErr::Network(_) => (StatusCode::BAD_GATEWAY, err.to_string(), None),
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            detail: Option<Value>,
        }

        let (status, message, detail) = match &self {
            RouteError::Store(err) | RouteError::Review(ReviewErr::Store(err)) => {
                store_response(err)
            }
            RouteError::Review(ReviewErr::Claim(err)) => claim_response(err),
            RouteError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None),
        };

        let mut response = (status, Json(ErrorResponse { message, detail })).into_response();
        response.extensions_mut().insert(Arc::new(self));

        response
    }
}
