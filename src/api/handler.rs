use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::api::server::{AppState, JsonResult};
use crate::db::prelude::*;
use crate::review::ApprovalOutcome;

#[derive(Debug, Deserialize)]
pub struct RegisterPassportBody {
    pub user_id: UserId,
    pub event_id: EventId,
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub validated_by: String,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub validated_by: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub status: Option<ProofStatus>,
}

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub seeded: u64,
}

#[instrument(skip(state, payload))]
pub async fn submit_proof(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewProof>,
) -> JsonResult<ProofReceipt> {
    let receipt = state.proofs.submit(&payload).await?;
    Ok(Json(receipt))
}

#[instrument(skip(state))]
pub async fn proof_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> JsonResult<Proof> {
    let proof = state.proofs.get(&ProofId(id)).await?;
    Ok(Json(proof))
}

#[instrument(skip(state))]
pub async fn review_queue(
    Query(params): Query<QueueParams>,
    State(state): State<Arc<AppState>>,
) -> JsonResult<ReviewQueue> {
    let queue = state.proofs.queue(params.status).await?;
    Ok(Json(queue))
}

#[instrument(skip(state, payload))]
pub async fn approve_proof(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveBody>,
) -> JsonResult<ApprovalOutcome> {
    let outcome = state
        .orchestrator
        .approve(&ProofId(id), &payload.validated_by)
        .await?;

    Ok(Json(outcome))
}

#[instrument(skip(state, payload))]
pub async fn reject_proof(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectBody>,
) -> JsonResult<ProofReceipt> {
    let id = ProofId(id);
    state
        .orchestrator
        .reject(&id, &payload.validated_by, &payload.reason)
        .await?;

    Ok(Json(ProofReceipt {
        id,
        status: ProofStatus::Rejected,
    }))
}

#[instrument(skip(state, payload))]
pub async fn register_passport(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterPassportBody>,
) -> JsonResult<Passport> {
    let passport = state
        .passports
        .register(&payload.user_id, &payload.event_id)
        .await?;

    Ok(Json(passport))
}

#[instrument(skip(state))]
pub async fn passport_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> JsonResult<PassportView> {
    let id = PassportId(id);
    let passport = state.passports.passport(&id).await?;
    let activities = state.passports.activities(&id).await?;

    Ok(Json(PassportView {
        passport,
        activities,
    }))
}

#[instrument(skip(state))]
pub async fn sync_passport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> JsonResult<SyncOutcome> {
    let seeded = state
        .passports
        .sync_missing_activities(&PassportId(id))
        .await?;

    Ok(Json(SyncOutcome { seeded }))
}
