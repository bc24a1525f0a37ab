//! In-memory repository fakes for exercising the review workflow without a
//! database. Semantics mirror the Postgres implementations, including the
//! compare-and-set transition guards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

use crate::db::models::activity::{Activity, ActivityId, EventId};
use crate::db::models::passport::{
    ActivityStatus, Passport, PassportActivity, PassportActivityId, PassportId,
};
use crate::db::models::proof::{
    NewProof, Proof, ProofId, ProofKind, ProofReceipt, ProofStatus, ProofSummary, ReviewQueue,
    StatusCounts,
};
use crate::db::models::user::{AppUser, UserId};
use crate::db::repositories::{
    PassportRepository, ProofRepository, ReviewContext, StoreErr, StoreResult,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, AppUser>,
    events: HashMap<EventId, String>,
    activities: HashMap<ActivityId, Activity>,
    passports: HashMap<PassportId, Passport>,
    passport_activities: Vec<PassportActivity>,
    proofs: HashMap<ProofId, Proof>,
}

#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, login: &str, wallet_address: Option<&str>) -> UserId {
        let id = UserId::new();
        self.inner.lock().unwrap().users.insert(
            id,
            AppUser {
                id,
                login: login.to_string(),
                name: login.to_string(),
                wallet_address: wallet_address.map(str::to_string),
                created_at: now(),
            },
        );
        id
    }

    pub fn add_event(&self, name: &str) -> EventId {
        let id = EventId::new();
        self.inner.lock().unwrap().events.insert(id, name.to_string());
        id
    }

    pub fn add_activity(
        &self,
        event_id: EventId,
        title: &str,
        token_reward: i64,
        requires_proof: bool,
    ) -> ActivityId {
        let id = ActivityId::new();
        self.inner.lock().unwrap().activities.insert(
            id,
            Activity {
                id,
                event_id,
                sponsor_name: "sponsor".to_string(),
                title: title.to_string(),
                token_reward,
                requires_proof,
                created_at: now(),
            },
        );
        id
    }

    fn seed_missing(inner: &mut Inner, passport_id: PassportId) -> u64 {
        let Some(passport) = inner.passports.get(&passport_id) else {
            return 0;
        };
        let event_id = passport.event_id;

        let missing: Vec<(ActivityId, bool)> = inner
            .activities
            .values()
            .filter(|a| a.event_id == event_id)
            .filter(|a| {
                !inner
                    .passport_activities
                    .iter()
                    .any(|pa| pa.passport_id == passport_id && pa.activity_id == a.id)
            })
            .map(|a| (a.id, a.requires_proof))
            .collect();

        let seeded = missing.len() as u64;
        for (activity_id, requires_proof) in missing {
            inner.passport_activities.push(PassportActivity {
                id: PassportActivityId::new(),
                passport_id,
                activity_id,
                status: ActivityStatus::Pending,
                requires_proof,
                proof_id: None,
                completed_at: None,
            });
        }

        seeded
    }
}

#[async_trait]
impl ProofRepository for MemStore {
    async fn submit(&self, submission: &NewProof) -> StoreResult<ProofReceipt> {
        submission.validate()?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.users.contains_key(&submission.user_id) {
            return Err(StoreErr::NotFound("user"));
        }
        if !inner.activities.contains_key(&submission.activity_id) {
            return Err(StoreErr::NotFound("activity"));
        }
        if !inner.passports.contains_key(&submission.passport_id) {
            return Err(StoreErr::NotFound("passport"));
        }

        let existing = inner
            .proofs
            .values()
            .find(|p| {
                p.passport_id == submission.passport_id
                    && p.activity_id == submission.activity_id
            })
            .map(|p| (p.id, p.status));

        match existing {
            Some((_, ProofStatus::Approved)) => Err(StoreErr::Conflict(
                "activity already completed for this passport".to_string(),
            )),
            Some((_, ProofStatus::Pending)) => Err(StoreErr::Conflict(
                "a proof for this activity is already under review".to_string(),
            )),
            Some((id, ProofStatus::Rejected)) => {
                let proof = inner.proofs.get_mut(&id).unwrap();
                proof.kind = submission.kind;
                proof.text_proof = submission.text_proof.clone();
                proof.image_url = submission.image_url.clone();
                proof.status = ProofStatus::Pending;
                proof.rejection_reason = None;
                proof.validated_by = None;
                proof.validated_at = None;
                proof.updated_at = now();

                Ok(ProofReceipt {
                    id,
                    status: ProofStatus::Pending,
                })
            }
            None => {
                let id = ProofId::new();
                inner.proofs.insert(
                    id,
                    Proof {
                        id,
                        user_id: submission.user_id,
                        activity_id: submission.activity_id,
                        passport_id: submission.passport_id,
                        kind: submission.kind,
                        text_proof: submission.text_proof.clone(),
                        image_url: submission.image_url.clone(),
                        status: ProofStatus::Pending,
                        rejection_reason: None,
                        validated_by: None,
                        validated_at: None,
                        tokens_awarded: None,
                        transaction_hash: None,
                        created_at: now(),
                        updated_at: now(),
                    },
                );

                Ok(ProofReceipt {
                    id,
                    status: ProofStatus::Pending,
                })
            }
        }
    }

    async fn get(&self, id: &ProofId) -> StoreResult<Proof> {
        self.inner
            .lock()
            .unwrap()
            .proofs
            .get(id)
            .cloned()
            .ok_or(StoreErr::NotFound("proof"))
    }

    async fn load_for_review(&self, id: &ProofId) -> StoreResult<ReviewContext> {
        let inner = self.inner.lock().unwrap();
        let proof = inner
            .proofs
            .get(id)
            .cloned()
            .ok_or(StoreErr::NotFound("proof"))?;
        let activity = inner
            .activities
            .get(&proof.activity_id)
            .ok_or(StoreErr::NotFound("activity"))?;
        let user = inner
            .users
            .get(&proof.user_id)
            .ok_or(StoreErr::NotFound("user"))?;

        Ok(ReviewContext {
            token_reward: activity.token_reward,
            wallet_address: user.wallet_address.clone(),
            proof,
        })
    }

    async fn queue(&self, status: Option<ProofStatus>) -> StoreResult<ReviewQueue> {
        let inner = self.inner.lock().unwrap();

        let mut counts = StatusCounts::default();
        for proof in inner.proofs.values() {
            match proof.status {
                ProofStatus::Pending => counts.pending += 1,
                ProofStatus::Approved => counts.approved += 1,
                ProofStatus::Rejected => counts.rejected += 1,
            }
        }

        let mut proofs: Vec<ProofSummary> = inner
            .proofs
            .values()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .filter_map(|p| {
                let user = inner.users.get(&p.user_id)?;
                let activity = inner.activities.get(&p.activity_id)?;
                let event_name = inner.events.get(&activity.event_id)?;

                Some(ProofSummary {
                    id: p.id,
                    status: p.status,
                    kind: p.kind,
                    text_proof: p.text_proof.clone(),
                    image_url: p.image_url.clone(),
                    rejection_reason: p.rejection_reason.clone(),
                    tokens_awarded: p.tokens_awarded,
                    transaction_hash: p.transaction_hash.clone(),
                    created_at: p.created_at,
                    user_login: user.login.clone(),
                    wallet_address: user.wallet_address.clone(),
                    activity_title: activity.title.clone(),
                    sponsor_name: activity.sponsor_name.clone(),
                    token_reward: activity.token_reward,
                    event_name: event_name.clone(),
                })
            })
            .collect();
        proofs.sort_by_key(|p| p.created_at);

        Ok(ReviewQueue { proofs, counts })
    }

    async fn approve(
        &self,
        id: &ProofId,
        validated_by: &str,
        tokens_awarded: i64,
        transaction_hash: Option<String>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let proof = inner.proofs.get_mut(id).ok_or(StoreErr::NotFound("proof"))?;

        if proof.status != ProofStatus::Pending {
            return Err(StoreErr::InvalidState(proof.status));
        }

        proof.status = ProofStatus::Approved;
        proof.validated_by = Some(validated_by.to_string());
        proof.validated_at = Some(now());
        proof.tokens_awarded = Some(tokens_awarded);
        proof.transaction_hash = transaction_hash;
        proof.updated_at = now();

        Ok(())
    }

    async fn reject(&self, id: &ProofId, validated_by: &str, reason: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let proof = inner.proofs.get_mut(id).ok_or(StoreErr::NotFound("proof"))?;

        if proof.status != ProofStatus::Pending {
            return Err(StoreErr::InvalidState(proof.status));
        }

        proof.status = ProofStatus::Rejected;
        proof.rejection_reason = Some(reason.to_string());
        proof.validated_by = Some(validated_by.to_string());
        proof.validated_at = Some(now());
        proof.updated_at = now();

        Ok(())
    }
}

#[async_trait]
impl PassportRepository for MemStore {
    async fn register(&self, user_id: &UserId, event_id: &EventId) -> StoreResult<Passport> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.users.contains_key(user_id) {
            return Err(StoreErr::NotFound("user"));
        }
        if !inner.events.contains_key(event_id) {
            return Err(StoreErr::NotFound("event"));
        }

        let passport = match inner
            .passports
            .values()
            .find(|p| p.user_id == *user_id && p.event_id == *event_id)
            .cloned()
        {
            Some(existing) => existing,
            None => {
                let passport = Passport {
                    id: PassportId::new(),
                    user_id: *user_id,
                    event_id: *event_id,
                    progress: 0,
                    created_at: now(),
                };
                inner.passports.insert(passport.id, passport.clone());
                passport
            }
        };

        MemStore::seed_missing(&mut inner, passport.id);
        Ok(passport)
    }

    async fn passport(&self, id: &PassportId) -> StoreResult<Passport> {
        self.inner
            .lock()
            .unwrap()
            .passports
            .get(id)
            .cloned()
            .ok_or(StoreErr::NotFound("passport"))
    }

    async fn activities(&self, id: &PassportId) -> StoreResult<Vec<PassportActivity>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .passport_activities
            .iter()
            .filter(|pa| pa.passport_id == *id)
            .cloned()
            .collect())
    }

    async fn sync_missing_activities(&self, id: &PassportId) -> StoreResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.passports.contains_key(id) {
            return Err(StoreErr::NotFound("passport"));
        }

        Ok(MemStore::seed_missing(&mut inner, *id))
    }

    async fn mark_activity_completed(
        &self,
        passport_id: &PassportId,
        activity_id: &ActivityId,
        proof_id: &ProofId,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .passport_activities
            .iter_mut()
            .find(|pa| pa.passport_id == *passport_id && pa.activity_id == *activity_id)
            .ok_or(StoreErr::NotFound("passport activity"))?;

        if row.status == ActivityStatus::Pending {
            row.status = ActivityStatus::Completed;
            row.proof_id = Some(*proof_id);
            row.completed_at = Some(now());
        }

        Ok(())
    }

    async fn recompute_progress(&self, id: &PassportId) -> StoreResult<i32> {
        let mut inner = self.inner.lock().unwrap();

        let total = inner
            .passport_activities
            .iter()
            .filter(|pa| pa.passport_id == *id)
            .count();
        let completed = inner
            .passport_activities
            .iter()
            .filter(|pa| pa.passport_id == *id && pa.status == ActivityStatus::Completed)
            .count();

        let progress = if total == 0 {
            0
        } else {
            (100.0 * completed as f64 / total as f64).round() as i32
        };

        let passport = inner
            .passports
            .get_mut(id)
            .ok_or(StoreErr::NotFound("passport"))?;
        passport.progress = progress;

        Ok(progress)
    }
}
