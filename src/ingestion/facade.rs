//! Ingestion Facade
//!
//! The single entry point the HTTP layer calls: validate every candidate,
//! default missing `received_time`, coalesce duplicates within the batch,
//! then hand the survivors to the Upsert Engine.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::domain::event::EventCandidate;
use crate::domain::{Rejection, RejectionReason};
use crate::ingestion::coalescer::coalesce;
use crate::ingestion::engine::{EventOutcome, UpsertEngine};
use crate::ingestion::validator::validate;

/// Tallied result of one `process_batch` call, shaped for direct
/// serialization as the HTTP response body.
#[derive(Debug, Clone, Serialize, Default)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub deduped: usize,
    pub updated: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

pub struct IngestionFacade {
    engine: UpsertEngine,
    future_skew: Duration,
}

impl IngestionFacade {
    pub fn new(engine: UpsertEngine, future_skew: Duration) -> Self {
        Self { engine, future_skew }
    }

    /// Validate, default, coalesce, then upsert. The running totals from
    /// validation rejections and coalescer dedup are folded together with
    /// the engine's own classification before being returned. Never fails:
    /// every failure mode downstream degrades into a per-event rejection
    /// instead of an error, so the HTTP layer always has a 200 to send.
    pub async fn process_batch(&self, candidates: Vec<EventCandidate>) -> BatchOutcome {
        let now = Utc::now();
        self.process_batch_at(candidates, now).await
    }

    /// Same as [`process_batch`](Self::process_batch) with an injectable
    /// clock, so tests can pin "now" instead of racing the wall clock.
    pub async fn process_batch_at(&self, candidates: Vec<EventCandidate>, now: DateTime<Utc>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut survivors = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match validate(&candidate, now, self.future_skew) {
                Ok(()) => survivors.push(candidate.into_event(now)),
                Err(reason) => {
                    outcome.rejected += 1;
                    outcome.rejections.push(Rejection {
                        event_id: candidate.event_id,
                        reason,
                    });
                }
            }
        }

        let coalesced = coalesce(survivors);
        outcome.deduped += coalesced.deduped_count;

        let results = self.engine.upsert_batch(coalesced.winners).await;
        for (event, result) in results {
            match result {
                EventOutcome::Accepted => outcome.accepted += 1,
                EventOutcome::Deduped => outcome.deduped += 1,
                EventOutcome::Updated => outcome.updated += 1,
                EventOutcome::Rejected(reason) => {
                    outcome.rejected += 1;
                    outcome.rejections.push(Rejection {
                        event_id: event.event_id,
                        reason,
                    });
                }
            }
        }

        outcome
    }
}
