//! Upsert Engine
//!
//! Stage A attempts a single bulk upsert of the whole coalesced batch,
//! optimistically assuming no row has moved since it was last read. Stage B
//! falls back to a per-row retry loop for exactly the events that lost that
//! race, so a single hot row never blocks the rest of the batch.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::{Event, RejectionReason};
use crate::store::{EventStore, StoreError};

/// What became of one event after the engine ran.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// No row existed for this `event_id` before; it was inserted.
    Accepted,
    /// A row existed with an identical payload; nothing was written.
    Deduped,
    /// A row existed with a different payload; it was overwritten.
    Updated,
    Rejected(RejectionReason),
}

pub struct UpsertEngine {
    store: EventStore,
    max_retries: u32,
}

impl UpsertEngine {
    pub fn new(store: EventStore, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Upsert every event in `winners`, returning one outcome per event in
    /// the same order. Never fails the whole batch, and never lets a
    /// genuine infrastructure hiccup escape either: a failed prefetch or
    /// bulk write degrades to the per-row fallback (or, if that's
    /// exhausted too, `EventOutcome::Rejected(InternalError)`) for exactly
    /// the rows it affected, rather than aborting the request.
    pub async fn upsert_batch(&self, winners: Vec<Event>) -> Vec<(Event, EventOutcome)> {
        if winners.is_empty() {
            return Vec::new();
        }

        let event_ids: Vec<String> = winners.iter().map(|e| e.event_id.clone()).collect();
        let existing_by_id: HashMap<String, Event> = match self.store.find_all_by_ids(&event_ids).await {
            Ok(existing) => existing.into_iter().map(|e| (e.event_id.clone(), e)).collect(),
            Err(err) => {
                warn!(
                    error = %err,
                    batch_size = winners.len(),
                    "bulk prefetch failed, falling back to per-row retries for the whole batch"
                );
                let mut results = Vec::with_capacity(winners.len());
                for event in winners {
                    let outcome = self.retry_one(event.clone()).await;
                    results.push((event, outcome));
                }
                return results;
            }
        };

        let mut prepared: Vec<Event> = Vec::with_capacity(winners.len());
        let mut classification: HashMap<String, EventOutcome> = HashMap::new();

        for event in &winners {
            match classify_against(event, existing_by_id.get(&event.event_id)) {
                EventOutcome::Deduped => {
                    classification.insert(event.event_id.clone(), EventOutcome::Deduped);
                }
                outcome @ (EventOutcome::Accepted | EventOutcome::Updated) => {
                    let to_write = match existing_by_id.get(&event.event_id) {
                        Some(existing) => existing.with_payload_of(event),
                        None => event.clone(),
                    };
                    prepared.push(to_write);
                    classification.insert(event.event_id.clone(), outcome);
                }
                EventOutcome::Rejected(reason) => {
                    classification.insert(event.event_id.clone(), EventOutcome::Rejected(reason));
                }
            }
        }

        if !prepared.is_empty() {
            match self.store.save_all(&prepared).await {
                Ok(outcome) => {
                    for id in &outcome.conflicted {
                        let event = prepared
                            .iter()
                            .find(|e| &e.event_id == id)
                            .cloned()
                            .expect("conflicted id came from prepared");
                        let resolved = self.retry_one(event).await;
                        classification.insert(id.clone(), resolved);
                    }
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        rows = prepared.len(),
                        "bulk write failed, falling back to per-row retries for the whole write set"
                    );
                    for event in &prepared {
                        let resolved = self.retry_one(event.clone()).await;
                        classification.insert(event.event_id.clone(), resolved);
                    }
                }
            }
        }

        winners
            .into_iter()
            .map(|event| {
                let outcome = classification
                    .remove(&event.event_id)
                    .unwrap_or(EventOutcome::Rejected(RejectionReason::InternalError));
                (event, outcome)
            })
            .collect()
    }

    /// Per-row fallback for one event that lost the bulk race. Re-reads the
    /// current row, reclassifies against it, and retries the single-row
    /// upsert up to `max_retries` times before giving up.
    async fn retry_one(&self, mut event: Event) -> EventOutcome {
        for attempt in 0..self.max_retries {
            let current = match self.store.find_by_id(&event.event_id).await {
                Ok(current) => current,
                Err(err) => {
                    warn!(event_id = %event.event_id, error = %err, "fallback lookup failed");
                    return EventOutcome::Rejected(RejectionReason::InternalError);
                }
            };

            let outcome = classify_against(&event, current.as_ref());
            if matches!(outcome, EventOutcome::Deduped) {
                return outcome;
            }

            let to_write = match &current {
                Some(existing) => existing.with_payload_of(&event),
                None => event.clone(),
            };

            match self.store.save_one(&to_write).await {
                Ok(_) => return outcome,
                Err(StoreError::VersionConflict { actual, .. }) => {
                    warn!(
                        event_id = %event.event_id,
                        attempt,
                        actual,
                        "version conflict on per-row fallback, retrying"
                    );
                    event = to_write;
                    continue;
                }
                Err(err) => {
                    warn!(event_id = %event.event_id, error = %err, "per-row upsert failed");
                    return EventOutcome::Rejected(RejectionReason::InternalError);
                }
            }
        }

        EventOutcome::Rejected(RejectionReason::ConcurrencyFailure)
    }
}

/// Classify `event` against whatever currently sits in the store for its
/// `event_id`. Does not write anything.
///
/// Order matters: a stale `received_time` loses even if the payload
/// differs, since I2 only ever lets the maximal `received_time` win.
fn classify_against(event: &Event, existing: Option<&Event>) -> EventOutcome {
    match existing {
        None => EventOutcome::Accepted,
        Some(existing) if event.received_time <= existing.received_time => EventOutcome::Deduped,
        Some(existing) if existing.has_same_payload(event) => EventOutcome::Deduped,
        Some(_) => EventOutcome::Updated,
    }
}
