//! Batch Coalescer
//!
//! Collapses duplicate `event_id`s within a single incoming batch to one
//! winner per id before the winners ever reach the store. This keeps the
//! Upsert Engine from ever racing against itself over two rows in the same
//! request.

use std::collections::HashMap;

use crate::domain::Event;

/// Result of coalescing one batch: the surviving events, plus how many
/// input events were folded away as duplicates of another winner.
pub struct CoalesceResult {
    pub winners: Vec<Event>,
    pub deduped_count: usize,
}

/// Group `events` by `event_id` and keep one winner per group: the event
/// with the latest `received_time`, breaking ties by later position in
/// `events` (a later entry always beats an earlier one with an identical
/// `received_time`). Winner order follows first occurrence of each id in
/// the input; no other ordering is guaranteed.
pub fn coalesce(events: Vec<Event>) -> CoalesceResult {
    let input_count = events.len();
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, Event> = HashMap::new();

    for event in events {
        match best.get_mut(&event.event_id) {
            None => {
                order.push(event.event_id.clone());
                best.insert(event.event_id.clone(), event);
            }
            Some(current) => {
                if event.received_time >= current.received_time {
                    *current = event;
                }
            }
        }
    }

    let winners: Vec<Event> = order
        .into_iter()
        .map(|id| best.remove(&id).expect("id was just inserted"))
        .collect();

    let deduped_count = input_count - winners.len();

    CoalesceResult {
        winners,
        deduped_count,
    }
}
