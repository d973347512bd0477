//! Validator
//!
//! Pure, stateless checks run against every incoming candidate before it is
//! allowed anywhere near the store. Runs before `received_time` defaulting,
//! so it only ever sees wire-shape data.

use chrono::{DateTime, Duration, Utc};

use crate::domain::event::EventCandidate;
use crate::domain::RejectionReason;

/// Upper bound on a plausible machine cycle. Durations longer than this are
/// almost certainly a unit error upstream rather than a real event.
pub const MAX_DURATION_MS: i64 = 6 * 60 * 60 * 1000;

/// Check a candidate event, in order: missing id, then duration bounds,
/// then clock skew. The first failing check wins; later checks never run
/// against a candidate that already failed an earlier one.
pub fn validate(
    candidate: &EventCandidate,
    now: DateTime<Utc>,
    future_skew: Duration,
) -> Result<(), RejectionReason> {
    if candidate.event_id.trim().is_empty() {
        return Err(RejectionReason::MissingEventId);
    }

    if candidate.duration_ms < 0 || candidate.duration_ms > MAX_DURATION_MS {
        return Err(RejectionReason::InvalidDuration);
    }

    if candidate.event_time > now + future_skew {
        return Err(RejectionReason::EventInFuture);
    }

    Ok(())
}
