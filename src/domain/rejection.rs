//! Rejection reason vocabulary
//!
//! The fixed set of reasons an event can fail to be persisted, shared by the
//! Validator and the Upsert Engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    MissingEventId,
    InvalidDuration,
    EventInFuture,
    ConcurrencyFailure,
    InternalError,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectionReason::MissingEventId => "MISSING_EVENT_ID",
            RejectionReason::InvalidDuration => "INVALID_DURATION",
            RejectionReason::EventInFuture => "EVENT_IN_FUTURE",
            RejectionReason::ConcurrencyFailure => "CONCURRENCY_FAILURE",
            RejectionReason::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{s}")
    }
}

/// One rejected event, carried in the batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub event_id: String,
    pub reason: RejectionReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_vocabulary() {
        assert_eq!(RejectionReason::MissingEventId.to_string(), "MISSING_EVENT_ID");
        assert_eq!(RejectionReason::InvalidDuration.to_string(), "INVALID_DURATION");
        assert_eq!(RejectionReason::EventInFuture.to_string(), "EVENT_IN_FUTURE");
        assert_eq!(RejectionReason::ConcurrencyFailure.to_string(), "CONCURRENCY_FAILURE");
        assert_eq!(RejectionReason::InternalError.to_string(), "INTERNAL_ERROR");
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&RejectionReason::EventInFuture).unwrap();
        assert_eq!(json, "\"EVENT_IN_FUTURE\"");
    }
}
