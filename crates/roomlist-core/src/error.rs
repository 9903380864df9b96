use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::DiffError;

/// Broad error category used to decide how a failure is handled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomListErrorCategory {
    /// Transient failure reported by the remote source.
    Remote,
    /// A diff did not fit the current sequence.
    Consistency,
    /// A room handle that should be live could not produce its metadata.
    Invariant,
    /// Invalid configuration or input.
    Config,
    /// Internal engine failure (for example a stopped task).
    Internal,
}

/// Stable room list error payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct RoomListError {
    /// High-level error category.
    pub category: RoomListErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RoomListError {
    /// Construct a new room list error.
    pub fn new(
        category: RoomListErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a transient remote failure.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RoomListErrorCategory::Remote, code, message)
    }

    /// Build the error raised when a room's metadata cannot be read.
    pub fn missing_room_info(room_id: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            RoomListErrorCategory::Invariant,
            "missing_room_info",
            format!("missing room info for {room_id}: {reason}"),
        )
    }

    /// Whether the next naturally occurring signal may succeed where this failed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category,
            RoomListErrorCategory::Remote | RoomListErrorCategory::Invariant
        )
    }
}

impl From<DiffError> for RoomListError {
    fn from(err: DiffError) -> Self {
        let code = match err {
            DiffError::EmptySequence => "empty_sequence",
            DiffError::IndexOutOfBounds { .. } => "index_out_of_bounds",
        };
        Self::new(RoomListErrorCategory::Consistency, code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_missing_room_info_code_stable() {
        let err = RoomListError::missing_room_info("!a:example.org", "store closed");
        assert_eq!(err.code, "missing_room_info");
        assert_eq!(err.category, RoomListErrorCategory::Invariant);
        assert!(err.message.contains("!a:example.org"));
    }

    #[test]
    fn maps_diff_errors_to_consistency_category() {
        let err = RoomListError::from(DiffError::IndexOutOfBounds { index: 4, len: 2 });
        assert_eq!(err.category, RoomListErrorCategory::Consistency);
        assert_eq!(err.code, "index_out_of_bounds");
        assert_eq!(err.message, "index 4 is out of bounds for length 2");

        let err = RoomListError::from(DiffError::EmptySequence);
        assert_eq!(err.code, "empty_sequence");
    }

    #[test]
    fn only_remote_and_invariant_failures_are_transient() {
        assert!(RoomListError::remote("subscribe_failed", "offline").is_transient());
        assert!(RoomListError::missing_room_info("!a:example.org", "gone").is_transient());
        assert!(!RoomListError::from(DiffError::EmptySequence).is_transient());
        assert!(
            !RoomListError::new(RoomListErrorCategory::Internal, "store_closed", "closed")
                .is_transient()
        );
    }

    #[test]
    fn renders_category_code_and_message() {
        let err = RoomListError::remote("subscribe_failed", "timeout");
        assert_eq!(err.to_string(), "Remote:subscribe_failed: timeout");
    }
}
