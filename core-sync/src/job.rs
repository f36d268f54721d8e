//! # Batch Jobs
//!
//! Identifiers, per-item outcomes and the summary report of one batch
//! operation.
//!
//! A batch always runs to completion over every submitted track; what went
//! right or wrong for each track is recorded as an [`ItemOutcome`] rather
//! than returned as an error.

use crate::{Result, SyncError};
use core_runtime::events::SyncOperation;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a track was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Remote id already known and `force` not set
    AlreadyResolved,
    /// No remote song matches the track
    Unresolved,
    /// The track has no value for the rating field
    MissingRating { field: String },
    /// The rating value has no 0-5 equivalent
    UntranslatableRating { field: String, value: String },
    /// The track has never been played
    NeverPlayed,
    /// The server does not know the resolved song
    RemoteNotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyResolved => f.write_str("already resolved"),
            SkipReason::Unresolved => f.write_str("no remote match"),
            SkipReason::MissingRating { field } => write!(f, "no value for '{}'", field),
            SkipReason::UntranslatableRating { field, value } => {
                write!(f, "'{}' value {} has no remote rating", field, value)
            }
            SkipReason::NeverPlayed => f.write_str("never played"),
            SkipReason::RemoteNotFound => f.write_str("remote song not found"),
        }
    }
}

/// Result of the work done for a single track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// A remote id was resolved and stored
    Resolved { remote_id: String },
    /// A rating was accepted by the server
    RatingPushed { remote_id: String, rating: u8 },
    /// A play was accepted by the server
    Scrobbled { remote_id: String, time_ms: i64 },
    Skipped { reason: SkipReason },
    /// Transport, store or worker failure scoped to this track
    Failed { message: String },
}

impl ItemOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        ItemOutcome::Skipped { reason }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ItemOutcome::Failed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ItemOutcome::Resolved { .. }
                | ItemOutcome::RatingPushed { .. }
                | ItemOutcome::Scrobbled { .. }
        )
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ItemOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemOutcome::Failed { .. })
    }
}

/// Outcome attributed to the track it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReport {
    /// Position of the track in the submitted batch
    pub index: usize,
    pub track_id: String,
    pub outcome: ItemOutcome,
}

/// Summary of a finished batch
///
/// `items` is ordered by submission index regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub job_id: SyncJobId,
    pub operation: SyncOperation,
    pub items: Vec<ItemReport>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn new(job_id: SyncJobId, operation: SyncOperation) -> Self {
        Self {
            job_id,
            operation,
            items: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.outcome.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|item| item.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.outcome.is_failed()).count()
    }

    /// Outcome recorded for a track
    pub fn outcome_for(&self, track_id: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|item| item.track_id == track_id)
            .map(|item| &item.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<ItemOutcome>) -> BatchReport {
        let mut report = BatchReport::new(SyncJobId::new(), SyncOperation::ResolveIds);
        report.items = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| ItemReport {
                index,
                track_id: format!("t-{}", index),
                outcome,
            })
            .collect();
        report
    }

    #[test]
    fn test_job_id_round_trip() {
        let id = SyncJobId::new();
        let parsed = SyncJobId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(SyncJobId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_report_counts() {
        let report = report(vec![
            ItemOutcome::Resolved {
                remote_id: "so-1".to_string(),
            },
            ItemOutcome::skipped(SkipReason::AlreadyResolved),
            ItemOutcome::skipped(SkipReason::Unresolved),
            ItemOutcome::failed("Network error: connection reset"),
        ]);

        assert_eq!(report.total(), 4);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.outcome_for("t-1"),
            Some(&ItemOutcome::skipped(SkipReason::AlreadyResolved))
        );
        assert_eq!(report.outcome_for("t-9"), None);
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::UntranslatableRating {
            field: "rating".to_string(),
            value: "7.5".to_string(),
        };
        assert_eq!(reason.to_string(), "'rating' value 7.5 has no remote rating");
        assert_eq!(SkipReason::NeverPlayed.to_string(), "never played");
    }
}
