//! Session lifecycle and pipeline stage state machine
//!
//! A session's `ProcessingStage` advances monotonically through a fixed
//! order for one run; `Failed` is reachable from any non-terminal stage and
//! absorbing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// Pipeline processing stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStage {
    Created,
    CardsGenerated,
    Submitted,
    PastProcessing,
    PastCompleted,
    PresentProcessing,
    PresentCompleted,
    FutureProcessing,
    FutureCompleted,
    SummaryProcessing,
    SummaryCompleted,
    ImageProcessing,
    Completed,
    Failed,
}

impl ProcessingStage {
    /// Position in the fixed stage order; `Failed` sits outside it
    pub fn rank(self) -> u8 {
        match self {
            ProcessingStage::Created => 0,
            ProcessingStage::CardsGenerated => 1,
            ProcessingStage::Submitted => 2,
            ProcessingStage::PastProcessing => 3,
            ProcessingStage::PastCompleted => 4,
            ProcessingStage::PresentProcessing => 5,
            ProcessingStage::PresentCompleted => 6,
            ProcessingStage::FutureProcessing => 7,
            ProcessingStage::FutureCompleted => 8,
            ProcessingStage::SummaryProcessing => 9,
            ProcessingStage::SummaryCompleted => 10,
            ProcessingStage::ImageProcessing => 11,
            ProcessingStage::Completed => 12,
            ProcessingStage::Failed => 13,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStage::Completed | ProcessingStage::Failed)
    }

    /// Whether `next` is a legal transition from this stage
    ///
    /// Forward moves only; `Failed` is allowed from any non-terminal stage
    /// and cannot be left.
    pub fn can_advance_to(self, next: ProcessingStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == ProcessingStage::Failed {
            return true;
        }
        next.rank() > self.rank()
    }

    /// Wire name used in status events and the results API
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStage::Created => "CREATED",
            ProcessingStage::CardsGenerated => "CARDS_GENERATED",
            ProcessingStage::Submitted => "SUBMITTED",
            ProcessingStage::PastProcessing => "PAST_PROCESSING",
            ProcessingStage::PastCompleted => "PAST_COMPLETED",
            ProcessingStage::PresentProcessing => "PRESENT_PROCESSING",
            ProcessingStage::PresentCompleted => "PRESENT_COMPLETED",
            ProcessingStage::FutureProcessing => "FUTURE_PROCESSING",
            ProcessingStage::FutureCompleted => "FUTURE_COMPLETED",
            ProcessingStage::SummaryProcessing => "SUMMARY_PROCESSING",
            ProcessingStage::SummaryCompleted => "SUMMARY_COMPLETED",
            ProcessingStage::ImageProcessing => "IMAGE_PROCESSING",
            ProcessingStage::Completed => "COMPLETED",
            ProcessingStage::Failed => "FAILED",
        }
    }

    /// Inverse of [`ProcessingStage::as_str`]
    pub fn parse(value: &str) -> Option<ProcessingStage> {
        Some(match value {
            "CREATED" => ProcessingStage::Created,
            "CARDS_GENERATED" => ProcessingStage::CardsGenerated,
            "SUBMITTED" => ProcessingStage::Submitted,
            "PAST_PROCESSING" => ProcessingStage::PastProcessing,
            "PAST_COMPLETED" => ProcessingStage::PastCompleted,
            "PRESENT_PROCESSING" => ProcessingStage::PresentProcessing,
            "PRESENT_COMPLETED" => ProcessingStage::PresentCompleted,
            "FUTURE_PROCESSING" => ProcessingStage::FutureProcessing,
            "FUTURE_COMPLETED" => ProcessingStage::FutureCompleted,
            "SUMMARY_PROCESSING" => ProcessingStage::SummaryProcessing,
            "SUMMARY_COMPLETED" => ProcessingStage::SummaryCompleted,
            "IMAGE_PROCESSING" => ProcessingStage::ImageProcessing,
            "COMPLETED" => ProcessingStage::Completed,
            "FAILED" => ProcessingStage::Failed,
            _ => return None,
        })
    }
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "ACTIVE",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<SessionStatus> {
        Some(match value {
            "ACTIVE" => SessionStatus::Active,
            "COMPLETED" => SessionStatus::Completed,
            "CANCELLED" => SessionStatus::Cancelled,
            _ => return None,
        })
    }
}

/// One user's reading session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingSession {
    pub session_id: String,
    pub nickname: Option<String>,
    pub status: SessionStatus,
    pub stage: ProcessingStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReadingSession {
    pub fn new(session_id: String, nickname: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            nickname,
            status: SessionStatus::Active,
            stage: ProcessingStage::Created,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the stage; returns false (and leaves the session untouched)
    /// if the transition would skip backwards or leave a terminal stage.
    pub fn advance_stage(&mut self, next: ProcessingStage) -> bool {
        if !self.stage.can_advance_to(next) {
            return false;
        }
        self.stage = next;
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut session = ReadingSession::new("abc123".into(), None);
        let order = [
            ProcessingStage::CardsGenerated,
            ProcessingStage::Submitted,
            ProcessingStage::PastProcessing,
            ProcessingStage::PastCompleted,
            ProcessingStage::PresentProcessing,
            ProcessingStage::PresentCompleted,
            ProcessingStage::FutureProcessing,
            ProcessingStage::FutureCompleted,
            ProcessingStage::SummaryProcessing,
            ProcessingStage::SummaryCompleted,
            ProcessingStage::ImageProcessing,
            ProcessingStage::Completed,
        ];
        for stage in order {
            assert!(session.advance_stage(stage), "rejected {:?}", stage);
        }
    }

    #[test]
    fn no_regression() {
        let mut session = ReadingSession::new("abc123".into(), None);
        assert!(session.advance_stage(ProcessingStage::PresentProcessing));
        assert!(!session.advance_stage(ProcessingStage::PastProcessing));
        assert_eq!(session.stage, ProcessingStage::PresentProcessing);
    }

    #[test]
    fn failed_is_reachable_from_anywhere_and_absorbing() {
        let mut session = ReadingSession::new("abc123".into(), None);
        assert!(session.advance_stage(ProcessingStage::SummaryProcessing));
        assert!(session.advance_stage(ProcessingStage::Failed));
        assert!(!session.advance_stage(ProcessingStage::Completed));
        assert!(!session.advance_stage(ProcessingStage::Failed));
    }

    #[test]
    fn completed_is_terminal() {
        let mut session = ReadingSession::new("abc123".into(), None);
        assert!(session.advance_stage(ProcessingStage::Completed));
        assert!(!session.advance_stage(ProcessingStage::Failed));
    }

    #[test]
    fn stage_serializes_screaming_snake() {
        let json = serde_json::to_string(&ProcessingStage::PastProcessing).unwrap();
        assert_eq!(json, "\"PAST_PROCESSING\"");
    }
}
