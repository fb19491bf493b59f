//! Reading, drawn cards, and the submit request

use serde::{Deserialize, Serialize};

use super::ProcessingStage;

/// Card orientation as drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Upright,
    Reversed,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Upright => "upright",
            Orientation::Reversed => "reversed",
        }
    }
}

/// Card definition reference data
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: i64,
    pub name: String,
    pub meaning_upright: String,
    pub meaning_reversed: String,
}

/// One of the three fixed-position draws belonging to a reading
///
/// References its reading and card by id only; no back-pointers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawnCard {
    pub reading_id: i64,
    pub position: u8,
    pub card_id: i64,
    pub orientation: Orientation,
}

/// Drawn card joined with its definition, as the pipeline consumes it
#[derive(Debug, Clone)]
pub struct DrawnCardDetail {
    pub position: u8,
    pub orientation: Orientation,
    pub card: Card,
}

impl DrawnCardDetail {
    /// Base meaning for the drawn orientation
    pub fn base_meaning(&self) -> &str {
        match self.orientation {
            Orientation::Upright => &self.card.meaning_upright,
            Orientation::Reversed => &self.card.meaning_reversed,
        }
    }
}

/// The request + accumulated results for one session
///
/// Created empty at session creation; the pipeline fills fields
/// incrementally and never overwrites a stage's output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub session_id: String,
    pub category_code: Option<String>,
    pub topic_code: Option<String>,
    pub question_text: Option<String>,
    pub reader_type: Option<String>,
    pub past_interpretation: Option<String>,
    pub present_interpretation: Option<String>,
    pub future_interpretation: Option<String>,
    pub summary: Option<String>,
    pub fortune_score: Option<i64>,
    pub result_image_url: Option<String>,
    pub result_image_text: Option<String>,
}

/// Finalized submit request that triggers the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub category_code: String,
    pub topic_code: String,
    pub question_text: String,
    pub reader_type: String,
}

/// Interpretive voice selected by the reader type code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// "F" — warm, empathetic
    Feeling,
    /// "T" — pragmatic, analytical
    Thinking,
    /// "FT" — balanced
    Balanced,
}

impl Persona {
    /// Unknown codes fall back to the balanced voice
    pub fn from_code(code: &str) -> Persona {
        match code.to_ascii_uppercase().as_str() {
            "F" => Persona::Feeling,
            "T" => Persona::Thinking,
            _ => Persona::Balanced,
        }
    }
}

/// The three interpretation timeframes, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Past,
    Present,
    Future,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Past, Timeframe::Present, Timeframe::Future];

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::Past => "past",
            Timeframe::Present => "present",
            Timeframe::Future => "future",
        }
    }

    /// Card position this timeframe corresponds to (1-3)
    pub fn position(self) -> u8 {
        match self {
            Timeframe::Past => 1,
            Timeframe::Present => 2,
            Timeframe::Future => 3,
        }
    }

    pub fn processing_stage(self) -> ProcessingStage {
        match self {
            Timeframe::Past => ProcessingStage::PastProcessing,
            Timeframe::Present => ProcessingStage::PresentProcessing,
            Timeframe::Future => ProcessingStage::FutureProcessing,
        }
    }

    pub fn completed_stage(self) -> ProcessingStage {
        match self {
            Timeframe::Past => ProcessingStage::PastCompleted,
            Timeframe::Present => ProcessingStage::PresentCompleted,
            Timeframe::Future => ProcessingStage::FutureCompleted,
        }
    }

    /// Progress percentage reported in the stage's status event
    pub fn progress(self) -> u8 {
        match self {
            Timeframe::Past => 20,
            Timeframe::Present => 40,
            Timeframe::Future => 60,
        }
    }

    /// Present and future stages build on earlier interpretations
    pub fn has_previous_context(self) -> bool {
        !matches!(self, Timeframe::Past)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_meaning_follows_orientation() {
        let detail = DrawnCardDetail {
            position: 1,
            orientation: Orientation::Reversed,
            card: Card {
                id: 1,
                name: "The Fool".into(),
                meaning_upright: "new beginnings".into(),
                meaning_reversed: "recklessness".into(),
            },
        };
        assert_eq!(detail.base_meaning(), "recklessness");
    }

    #[test]
    fn persona_codes() {
        assert_eq!(Persona::from_code("f"), Persona::Feeling);
        assert_eq!(Persona::from_code("T"), Persona::Thinking);
        assert_eq!(Persona::from_code("FT"), Persona::Balanced);
        assert_eq!(Persona::from_code("???"), Persona::Balanced);
    }

    #[test]
    fn timeframe_positions_and_context() {
        assert_eq!(Timeframe::Past.position(), 1);
        assert_eq!(Timeframe::Future.position(), 3);
        assert!(!Timeframe::Past.has_previous_context());
        assert!(Timeframe::Present.has_previous_context());
        assert!(Timeframe::Future.has_previous_context());
    }
}
