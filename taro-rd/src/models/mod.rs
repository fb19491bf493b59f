//! Data model for the reading service
//!
//! Plain value records; relations are carried as ids and resolved through
//! the narrow store functions in [`crate::db`].

mod reading;
mod session;

pub use reading::{
    Card, DrawnCard, DrawnCardDetail, Orientation, Persona, Reading, SubmitRequest, Timeframe,
};
pub use session::{ProcessingStage, ReadingSession, SessionStatus};
