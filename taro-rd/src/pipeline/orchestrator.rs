//! Sequential interpretation pipeline
//!
//! One run per session: three card interpretations over a growing
//! conversation, then a summary, a fortune score, and a result image.
//! Every stage persists its output and publishes an event before the
//! next stage starts, so a subscriber reconnecting mid-run can recover
//! the finished stages from the results endpoint.
//!
//! Capability failures (text or image call) degrade the affected stage
//! to a fallback and the run continues; store failures abort the run
//! and mark the session failed.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use taro_common::events::{EventHub, ReadingEvent};

use crate::db;
use crate::models::{
    DrawnCardDetail, Persona, ProcessingStage, Reading, SessionStatus, Timeframe,
};
use crate::pipeline::{fortune, prompt, Admission, PipelineError, WorkerPool};
use crate::providers::{ChatMessage, ImageGenerator, TextInterpreter};

const DEFAULT_IMAGE_URL: &str = "https://example.com/default-advice-image.jpg";

pub struct PipelineService<T, I> {
    db: SqlitePool,
    hub: EventHub,
    text: Arc<T>,
    image: Arc<I>,
    workers: Arc<WorkerPool>,
    call_timeout: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl<T, I> Clone for PipelineService<T, I> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            hub: self.hub.clone(),
            text: Arc::clone(&self.text),
            image: Arc::clone(&self.image),
            workers: Arc::clone(&self.workers),
            call_timeout: self.call_timeout,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T, I> PipelineService<T, I> {
    fn in_flight(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the single run slot for `session_id`
    ///
    /// At most one run per session may be in flight. The reservation is
    /// taken before the caller persists anything for the run, so a
    /// duplicate submit is turned away without touching the stored
    /// session. Dropping the ticket without starting it releases the slot.
    pub fn reserve(&self, session_id: String) -> Result<RunTicket<T, I>, PipelineError> {
        if !self.in_flight().insert(session_id.clone()) {
            return Err(PipelineError::AlreadyRunning);
        }
        Ok(RunTicket {
            service: self.clone(),
            session_id,
            started: false,
        })
    }
}

/// A reserved run slot that has not started yet
pub struct RunTicket<T, I> {
    service: PipelineService<T, I>,
    session_id: String,
    started: bool,
}

impl<T, I> Drop for RunTicket<T, I> {
    fn drop(&mut self) {
        if !self.started {
            self.service.in_flight().remove(&self.session_id);
        }
    }
}

impl<T, I> RunTicket<T, I>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    /// Hand the reserved run to the worker pool
    ///
    /// The slot is released when the run finishes, whatever the outcome.
    pub async fn start(mut self) -> Admission {
        self.started = true;
        let service = self.service.clone();
        let session_id = self.session_id.clone();
        let workers = service.workers.clone();
        workers
            .run(async move {
                let sid = session_id.clone();
                if let Err(err) = service.run(&sid).await {
                    error!(session_id = %sid, error = %err, "Pipeline run failed");
                    service.handle_failure(&sid, &err).await;
                }
                service.in_flight().remove(&sid);
            })
            .await
    }
}

impl<T, I> PipelineService<T, I>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    pub fn new(
        db: SqlitePool,
        hub: EventHub,
        text: T,
        image: I,
        workers: WorkerPool,
        call_timeout: Duration,
    ) -> Self {
        Self {
            db,
            hub,
            text: Arc::new(text),
            image: Arc::new(image),
            workers: Arc::new(workers),
            call_timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Stop admitting runs and drain in-flight ones
    pub async fn shutdown(&self, grace: Duration) {
        self.workers.shutdown(grace).await;
    }

    /// Reserve and immediately start a run for `session_id`
    pub async fn submit(&self, session_id: String) -> Result<Admission, PipelineError> {
        let ticket = self.reserve(session_id)?;
        Ok(ticket.start().await)
    }

    /// Execute the full pipeline for one session
    async fn run(&self, session_id: &str) -> Result<(), PipelineError> {
        let reading = db::readings::get_by_session(&self.db, session_id)
            .await?
            .ok_or_else(|| {
                PipelineError::Precondition(format!("No reading for session {}", session_id))
            })?;
        let cards = db::cards::list_by_reading(&self.db, reading.id).await?;
        if cards.len() != 3 {
            return Err(PipelineError::Precondition(format!(
                "Expected 3 drawn cards, found {}",
                cards.len()
            )));
        }

        let persona = reading
            .reader_type
            .as_deref()
            .map(Persona::from_code)
            .unwrap_or(Persona::Balanced);

        info!(session_id, ?persona, "Pipeline run started");

        let mut conversation = vec![ChatMessage::system(persona.system_prompt())];
        let mut interpretations: [String; 3] = Default::default();

        for timeframe in Timeframe::ALL {
            let card = &cards[timeframe.position() as usize - 1];
            let text = self
                .interpret_card(session_id, &reading, timeframe, card, persona, &mut conversation)
                .await?;
            interpretations[timeframe.position() as usize - 1] = text;
        }

        let summary = self
            .summarize(session_id, &reading, &interpretations, persona)
            .await?;
        self.generate_image(session_id, &reading, &summary).await?;

        self.advance(session_id, ProcessingStage::Completed).await?;
        db::sessions::update_status(&self.db, session_id, SessionStatus::Completed).await?;
        self.hub.publish(
            session_id,
            ReadingEvent::Completed {
                message: "Your reading is complete".to_string(),
            },
        );

        info!(session_id, "Pipeline run completed");
        Ok(())
    }

    /// One card stage: status event, interpretation, persist, card event
    async fn interpret_card(
        &self,
        session_id: &str,
        reading: &Reading,
        timeframe: Timeframe,
        card: &DrawnCardDetail,
        persona: Persona,
        conversation: &mut Vec<ChatMessage>,
    ) -> Result<String, PipelineError> {
        let stage = timeframe.processing_stage();
        self.advance(session_id, stage).await?;
        self.hub.publish(
            session_id,
            ReadingEvent::StatusChanged {
                status: stage.as_str().to_string(),
                message: format!("Interpreting the {} card", timeframe.label()),
                progress: timeframe.progress(),
            },
        );

        conversation.push(ChatMessage::user(prompt::card_prompt(
            reading, timeframe, card, persona,
        )));

        let text = match tokio::time::timeout(
            self.call_timeout,
            self.text.complete(conversation),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                warn!(session_id, timeframe = timeframe.label(), error = %err,
                    "Interpretation call failed, using fallback");
                fallback_interpretation(timeframe, card)
            }
            Err(_) => {
                warn!(session_id, timeframe = timeframe.label(),
                    "Interpretation call timed out, using fallback");
                fallback_interpretation(timeframe, card)
            }
        };

        // The assistant turn goes back into the conversation so later
        // cards are read in context, fallback or not.
        conversation.push(ChatMessage::assistant(text.clone()));

        db::readings::update_interpretation(&self.db, reading.id, timeframe, &text).await?;
        self.advance(session_id, timeframe.completed_stage()).await?;
        self.hub.publish(
            session_id,
            ReadingEvent::CardInterpreted {
                position: timeframe.position(),
                text: text.clone(),
            },
        );

        Ok(text)
    }

    /// Summary stage: summary text, fortune score, persist, summary event
    async fn summarize(
        &self,
        session_id: &str,
        reading: &Reading,
        interpretations: &[String; 3],
        persona: Persona,
    ) -> Result<String, PipelineError> {
        self.advance(session_id, ProcessingStage::SummaryProcessing)
            .await?;
        self.hub.publish(
            session_id,
            ReadingEvent::StatusChanged {
                status: ProcessingStage::SummaryProcessing.as_str().to_string(),
                message: "Weaving the cards into a summary".to_string(),
                progress: 80,
            },
        );

        // Standalone single-turn conversation; the main one stays at
        // seven messages (system + three user/assistant pairs).
        let request = vec![ChatMessage::user(prompt::summary_prompt(
            reading,
            interpretations,
            persona,
        ))];
        let summary = match tokio::time::timeout(
            self.call_timeout,
            self.text.complete(&request),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                warn!(session_id, error = %err, "Summary call failed, using fallback");
                fallback_summary(interpretations)
            }
            Err(_) => {
                warn!(session_id, "Summary call timed out, using fallback");
                fallback_summary(interpretations)
            }
        };

        db::readings::update_summary(&self.db, reading.id, &summary).await?;
        let score = fortune::fortune_score(&summary);
        db::readings::update_fortune_score(&self.db, reading.id, score as i64).await?;
        self.advance(session_id, ProcessingStage::SummaryCompleted)
            .await?;
        self.hub.publish(
            session_id,
            ReadingEvent::SummaryGenerated {
                text: summary.clone(),
            },
        );

        info!(session_id, score, "Summary persisted");
        Ok(summary)
    }

    /// Image stage: generation with a stock fallback, persist, image event
    async fn generate_image(
        &self,
        session_id: &str,
        reading: &Reading,
        summary: &str,
    ) -> Result<(), PipelineError> {
        self.advance(session_id, ProcessingStage::ImageProcessing)
            .await?;
        self.hub.publish(
            session_id,
            ReadingEvent::StatusChanged {
                status: ProcessingStage::ImageProcessing.as_str().to_string(),
                message: "Painting your result image".to_string(),
                progress: 90,
            },
        );

        let prompt = prompt::image_prompt(reading, summary);
        let (url, description) = match tokio::time::timeout(
            self.call_timeout,
            self.image.generate(&prompt, session_id),
        )
        .await
        {
            Ok(Ok(image)) => (image.url, image.description.unwrap_or_default()),
            Ok(Err(err)) => {
                warn!(session_id, error = %err, "Image generation failed, using default image");
                (DEFAULT_IMAGE_URL.to_string(), String::new())
            }
            Err(_) => {
                warn!(session_id, "Image generation timed out, using default image");
                (DEFAULT_IMAGE_URL.to_string(), String::new())
            }
        };

        db::readings::update_result_image(&self.db, reading.id, &url, &description).await?;
        self.hub
            .publish(session_id, ReadingEvent::ImageGenerated { url });
        Ok(())
    }

    /// Persist a stage advance
    async fn advance(
        &self,
        session_id: &str,
        stage: ProcessingStage,
    ) -> Result<(), PipelineError> {
        if !db::sessions::advance_stage(&self.db, session_id, stage).await? {
            return Err(PipelineError::Precondition(format!(
                "Session {} cannot advance to {}",
                session_id,
                stage.as_str()
            )));
        }
        Ok(())
    }

    /// Mark the session failed and tell subscribers
    ///
    /// Secondary store errors here are logged and swallowed; the run is
    /// already lost and the session row may be the thing that is broken.
    async fn handle_failure(&self, session_id: &str, err: &PipelineError) {
        match db::sessions::advance_stage(&self.db, session_id, ProcessingStage::Failed).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(session_id, "Session already terminal, FAILED not recorded");
            }
            Err(store_err) => {
                error!(session_id, error = %store_err, "Failed to persist FAILED stage");
            }
        }
        self.hub.publish(
            session_id,
            ReadingEvent::Error {
                message: err.to_string(),
            },
        );
    }
}

fn fallback_interpretation(timeframe: Timeframe, card: &DrawnCardDetail) -> String {
    format!(
        "The {} card, {} drawn {}, speaks of {}. Take its meaning gently; \
         the cards suggest rather than decree.",
        timeframe.label(),
        card.card.name,
        card.orientation.as_str(),
        card.base_meaning(),
    )
}

fn fallback_summary(interpretations: &[String; 3]) -> String {
    format!(
        "{} {} {}",
        interpretations[0], interpretations[1], interpretations[2]
    )
}
