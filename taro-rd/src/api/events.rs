//! SSE bridge from the event hub to HTTP subscribers

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tracing::{debug, warn};

use taro_common::events::Disconnect;

use crate::api::AppState;
use crate::db;
use crate::error::ApiError;
use crate::providers::{ImageGenerator, TextInterpreter};

/// GET /sessions/:id/events — live event stream for one session
///
/// Pipeline completion does not close the stream; it stays open until
/// the client disconnects, the hub drops the handle, or the idle timeout
/// elapses with no pipeline activity.
pub async fn subscribe<T, I>(
    State(state): State<AppState<T, I>>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
    T: TextInterpreter + 'static,
    I: ImageGenerator + 'static,
{
    if !db::sessions::session_exists(&state.db, &session_id).await? {
        return Err(ApiError::NotFound(format!(
            "Session {} not found",
            session_id
        )));
    }

    let mut subscription = state.hub.subscribe(&session_id);
    let idle_timeout = Duration::from_secs(state.events.idle_timeout_secs);
    let heartbeat = Duration::from_secs(state.events.heartbeat_secs);

    let stream = stream! {
        loop {
            match tokio::time::timeout(idle_timeout, subscription.recv()).await {
                Ok(Some(event)) => {
                    match Event::default().event(event.event_type()).json_data(&event) {
                        Ok(sse_event) => yield Ok(sse_event),
                        Err(err) => {
                            warn!(
                                session_id = subscription.session_id(),
                                error = %err,
                                "Failed to serialize event, skipping"
                            );
                        }
                    }
                }
                // Handle removed from the registry and buffer drained
                Ok(None) => break,
                Err(_) => {
                    debug!(
                        session_id = subscription.session_id(),
                        "Stream idle timeout"
                    );
                    subscription.disconnect(Disconnect::TimedOut);
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(heartbeat)
            .text("keep-alive"),
    ))
}
