use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use futures_util::Stream;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Long-lived SSE stream of feed events. Each connection gets its own
/// subscription starting at connect time — no replay. Heartbeats flow
/// independently of the bus so dead connections are detected client-side.
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.dispatcher.subscribe();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        loop {
            tokio::select! {
                // the first tick fires immediately, giving the client an
                // instant heartbeat on connect
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().data("{\"type\": \"heartbeat\"}"));
                }
                event = rx.recv() => match event {
                    Ok(event) => match Event::default().json_data(&event) {
                        Ok(event) => yield Ok(event),
                        Err(err) => warn!("failed to serialize feed event: {err}"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        // no backlog is kept: a subscriber this far behind
                        // re-fetches a feed page after reconnecting
                        debug!("dropping lagged event stream ({skipped} events behind)");
                        break;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    };

    Sse::new(stream)
}
