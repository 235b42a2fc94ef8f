//! Server-Sent Events (SSE) broadcaster
//!
//! Streams outbound notifications to connected host bridges. The SSE event
//! name is the notification name; the data is its JSON payload without the
//! `type` discriminator.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use super::AppContext;
use crate::events::Notification;

/// GET /events - SSE notification stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let rx = ctx.bus.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(notification) => to_sse_event(&notification).map(Ok),
            Err(e) => {
                // Lagged subscriber; missed notifications are not replayed
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(notification: &Notification) -> Option<Event> {
    match serde_json::to_string(&notification.payload()) {
        Ok(json) => {
            debug!("Broadcasting SSE event: {}", notification.name());
            Some(Event::default().event(notification.name()).data(json))
        }
        Err(e) => {
            warn!("Failed to serialize notification: {}", e);
            None
        }
    }
}
