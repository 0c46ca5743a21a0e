//! Server-Sent Events support

use crate::runtime::SseEvent;
use crate::state_machine::SessionSnapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Stream the current snapshot, then every store event as it happens
pub fn sse_stream(
    snapshot: SessionSnapshot,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move {
        let (name, data) = init_payload(&snapshot);
        Ok(to_axum(name, &data))
    });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => {
            let (name, data) = event_payload(event);
            Some(Ok(to_axum(&name, &data)))
        }
        Err(e) => {
            // A lagged client catches up on the next state_change
            tracing::debug!(error = %e, "SSE client lagged");
            None
        }
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_payload(snapshot: &SessionSnapshot) -> (&'static str, Value) {
    (
        "init",
        json!({
            "type": "init",
            "snapshot": snapshot
        }),
    )
}

fn event_payload(event: SseEvent) -> (String, Value) {
    match event {
        SseEvent::StateChange { snapshot } => (
            "state_change".to_string(),
            json!({
                "type": "state_change",
                "snapshot": snapshot
            }),
        ),
        SseEvent::Notify { event_type, data } => {
            let payload = json!({
                "type": event_type,
                "data": data
            });
            (event_type, payload)
        }
    }
}

fn to_axum(name: &str, data: &Value) -> Event {
    Event::default().event(name).data(data.to_string())
}
