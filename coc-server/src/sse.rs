//! Per-process SSE output stream (`GET /api/processes/:id/stream`).

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::{Event, KeepAlive, Sse};
use coc_store::{AIProcess, ProcessOutputEvent, ProcessStatus, ProcessStore};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    id: &'a str,
    status: ProcessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

fn status_event(process: &AIProcess) -> Event {
    let payload = StatusPayload {
        id: process.id.as_str(),
        status: process.status,
        error: process.error.as_deref(),
    };
    Event::default()
        .event("status")
        .data(serde_json::to_string(&payload).expect("status payload always serializes"))
}

fn done_event() -> Event {
    Event::default().event("done").data("{}")
}

fn chunk_event(content: &str) -> Event {
    Event::default()
        .event("chunk")
        .data(serde_json::json!({ "content": content }).to_string())
}

/// Builds the SSE body for an already-found process. Terminal processes
/// emit `status` then `done` and close immediately; non-terminal processes
/// emit the current `status`, then relay the process's output bus until
/// `complete`.
pub fn stream_for(
    process: AIProcess,
    store: Arc<dyn ProcessStore>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = status_event(&process);

    if process.status.is_terminal() {
        let events = vec![Ok(initial), Ok(done_event())];
        return Sse::new(stream::iter(events)).keep_alive(KeepAlive::default());
    }

    let output = store.subscribe_output(&process.id);
    let tail = BroadcastStream::new(output).filter_map(|item| async move {
        match item {
            Ok(ProcessOutputEvent::Chunk { content }) => Some(vec![Ok(chunk_event(&content))]),
            Ok(ProcessOutputEvent::Complete { status, .. }) => {
                Some(vec![Ok(done_status_event(status)), Ok(done_event())])
            }
            Err(_lagged) => None,
        }
    })
    .flat_map(stream::iter);

    let stream = stream::iter(vec![Ok(initial)]).chain(tail);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn done_status_event(status: ProcessStatus) -> Event {
    let payload = serde_json::json!({ "status": status });
    Event::default().event("status").data(payload.to_string())
}
