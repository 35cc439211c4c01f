// ABOUTME: SSE handler streaming change notices to connected clients.
// ABOUTME: Subscribes to the ledger's broadcast channel and converts notices to SSE events.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use cassncase_store::{ChangeKind, ChangeNotice};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::app_state::SharedState;

/// SSE event name for a notice kind.
fn event_type_name(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::DataChanged => "data_changed",
    }
}

/// Convert a broadcast receiver into an SSE-compatible stream. Lagged
/// receivers drop the missed notices and keep streaming.
fn notice_stream_from_receiver(
    rx: tokio::sync::broadcast::Receiver<ChangeNotice>,
) -> impl Stream<Item = Result<SseEvent, axum::Error>> {
    BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(notice) => {
                let data = serde_json::to_string(&notice).ok()?;
                Some(Ok(SseEvent::default()
                    .event(event_type_name(notice.kind))
                    .data(data)))
            }
            Err(_) => None,
        }
    })
}

/// GET /api/events/stream - SSE endpoint for change notices.
pub async fn event_stream(State(state): State<SharedState>) -> impl IntoResponse {
    let stream = notice_stream_from_receiver(state.ledger.subscribe());
    Sse::new(stream).keep_alive(KeepAlive::default())
}
