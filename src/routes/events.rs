use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};

use crate::router::AppState;

/// Streams row-level change events to list views. Purely a cache-patch
/// convenience; clients may drop the stream and re-fetch at any time.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.feed.subscribe()).filter_map(|event| match event {
        Ok(change) => Event::default()
            .event(change.table)
            .json_data(&change)
            .ok()
            .map(Ok),
        // A lagged subscriber just misses events; the store is authoritative.
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
