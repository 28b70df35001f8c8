//! Server-Sent Events framing.
//!
//! Line splitting and field parsing are done by `eventsource-stream`; this
//! module adapts its events and errors to the client's own types.

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};

use super::transport::TransportError;

/// Event name used when a frame carries no `event:` field.
pub const DEFAULT_EVENT: &str = "message";

/// One dispatched server-push event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
    /// Server-suggested reconnection time, in milliseconds
    pub retry: Option<u64>,
}

impl SseEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }
}

impl From<eventsource_stream::Event> for SseEvent {
    fn from(event: eventsource_stream::Event) -> Self {
        Self {
            event: if event.event.is_empty() {
                DEFAULT_EVENT.to_string()
            } else {
                event.event
            },
            data: event.data,
            id: Some(event.id).filter(|id| !id.is_empty()),
            retry: event.retry.map(|d| d.as_millis() as u64),
        }
    }
}

fn read_error(e: EventStreamError<TransportError>) -> TransportError {
    match e {
        EventStreamError::Transport(e) => e,
        other => TransportError::Read(other.to_string()),
    }
}

/// Adapt a byte stream into a stream of parsed events.
///
/// The first error, from the transport or from framing, is forwarded and
/// ends the stream.
pub fn sse_events<S>(bytes: S) -> impl Stream<Item = Result<SseEvent, TransportError>>
where
    S: Stream<Item = Result<Vec<u8>, TransportError>> + Unpin,
{
    async_stream::stream! {
        let mut events = bytes.eventsource();
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => yield Ok(SseEvent::from(event)),
                Err(e) => {
                    yield Err(read_error(e));
                    return;
                }
            }
        }
    }
}
