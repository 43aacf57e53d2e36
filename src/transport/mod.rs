//! `text/event-stream` decoding.
//!
//! The connection itself belongs to the caller. This module turns its byte
//! chunks into named frames and turns its failures into interruption signals.

use std::time::Duration;

use bytes::Bytes;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};

const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
    pub retry: Option<Duration>,
}

impl From<Event> for SseFrame {
    fn from(event: Event) -> Self {
        Self {
            event: if event.event.is_empty() {
                DEFAULT_EVENT.to_string()
            } else {
                event.event
            },
            data: event.data,
            id: Some(event.id).filter(|id| !id.is_empty()),
            retry: event.retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    Frame(SseFrame),
    Interrupted(String),
}

impl<E: std::fmt::Display> From<EventStreamError<E>> for TransportSignal {
    fn from(err: EventStreamError<E>) -> Self {
        match err {
            EventStreamError::Transport(err) => TransportSignal::Interrupted(err.to_string()),
            other => TransportSignal::Interrupted(other.to_string()),
        }
    }
}

/// Adapts a byte stream into transport signals. Chunks may split lines and
/// fields anywhere. A stream error, or bytes that do not decode as an event
/// stream, become an interruption.
pub fn decode_stream<S, E>(bytes: S) -> impl Stream<Item = TransportSignal>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    bytes.eventsource().map(|event| match event {
        Ok(event) => TransportSignal::Frame(event.into()),
        Err(err) => err.into(),
    })
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    async fn decode(chunks: &[&'static str]) -> Vec<TransportSignal> {
        let chunks: Vec<Result<Bytes, String>> = chunks
            .iter()
            .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
            .collect();
        decode_stream(stream::iter(chunks)).collect().await
    }

    fn frames(signals: Vec<TransportSignal>) -> Vec<SseFrame> {
        signals
            .into_iter()
            .filter_map(|signal| match signal {
                TransportSignal::Frame(frame) => Some(frame),
                TransportSignal::Interrupted(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn decodes_named_events() {
        let frames = frames(decode(&["event: leases\ndata: {\"a\":1}\n\n"]).await);
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "leases".into(),
                data: "{\"a\":1}".into(),
                id: None,
                retry: None,
            }]
        );
    }

    #[tokio::test]
    async fn joins_multi_line_data_and_defaults_event_name() {
        let frames = frames(decode(&["data: one\ndata:two\n\n"]).await);
        assert_eq!(frames[0].event, "message");
        assert_eq!(frames[0].data, "one\ntwo");
    }

    #[tokio::test]
    async fn handles_chunks_split_anywhere() {
        let frames = frames(decode(&["event: poli", "cies\r\nda", "ta: {}\r\n", "\r\n"]).await);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "policies");
        assert_eq!(frames[0].data, "{}");
    }

    #[tokio::test]
    async fn comments_are_skipped() {
        let frames = frames(decode(&[": keep-alive\n\nevent: leases\ndata: y\n\n"]).await);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "leases");
        assert_eq!(frames[0].data, "y");
    }

    #[tokio::test]
    async fn id_and_retry_are_parsed() {
        let frames = frames(decode(&["id: 7\nretry: 3000\ndata: a\n\ndata: b\n\n"]).await);
        assert_eq!(frames[0].id.as_deref(), Some("7"));
        assert_eq!(frames[0].retry, Some(Duration::from_millis(3000)));
        assert_eq!(frames[1].data, "b");
    }

    #[tokio::test]
    async fn stream_errors_become_interruptions() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"event: leases\ndata: {}\n\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"event: policies\ndata: {}\n\n")),
        ];
        let signals: Vec<TransportSignal> = decode_stream(stream::iter(chunks)).collect().await;
        assert_eq!(signals.len(), 3);
        assert!(matches!(&signals[0], TransportSignal::Frame(f) if f.event == "leases"));
        assert_eq!(
            signals[1],
            TransportSignal::Interrupted("connection reset".into())
        );
        assert!(matches!(&signals[2], TransportSignal::Frame(f) if f.event == "policies"));
    }
}
