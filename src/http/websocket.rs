//! Live status stream over WebSocket.
//!
//! # Data Flow
//! ```text
//! GET /query/stream?prompt=...
//!     → upgrade
//!     → fan-out runs in its own task, events through an mpsc channel
//!     → {"type":"status", ...} per event
//!     → {"type":"result","responses":[...]} once every backend settled
//!     → close
//! ```
//!
//! A client that disconnects early does not cancel the fan-out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::http::response::rank_by_confidence;
use crate::orchestrator::{Orchestrator, ResponseItem, StatusEvent};

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Status(StatusEvent),
    Result { responses: Vec<ResponseItem> },
}

/// Run a fan-out for `prompt`, streaming its progress to `socket`.
pub async fn stream_query(mut socket: WebSocket, orchestrator: Arc<Orchestrator>, prompt: String) {
    let mut frames = stream_frames(orchestrator, prompt);

    while let Some(frame) = frames.recv().await {
        if send_frame(&mut socket, &frame).await.is_err() {
            tracing::debug!("Stream client disconnected");
            return;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Start a fan-out in its own task and return its frames: one status frame
/// per event, then a single ranked result frame. The channel closes after the
/// result. Dropping the receiver does not cancel the fan-out.
pub fn stream_frames(
    orchestrator: Arc<Orchestrator>,
    prompt: String,
) -> mpsc::UnboundedReceiver<StreamFrame> {
    let (frames, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let observer = |event: StatusEvent| {
            let _ = frames.send(StreamFrame::Status(event));
        };
        let items = orchestrator.query_all(&prompt, Some(&observer)).await;
        if frames
            .send(StreamFrame::Result {
                responses: rank_by_confidence(items),
            })
            .is_err()
        {
            tracing::debug!("Fan-out finished after the stream closed");
        }
    });

    rx
}

async fn send_frame(socket: &mut WebSocket, frame: &StreamFrame) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shapes() {
        let status = serde_json::to_value(StreamFrame::Status(StatusEvent::error("alpha", "down")))
            .unwrap();
        assert_eq!(
            status,
            serde_json::json!({ "type": "status", "backend": "alpha", "state": "error", "error": "down" })
        );

        let result = serde_json::to_value(StreamFrame::Result { responses: Vec::new() }).unwrap();
        assert_eq!(result, serde_json::json!({ "type": "result", "responses": [] }));
    }
}
