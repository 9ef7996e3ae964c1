//! Route handlers.

use super::AppState;
use crate::producer::multipart::{JPEG_CONTENT_TYPE, STREAM_CONTENT_TYPE};
use crate::producer::{FrameStream, ProducerError, ProducerMode, StreamProducer};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::sync::Arc;

fn frames(state: &AppState, mode: ProducerMode) -> FrameStream {
    FrameStream::new(StreamProducer::new(
        Arc::clone(&state.source),
        Arc::clone(&state.config),
        Arc::clone(&state.metrics),
        mode,
    ))
}

fn failure(error: ProducerError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("Failed to produce frame: {}", error),
    )
        .into_response()
}

/// Handler for the /stream endpoint.
///
/// The first frame is produced before the response starts so that an
/// immediate capture failure still yields a 500. Later failures abort the
/// body mid-stream.
pub(super) async fn stream_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut frames = frames(&state, ProducerMode::Stream);

    let first = match frames.next_chunk().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(e)) => return failure(e),
        None => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    let body = futures::stream::once(async move { Ok::<_, ProducerError>(first) })
        .chain(frames.into_stream());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, STREAM_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache, no-store"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// Handler for the /snapshot endpoint.
pub(super) async fn snapshot_handler(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.snapshot_requested();
    let mut frames = frames(&state, ProducerMode::Snapshot);

    match frames.next_chunk().await {
        Some(Ok(jpeg)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, JPEG_CONTENT_TYPE)],
            jpeg,
        )
            .into_response(),
        Some(Err(e)) => failure(e),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Handler for the /metrics endpoint.
pub(super) async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
pub(super) async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
