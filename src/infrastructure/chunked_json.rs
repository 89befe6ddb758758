// Chunked JSON frame streaming utilities
use crate::domain::stream::FrameMessage;
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use tokio::io::AsyncReadExt;

pub const FRAME_CONTENT_TYPE: &str = "application/x-frame-stream";

/// Create a chunked frame streaming response
pub async fn chunked_frame_stream<S>(
    stream: S,
    compress: bool,
) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = FrameMessage> + Send + 'static,
{
    let byte_stream = stream.then(move |msg| async move { serialize_chunk(&msg, compress).await });

    let body = Body::from_stream(byte_stream);

    // Chunks are compressed individually, so no Content-Encoding on the response itself
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, FRAME_CONTENT_TYPE)
        .header(header::TRANSFER_ENCODING, "chunked");

    response
        .body(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single FrameMessage to a length-prefixed chunk
pub async fn serialize_chunk(msg: &FrameMessage, compress: bool) -> Result<Bytes, std::io::Error> {
    // 1. Serialize to JSON
    let buffer = serde_json::to_vec(msg)?;

    // 2. Optionally compress
    let payload = if compress {
        brotli_compress(buffer).await?
    } else {
        buffer
    };

    // 3. Prepend length (4 bytes, big-endian)
    let length = payload.len() as u32;
    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(length);
    chunk.put_slice(&payload);

    Ok(chunk.freeze())
}

pub async fn brotli_compress(bytes: Vec<u8>) -> Result<Vec<u8>, std::io::Error> {
    let cursor = std::io::Cursor::new(bytes);
    let mut encoder = BrotliEncoder::new(cursor);
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

/// Helper to create a streaming response from a receiver
pub async fn stream_from_receiver(
    mut rx: tokio::sync::mpsc::Receiver<FrameMessage>,
    compress: bool,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        while let Some(msg) = rx.recv().await {
            yield msg;
        }
    };

    match chunked_frame_stream(stream, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
