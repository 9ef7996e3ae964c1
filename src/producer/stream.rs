//! Async driver that feeds a producer's chunks to an HTTP body.

use super::{ProducerError, ProducerMode, StreamProducer};
use crate::metrics::StreamMetrics;
use bytes::Bytes;
use futures::Stream;
use std::sync::Arc;

/// Pull-based async sequence of encoded chunks.
///
/// Capture, transform and encode run on the blocking pool; pacing sleeps on
/// the tokio timer. Nothing runs between pulls, so a client that stops
/// reading stops its producer, and dropping the stream (as hyper does when
/// the client disconnects) ends it for good.
pub struct FrameStream {
    producer: Option<StreamProducer>,
    metrics: Arc<StreamMetrics>,
    mode: ProducerMode,
    emitted: u64,
}

impl FrameStream {
    pub fn new(producer: StreamProducer) -> Self {
        let metrics = Arc::clone(&producer.metrics);
        let mode = producer.mode();
        if mode == ProducerMode::Stream {
            metrics.stream_opened();
            tracing::debug!("Stream client connected");
        }

        Self {
            producer: Some(producer),
            metrics,
            mode,
            emitted: 0,
        }
    }

    /// Waits out pacing and produces the next chunk.
    ///
    /// Returns `None` once the producer is done. After an error the stream
    /// yields nothing further.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, ProducerError>> {
        let mut producer = self.producer.take()?;

        if let Some(started) = producer.enter_pacing() {
            producer.pacer().pace(started).await;
        }

        let joined = tokio::task::spawn_blocking(move || {
            let result = producer.produce();
            (producer, result)
        })
        .await;

        match joined {
            Ok((producer, Ok(Some(chunk)))) => {
                if !producer.is_finished() {
                    self.producer = Some(producer);
                }
                self.emitted += 1;
                Some(Ok(chunk))
            }
            Ok((_, Ok(None))) => None,
            Ok((_, Err(e))) => Some(Err(e)),
            Err(e) => Some(Err(ProducerError::Task(e.to_string()))),
        }
    }

    /// Converts into a `futures` stream suitable for a streaming response body.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, ProducerError>> + Send + 'static {
        futures::stream::unfold(self, |mut frames| async move {
            let item = frames.next_chunk().await?;
            Some((item, frames))
        })
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.as_mut() {
            producer.finish();
        }
        if self.mode == ProducerMode::Stream {
            self.metrics.stream_closed();
            tracing::debug!(frames = self.emitted, "Stream client disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{share, MockCamera};
    use crate::config::Config;
    use futures::StreamExt;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn producer(camera: MockCamera, framerate: u32, mode: ProducerMode) -> StreamProducer {
        let mut config = Config::default();
        config.stream.framerate = framerate;
        StreamProducer::new(
            share(camera),
            Arc::new(config),
            Arc::new(StreamMetrics::new().unwrap()),
            mode,
        )
    }

    #[tokio::test]
    async fn test_snapshot_stream_ends() {
        let mut frames = FrameStream::new(producer(MockCamera::default(), 60, ProducerMode::Snapshot));

        let jpeg = frames.next_chunk().await.unwrap().unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert!(frames.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_stops_capture() {
        let camera = MockCamera::default();
        let captures = camera.capture_counter();
        let stream = FrameStream::new(producer(camera, 0, ProducerMode::Stream)).into_stream();

        let taken: Vec<_> = stream.take(3).collect().await;
        assert_eq!(taken.len(), 3);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(captures.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let camera = MockCamera::default().fail_on_capture(2);
        let chunks: Vec<_> = FrameStream::new(producer(camera, 0, ProducerMode::Stream))
            .into_stream()
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(chunks[1].is_err());
    }

    #[tokio::test]
    async fn test_active_stream_gauge() {
        let metrics = Arc::new(StreamMetrics::new().unwrap());
        let producer = StreamProducer::new(
            share(MockCamera::default()),
            Arc::new(Config::default()),
            Arc::clone(&metrics),
            ProducerMode::Stream,
        );

        let frames = FrameStream::new(producer);
        assert_eq!(metrics.active_streams(), 1);
        drop(frames);
        assert_eq!(metrics.active_streams(), 0);
    }

    #[tokio::test]
    async fn test_async_pacing() {
        let mut frames = FrameStream::new(producer(MockCamera::default(), 25, ProducerMode::Stream));

        let started = tokio::time::Instant::now();
        for _ in 0..3 {
            frames.next_chunk().await.unwrap().unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
