//! Lazy fragment stream over a raw response body

use crate::decoder::FrameDecoder;
use crate::http::ResponseStream;
use bytes::Bytes;
use futures_core::Stream;
use parley_core::{Error, Fragment};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

/// Decodes a byte stream into fragments as the bytes arrive
///
/// Yields text fragments in decode order, then one end-of-stream fragment
/// once the body is exhausted. The first error ends the stream, after any
/// fragments decoded ahead of it have been yielded.
pub struct DecodedStream {
    inner: ResponseStream,
    decoder: FrameDecoder,
    pending: VecDeque<Fragment>,
    failure: Option<Error>,
    done: bool,
}

impl DecodedStream {
    /// Wrap a response body
    pub fn new(inner: ResponseStream, decoder: FrameDecoder) -> Self {
        Self {
            inner,
            decoder,
            pending: VecDeque::new(),
            failure: None,
            done: false,
        }
    }

    /// Wrap any stream of byte chunks
    pub fn from_stream<S>(inner: S, decoder: FrameDecoder) -> Self
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + 'static,
    {
        Self::new(Box::pin(inner), decoder)
    }

    /// Malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.decoder.skipped()
    }
}

impl Stream for DecodedStream {
    type Item = Result<Fragment, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if let Some(fragment) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(fragment)));
            }
            if this.done {
                return Poll::Ready(this.failure.take().map(Err));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    trace!(bytes = chunk.len(), "Received upstream chunk");
                    if let Err(e) = this.decoder.decode_into(&chunk, &mut this.pending) {
                        this.done = true;
                        this.failure = Some(e);
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    match this.decoder.finish() {
                        Ok(fragments) => this.pending.extend(fragments),
                        Err(e) => this.failure = Some(e),
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, StreamExt};
    use pretty_assertions::assert_eq;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, Error>> + Send {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok::<_, Error>(Bytes::from(*p)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_stream_yields_fragments_then_end() {
        let stream = DecodedStream::from_stream(
            chunks(&["{\"t\":\"He\"}\n{\"t\"", ":\"llo\"}\n"]),
            FrameDecoder::new("t"),
        );
        let out: Vec<_> = stream.map(|f| f.unwrap()).collect().await;

        assert_eq!(
            out,
            vec![Fragment::text("He"), Fragment::text("llo"), Fragment::end()]
        );
    }

    #[tokio::test]
    async fn test_stream_skips_malformed_lines() {
        let mut stream = DecodedStream::from_stream(
            chunks(&["{\"t\":\"a\"}\n<html>\n", "{\"t\":\"b\"}\n"]),
            FrameDecoder::new("t"),
        );
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.unwrap().text);
        }

        assert_eq!(out, vec!["a", "b", ""]);
        assert_eq!(stream.skipped(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"t\":\"a\"}\n")),
            Err(Error::UpstreamStream("connection reset".into())),
            Ok(Bytes::from_static(b"{\"t\":\"b\"}\n")),
        ]);
        let out: Vec<_> = DecodedStream::from_stream(body, FrameDecoder::new("t"))
            .collect()
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Ok(Fragment::text("a")));
        assert_eq!(out[1], Err(Error::UpstreamStream("connection reset".into())));
    }

    #[tokio::test]
    async fn test_in_band_error_after_text_in_same_chunk() {
        let out: Vec<_> = DecodedStream::from_stream(
            chunks(&["{\"t\":\"par\"}\n{\"error\":\"out of memory\"}\n{\"t\":\"x\"}\n"]),
            FrameDecoder::new("t"),
        )
        .collect()
        .await;

        assert_eq!(
            out,
            vec![
                Ok(Fragment::text("par")),
                Err(Error::UpstreamStream("out of memory".into()))
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_body_yields_only_end() {
        let out: Vec<_> = DecodedStream::from_stream(chunks(&[]), FrameDecoder::new("t"))
            .collect()
            .await;
        assert_eq!(out, vec![Ok(Fragment::end())]);
    }
}
