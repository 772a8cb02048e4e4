//! SSE frame decoding into chat stream events.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use crate::error::LlmError;
use crate::stream::events::{ChatStream, ChatStreamEvent};

/// Converts provider SSE frames into chat stream events.
///
/// Converters are single-owner state machines: they accumulate per-stream
/// state behind `&mut self` and are consumed by one stream.
pub trait SseEventConverter: Send {
    /// Convert one SSE frame into zero or more events
    fn convert_event(
        &mut self,
        event: &eventsource_stream::Event,
    ) -> Vec<Result<ChatStreamEvent, LlmError>>;

    /// Called once when the underlying byte stream is exhausted, for
    /// providers that do not signal termination in-band
    fn handle_stream_end(&mut self) -> Vec<Result<ChatStreamEvent, LlmError>> {
        Vec::new()
    }
}

/// Turn an SSE HTTP response body into a [`ChatStream`] using a converter.
pub fn sse_stream<C>(response: reqwest::Response, mut converter: C) -> ChatStream
where
    C: SseEventConverter + 'static,
{
    let stream = async_stream::stream! {
        let mut frames = response.bytes_stream().eventsource();
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(frame) => {
                    for item in converter.convert_event(&frame) {
                        yield item;
                    }
                }
                Err(e) => {
                    yield Err(LlmError::StreamError(format!("SSE stream error: {e}")));
                }
            }
        }
        for item in converter.handle_stream_end() {
            yield item;
        }
    };
    Box::pin(stream)
}
