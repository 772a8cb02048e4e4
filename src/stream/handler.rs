//! Ordered handler callbacks over a chat stream.

use futures_util::StreamExt;

use crate::error::LlmError;
use crate::stream::builder::{StreamResponseBuilder, StreamUpdate};
use crate::stream::events::{ChatStream, ChatStreamEvent};
use crate::types::{ChatResponse, ToolCall};

/// Callbacks invoked while a stream is consumed.
///
/// Partial callbacks fire in event arrival order. Exactly one of
/// `on_complete` / `on_error` fires per stream, after all partials.
#[allow(unused_variables)]
pub trait StreamHandler: Send {
    fn on_partial_text(&mut self, delta: &str) {}

    fn on_partial_thinking(&mut self, delta: &str) {}

    fn on_partial_tool_call(
        &mut self,
        id: &str,
        function_name: Option<&str>,
        arguments_delta: Option<&str>,
    ) {
    }

    fn on_complete_tool_call(&mut self, tool_call: &ToolCall) {}

    fn on_complete(&mut self, response: &ChatResponse) {}

    fn on_error(&mut self, error: &LlmError) {}
}

/// Consume a stream, fanning events out to the handler.
///
/// Returns the final response. The terminal callback fires from a single
/// match over the outcome, so a handler sees exactly one of
/// `on_complete` / `on_error` regardless of how the stream ends.
pub async fn drive_stream<H>(mut stream: ChatStream, handler: &mut H) -> Result<ChatResponse, LlmError>
where
    H: StreamHandler + ?Sized,
{
    let mut builder = StreamResponseBuilder::new();
    let mut final_response: Option<ChatResponse> = None;
    let mut failure: Option<LlmError> = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => {
                if let ChatStreamEvent::ToolCallDelta {
                    id,
                    function_name,
                    arguments_delta,
                    ..
                } = &event
                {
                    handler.on_partial_tool_call(
                        id,
                        function_name.as_deref(),
                        arguments_delta.as_deref(),
                    );
                }
                match &event {
                    ChatStreamEvent::StreamEnd { response } => {
                        final_response = Some(response.clone());
                    }
                    ChatStreamEvent::Error { error } => {
                        failure = Some(LlmError::StreamError(error.clone()));
                        break;
                    }
                    _ => {}
                }
                match builder.append(&event) {
                    Some(StreamUpdate::Text(delta)) => handler.on_partial_text(&delta),
                    Some(StreamUpdate::Thinking(delta)) => handler.on_partial_thinking(&delta),
                    Some(StreamUpdate::ToolCallCompleted(call)) => {
                        handler.on_complete_tool_call(&call)
                    }
                    Some(StreamUpdate::ThinkingSignature(_)) | None => {}
                }
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let outcome = match failure {
        Some(e) => Err(e),
        // Prefer the converter-built response; fall back to the local
        // accumulator when the stream ended without a terminal event.
        None => match final_response {
            Some(response) => Ok(response),
            None => builder.build(),
        },
    };

    match outcome {
        Ok(response) => {
            handler.on_complete(&response);
            Ok(response)
        }
        Err(e) => {
            handler.on_error(&e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishReason, ResponseMetadata};

    #[derive(Default)]
    struct RecordingHandler {
        partial_text: Vec<String>,
        partial_thinking: Vec<String>,
        completed_tools: Vec<ToolCall>,
        completes: u32,
        errors: u32,
    }

    impl StreamHandler for RecordingHandler {
        fn on_partial_text(&mut self, delta: &str) {
            self.partial_text.push(delta.to_string());
        }

        fn on_partial_thinking(&mut self, delta: &str) {
            self.partial_thinking.push(delta.to_string());
        }

        fn on_complete_tool_call(&mut self, tool_call: &ToolCall) {
            self.completed_tools.push(tool_call.clone());
        }

        fn on_complete(&mut self, _response: &ChatResponse) {
            self.completes += 1;
        }

        fn on_error(&mut self, _error: &LlmError) {
            self.errors += 1;
        }
    }

    fn stream_of(events: Vec<Result<ChatStreamEvent, LlmError>>) -> ChatStream {
        Box::pin(futures::stream::iter(events))
    }

    #[tokio::test]
    async fn fires_partials_in_order_and_one_complete() {
        let events = vec![
            Ok(ChatStreamEvent::StreamStart {
                metadata: ResponseMetadata::default(),
            }),
            Ok(ChatStreamEvent::ThinkingDelta {
                delta: "hmm".to_string(),
            }),
            Ok(ChatStreamEvent::ContentDelta {
                delta: "Hello".to_string(),
                index: Some(0),
            }),
            Ok(ChatStreamEvent::ContentDelta {
                delta: " world".to_string(),
                index: Some(0),
            }),
        ];
        let mut handler = RecordingHandler::default();
        let response = drive_stream(stream_of(events), &mut handler).await.unwrap();

        assert_eq!(handler.partial_text, vec!["Hello", " world"]);
        assert_eq!(handler.partial_thinking, vec!["hmm"]);
        assert_eq!(handler.completes, 1);
        assert_eq!(handler.errors, 0);
        assert_eq!(response.text.as_deref(), Some("Hello world"));
    }

    #[tokio::test]
    async fn stream_error_fires_exactly_one_error_callback() {
        let events = vec![
            Ok(ChatStreamEvent::ContentDelta {
                delta: "partial".to_string(),
                index: Some(0),
            }),
            Err(LlmError::StreamError("connection lost".to_string())),
        ];
        let mut handler = RecordingHandler::default();
        let result = drive_stream(stream_of(events), &mut handler).await;

        assert!(result.is_err());
        assert_eq!(handler.completes, 0);
        assert_eq!(handler.errors, 1);
    }

    #[tokio::test]
    async fn empty_stream_fails_with_protocol_violation() {
        let mut handler = RecordingHandler::default();
        let result = drive_stream(stream_of(Vec::new()), &mut handler).await;

        assert!(matches!(result, Err(LlmError::StreamError(_))));
        assert_eq!(handler.completes, 0);
        assert_eq!(handler.errors, 1);
    }

    #[tokio::test]
    async fn prefers_terminal_event_response() {
        let final_response = ChatResponse {
            id: Some("msg_1".to_string()),
            model: Some("m".to_string()),
            text: Some("done".to_string()),
            thinking: None,
            thinking_signature: None,
            tool_calls: Vec::new(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        };
        let events = vec![
            Ok(ChatStreamEvent::ContentDelta {
                delta: "done".to_string(),
                index: Some(0),
            }),
            Ok(ChatStreamEvent::StreamEnd {
                response: final_response.clone(),
            }),
        ];
        let mut handler = RecordingHandler::default();
        let response = drive_stream(stream_of(events), &mut handler).await.unwrap();
        assert_eq!(response, final_response);
        assert_eq!(handler.completes, 1);
    }

    #[tokio::test]
    async fn completed_tool_calls_reach_the_handler() {
        let events = vec![
            Ok(ChatStreamEvent::ToolCallDelta {
                id: "call_1".to_string(),
                function_name: Some("lookup".to_string()),
                arguments_delta: Some("{\"q\":\"rust\"}".to_string()),
                index: Some(0),
            }),
            Ok(ChatStreamEvent::ToolCallEnd { index: 0 }),
        ];
        let mut handler = RecordingHandler::default();
        let response = drive_stream(stream_of(events), &mut handler).await.unwrap();

        assert_eq!(handler.completed_tools.len(), 1);
        assert_eq!(handler.completed_tools[0].name, "lookup");
        assert!(response.has_tool_calls());
        assert_eq!(response.text, None);
    }
}
