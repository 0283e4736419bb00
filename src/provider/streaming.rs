//! SSE streaming response parser for OpenAI-compatible chat completions.
//!
//! Reads a `reqwest::Response` as a byte stream, splits on SSE boundaries
//! (`data: …\n\n`), parses each chunk as JSON, and yields the text delta of
//! each chunk as one token.

use futures::stream::{self, Stream, StreamExt};

use super::errors::ProviderError;
use super::types::{ChatCompletionChunk, ChatCompletionResponse};

// ─── SSE frame decoding ──────────────────────────────────────────────────────

/// One decoded SSE event.
#[derive(Debug, PartialEq)]
enum SseFrame {
    /// A text token carried in the chunk's delta.
    Token(String),
    /// The `[DONE]` sentinel — stream is complete.
    Done,
    /// Keep-alive, comment, or a chunk with no text delta.
    Empty,
}

/// Decode a single SSE event string (may contain multiple `data:` lines).
fn decode_event(event: &str) -> Result<SseFrame, ProviderError> {
    let mut data_content = String::new();

    for line in event.lines() {
        if let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
            let data = data.trim();
            if data == "[DONE]" {
                return Ok(SseFrame::Done);
            }
            data_content.push_str(data);
        }
        // Non-data lines (comments, event types) are ignored.
    }

    if data_content.is_empty() {
        return Ok(SseFrame::Empty);
    }

    let chunk: ChatCompletionChunk =
        serde_json::from_str(&data_content).map_err(|e| ProviderError::StreamError {
            reason: format!("failed to parse SSE chunk: {e} (data: {data_content})"),
        })?;

    let token = chunk
        .choices
        .first()
        .and_then(|c| c.delta.content.clone())
        .filter(|t| !t.is_empty());

    Ok(match token {
        Some(t) => SseFrame::Token(t),
        None => SseFrame::Empty,
    })
}

/// Pull the next complete `\n\n`-terminated event off the front of `buffer`.
fn next_event(buffer: &mut String) -> Option<String> {
    let end = buffer.find("\n\n")?;
    let event = buffer[..end].to_string();
    *buffer = buffer[end + 2..].to_string();
    Some(event)
}

// ─── Public entry points ─────────────────────────────────────────────────────

/// Parse raw SSE bytes into a stream of text tokens.
///
/// The stream terminates at `[DONE]`, at the end of the HTTP body, or at the
/// first unrecoverable parse error.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String, ProviderError>> {
    let byte_stream = response.bytes_stream();

    stream::unfold(
        (byte_stream, String::new(), false),
        |(mut byte_stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                while let Some(event) = next_event(&mut buffer) {
                    match decode_event(&event) {
                        Ok(SseFrame::Token(t)) => {
                            return Some((Ok(t), (byte_stream, buffer, false)))
                        }
                        Ok(SseFrame::Done) => return None,
                        Ok(SseFrame::Empty) => continue,
                        Err(e) => return Some((Err(e), (byte_stream, buffer, true))),
                    }
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(ProviderError::StreamError {
                                reason: format!("stream read error: {e}"),
                            }),
                            (byte_stream, buffer, true),
                        ));
                    }
                    None => {
                        // Body ended without [DONE] — flush any trailing event.
                        let trailing = buffer.trim().to_string();
                        buffer.clear();
                        if trailing.is_empty() {
                            return None;
                        }
                        return match decode_event(&trailing) {
                            Ok(SseFrame::Token(t)) => Some((Ok(t), (byte_stream, buffer, true))),
                            Ok(_) => None,
                            Err(e) => Some((Err(e), (byte_stream, buffer, true))),
                        };
                    }
                }
            }
        },
    )
}

/// Parse a non-streaming completion body into its text content.
pub fn parse_completion_response(body: &str, model: &str) -> Result<String, ProviderError> {
    let resp: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::StreamError {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp.choices.first().ok_or(ProviderError::StreamError {
        reason: "empty choices array".to_string(),
    })?;

    choice
        .message
        .content
        .clone()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ProviderError::EmptyCompletion {
            model: model.to_string(),
        })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
