//! Parser for the AI SDK data stream protocol.
//!
//! Each line is `<code>:<json>`:
//!
//! | Code | Part |
//! |------|------|
//! | `0` | text delta (JSON string) |
//! | `9` | complete tool call |
//! | `b` | tool call streaming start |
//! | `c` | tool call argument delta |
//! | `a` | tool result |
//! | `3` | error (JSON string) |
//! | `d` | finish message |
//!
//! Other codes (step boundaries, data, annotations, reasoning) carry nothing
//! the protocol needs and are skipped.

use agentwire_core::{BackendError, BackendPart};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallLine {
    tool_call_id: String,
    tool_name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallStartLine {
    tool_call_id: String,
    tool_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallDeltaLine {
    tool_call_id: String,
    args_text_delta: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultLine {
    tool_call_id: String,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishLine {
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Parse one line of the data stream.
///
/// Returns `Ok(None)` for blank lines and codes that map to no part.
pub fn parse_line(line: &str) -> Result<Option<BackendPart>, BackendError> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (code, payload) = line
        .split_once(':')
        .ok_or_else(|| BackendError::Protocol(format!("missing type prefix: {}", line)))?;

    let part = match code {
        "0" => BackendPart::Text(parse(code, payload)?),
        "9" => {
            let call: ToolCallLine = parse(code, payload)?;
            BackendPart::ToolCall {
                tool_call_id: call.tool_call_id,
                tool_name: call.tool_name,
                args: call.args,
            }
        }
        "b" => {
            let start: ToolCallStartLine = parse(code, payload)?;
            BackendPart::ToolCallStreamingStart {
                tool_call_id: start.tool_call_id,
                tool_name: start.tool_name,
            }
        }
        "c" => {
            let delta: ToolCallDeltaLine = parse(code, payload)?;
            BackendPart::ToolCallDelta {
                tool_call_id: delta.tool_call_id,
                args_text_delta: delta.args_text_delta,
            }
        }
        "a" => {
            let result: ToolResultLine = parse(code, payload)?;
            BackendPart::ToolResult {
                tool_call_id: result.tool_call_id,
                result: result.result,
            }
        }
        "3" => {
            let message: String = parse(code, payload)?;
            return Err(BackendError::Stream(message));
        }
        "d" => {
            let finish: FinishLine = parse(code, payload)?;
            BackendPart::Finish {
                reason: finish.finish_reason,
            }
        }
        other => {
            log::debug!("skipping data stream part with code '{}'", other);
            return Ok(None);
        }
    };

    Ok(Some(part))
}

fn parse<T: serde::de::DeserializeOwned>(code: &str, payload: &str) -> Result<T, BackendError> {
    serde_json::from_str(payload).map_err(|e| {
        BackendError::Protocol(format!("invalid '{}' part: {} ({})", code, e, payload))
    })
}

/// Splits a byte stream into data stream lines.
#[derive(Debug, Default)]
pub struct DataStreamDecoder {
    buffer: Vec<u8>,
}

impl DataStreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and parse every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<BackendPart, BackendError>> {
        self.buffer.extend_from_slice(chunk);

        let mut parts = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(part) = decode_line(&line[..end]).transpose() {
                parts.push(part);
            }
        }
        parts
    }

    /// Parse a final line that had no trailing newline.
    pub fn finish(&mut self) -> Option<Result<BackendPart, BackendError>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line).transpose()
    }
}

fn decode_line(line: &[u8]) -> Result<Option<BackendPart>, BackendError> {
    let line = std::str::from_utf8(line)
        .map_err(|e| BackendError::Protocol(format!("line is not valid UTF-8: {}", e)))?;
    parse_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_part() {
        assert_eq!(
            parse_line(r#"0:"Hello, ""#).unwrap(),
            Some(BackendPart::Text("Hello, ".to_string()))
        );
    }

    #[test]
    fn test_tool_call_part() {
        let part = parse_line(
            r#"9:{"toolCallId":"call_1","toolName":"weather","args":{"city":"Oslo"}}"#,
        )
        .unwrap();

        assert_eq!(
            part,
            Some(BackendPart::ToolCall {
                tool_call_id: "call_1".to_string(),
                tool_name: "weather".to_string(),
                args: json!({"city": "Oslo"}),
            })
        );
    }

    #[test]
    fn test_streaming_bookkeeping_parts() {
        assert!(matches!(
            parse_line(r#"b:{"toolCallId":"call_1","toolName":"weather"}"#).unwrap(),
            Some(BackendPart::ToolCallStreamingStart { .. })
        ));
        assert!(matches!(
            parse_line(r#"c:{"toolCallId":"call_1","argsTextDelta":"{\"ci"}"#).unwrap(),
            Some(BackendPart::ToolCallDelta { .. })
        ));
        assert!(matches!(
            parse_line(r#"a:{"toolCallId":"call_1","result":{"temp":4}}"#).unwrap(),
            Some(BackendPart::ToolResult { .. })
        ));
    }

    #[test]
    fn test_finish_message_part() {
        let part = parse_line(
            r#"d:{"finishReason":"stop","usage":{"promptTokens":10,"completionTokens":20}}"#,
        )
        .unwrap();
        assert_eq!(
            part,
            Some(BackendPart::Finish {
                reason: Some("stop".to_string())
            })
        );
    }

    #[test]
    fn test_step_parts_are_skipped() {
        assert_eq!(parse_line(r#"f:{"messageId":"step_1"}"#).unwrap(), None);
        assert_eq!(
            parse_line(r#"e:{"finishReason":"tool-calls","isContinued":false}"#).unwrap(),
            None
        );
        assert_eq!(parse_line("").unwrap(), None);
    }

    #[test]
    fn test_error_part() {
        let err = parse_line(r#"3:"model overloaded""#).unwrap_err();
        assert!(matches!(err, BackendError::Stream(msg) if msg == "model overloaded"));
    }

    #[test]
    fn test_malformed_parts() {
        assert!(matches!(
            parse_line("no prefix here"),
            Err(BackendError::Protocol(_))
        ));
        assert!(matches!(
            parse_line(r#"9:{"toolName":"x"}"#),
            Err(BackendError::Protocol(_))
        ));
    }

    #[test]
    fn test_decoder_handles_split_lines() {
        let body = "0:\"Hel\"\n0:\"lo\"\r\nd:{\"finishReason\":\"stop\"}\n";
        let bytes = body.as_bytes();

        for split in 0..=bytes.len() {
            let mut decoder = DataStreamDecoder::new();
            let mut parts = decoder.push(&bytes[..split]);
            parts.extend(decoder.push(&bytes[split..]));
            assert!(decoder.finish().is_none());

            let parts: Vec<BackendPart> = parts.into_iter().map(Result::unwrap).collect();
            assert_eq!(parts.len(), 3, "split at {}", split);
            assert_eq!(parts[1], BackendPart::Text("lo".to_string()));
        }
    }

    #[test]
    fn test_decoder_finish_parses_trailing_line() {
        let mut decoder = DataStreamDecoder::new();
        assert!(decoder.push(b"0:\"tail\"").is_empty());
        assert_eq!(
            decoder.finish().unwrap().unwrap(),
            BackendPart::Text("tail".to_string())
        );
    }
}
