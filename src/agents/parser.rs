//! Structured response extraction
//!
//! Models wrap their JSON in prose and markdown fences. [`ResponseParser::extract`]
//! is a best-effort slice of the likely payload; strict parsing happens afterwards
//! in [`ResponseParser::parse_json`], which reports failures as [`ParseError`].

use crate::log_debug;
use serde::de::DeserializeOwned;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Failure to turn extracted text into the expected payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The extracted text is not valid JSON for the target type
    #[error("malformed structured response: {0}")]
    Malformed(String),
    /// The payload parsed but lacks a field the pipeline depends on
    #[error("structured response is missing required field '{0}'")]
    MissingField(&'static str),
}

/// Response parser for LLM payloads embedded in free text
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Slice the likely structured payload out of `raw_text`.
    ///
    /// 1. A ```` ```json ```` fenced block wins: its interior is used.
    /// 2. Otherwise any generic fence markers are stripped.
    /// 3. The result is cut from the first `{` to the last `}`; when no such
    ///    span exists the trimmed text is returned unchanged.
    pub fn extract(&self, raw_text: &str) -> String {
        log_debug!("Parser: extracting payload from {} chars", raw_text.len());

        let unfenced = if let Some(interior) = Self::json_fence_interior(raw_text) {
            log_debug!("Parser: found ```json block");
            interior.to_string()
        } else {
            raw_text.replace(FENCE, "")
        };
        let trimmed = unfenced.trim();

        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if end > start => trimmed[start..=end].to_string(),
            _ => {
                log_debug!("Parser: no JSON object span found");
                trimmed.to_string()
            }
        }
    }

    /// Extract then strictly parse `raw_text` as `T`
    pub fn parse_json<T: DeserializeOwned>(&self, raw_text: &str) -> Result<T, ParseError> {
        let payload = self.extract(raw_text);
        log_debug!(
            "Parser: extracted payload preview: {}",
            payload.chars().take(150).collect::<String>()
        );
        serde_json::from_str(&payload).map_err(|e| ParseError::Malformed(e.to_string()))
    }

    /// Interior of the first ```` ```json ```` block; an unterminated block runs to the end
    fn json_fence_interior(text: &str) -> Option<&str> {
        let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
        let rest = &text[start..];
        Some(rest.find(FENCE).map_or(rest, |end| &rest[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_json_fence_still_yields_object() {
        let parser = ResponseParser::new();
        let raw = "```json\n{\"needs_refinement\": false}\n";
        assert_eq!(parser.extract(raw), "{\"needs_refinement\": false}");
    }

    #[test]
    fn generic_fence_is_stripped() {
        let parser = ResponseParser::new();
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(parser.extract(raw), "{\"a\": 1}");
    }

    #[test]
    fn reversed_braces_return_trimmed_text() {
        let parser = ResponseParser::new();
        assert_eq!(parser.extract("  } nothing here {  "), "} nothing here {");
    }

    #[test]
    fn prose_without_json_fails_to_parse() {
        let parser = ResponseParser::new();
        let result: Result<serde_json::Value, _> = parser.parse_json("I cannot help with that.");
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }
}
