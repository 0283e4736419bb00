//! Loose JSON decoding for model output.
//!
//! Model responses that should be JSON often arrive wrapped in prose or code
//! fences. Decoding tries the whole text first, then the first balanced
//! brace-delimited substring.

use serde::de::DeserializeOwned;

/// Decode `text` as `T`: direct decode first, then the first balanced
/// `{…}` block found anywhere in the text.
pub fn decode_loose<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    let block = first_json_object(trimmed)?;
    serde_json::from_str(block).ok()
}

/// The first balanced brace-delimited substring of `text`, tracking string
/// literals and escapes so braces inside strings don't count.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Probe {
        title: String,
    }

    #[test]
    fn test_direct_decode() {
        let probe: Probe = decode_loose(r#"{"title": "buy milk"}"#).unwrap();
        assert_eq!(probe.title, "buy milk");
    }

    #[test]
    fn test_decode_inside_prose() {
        let text = "Sure! Here is the JSON you asked for:\n{\"title\": \"buy milk\"}\nLet me know.";
        let probe: Probe = decode_loose(text).unwrap();
        assert_eq!(probe.title, "buy milk");
    }

    #[test]
    fn test_decode_inside_code_fence() {
        let text = "```json\n{\"title\": \"buy milk\"}\n```";
        let probe: Probe = decode_loose(text).unwrap();
        assert_eq!(probe.title, "buy milk");
    }

    #[test]
    fn test_nested_braces() {
        let text = r#"prefix {"title": "a", "extra": {"k": "v"}} suffix"#;
        assert_eq!(
            first_json_object(text).unwrap(),
            r#"{"title": "a", "extra": {"k": "v"}}"#
        );
    }

    #[test]
    fn test_brace_inside_string_not_counted() {
        let text = r#"{"title": "odd } brace"}"#;
        let probe: Probe = decode_loose(text).unwrap();
        assert_eq!(probe.title, "odd } brace");
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert!(first_json_object(r#"{"title": "never closed"#).is_none());
        assert!(decode_loose::<Probe>("no json at all").is_none());
    }

    #[test]
    fn test_missing_required_field_fails_decode() {
        assert!(decode_loose::<Probe>(r#"{"other": 1}"#).is_none());
    }
}
