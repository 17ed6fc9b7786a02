//! Shared lenient-JSON extraction (§4.3): strips code-fence wrappers, locates
//! the first balanced `{...}` object (respecting quoted strings), then hands
//! that slice to `serde_json`. C3 itself never validates JSON shape — this
//! is the one shared helper every caller (C4, C5, C7) routes through so the
//! same "noisy LLM text" tolerance applies everywhere.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_lang_tag = match body.find('\n') {
        Some(i) => &body[i + 1..],
        None => body,
    };
    after_lang_tag.strip_suffix("```").unwrap_or(after_lang_tag).trim()
}

/// Finds the first balanced `{...}` object in `text`, ignoring braces inside
/// quoted strings.
pub fn extract_json_object(text: &str) -> Result<&str, LlmError> {
    let cleaned = strip_code_fences(text);
    let start = cleaned.find('{').ok_or(LlmError::NoJsonObject)?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in cleaned.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&cleaned[start..=i]);
                }
            }
            _ => {}
        }
    }
    Err(LlmError::NoJsonObject)
}

/// Extracts the first JSON object from `text` and deserializes it.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let object = extract_json_object(text)?;
    serde_json::from_str(object).map_err(|e| LlmError::Schema(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        a: i32,
    }

    #[test]
    fn extracts_plain_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn strips_fenced_code_block() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(text).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"noise {"a": 1, "note": "uses { and } inside"} trailing"#;
        let object = extract_json_object(text).unwrap();
        let parsed: Sample = serde_json::from_str(object).unwrap();
        assert_eq!(parsed, Sample { a: 1 });
    }

    #[test]
    fn no_object_is_an_error() {
        assert!(extract_json_object("not json at all").is_err());
    }

    #[test]
    fn unbalanced_object_is_an_error() {
        assert!(extract_json_object(r#"{"a": 1"#).is_err());
    }

    #[test]
    fn parse_json_round_trips() {
        let parsed: Sample = parse_json(r#"garbage prefix {"a": 7} garbage suffix"#).unwrap();
        assert_eq!(parsed, Sample { a: 7 });
    }
}
