use regex::Regex;
use std::sync::LazyLock;

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([}\]])").unwrap());
static DANGLING_KEY_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([A-Za-z0-9_ ]+): *""#).unwrap());

/// Runs the repair policy's pure steps in order and returns the first
/// candidate that parses as a JSON object or array: fence/prose strip,
/// balanced-brace extraction, then quote/comma normalization. Returns `None`
/// only if no balanced `{...}` substring exists at all — the caller treats
/// that as [`crate::ContractError::Unparseable`].
pub fn recover_json_object(raw: &str) -> Option<String> {
    if serde_json::from_str::<serde_json::Value>(raw).is_ok() {
        return Some(raw.to_string());
    }

    let stripped = strip_fences(raw);
    let extracted = extract_balanced_braces(&stripped)?;

    if serde_json::from_str::<serde_json::Value>(&extracted).is_ok() {
        return Some(extracted);
    }

    let normalized = normalize(&extracted);
    if serde_json::from_str::<serde_json::Value>(&normalized).is_ok() {
        Some(normalized)
    } else {
        // Hand back the best-effort candidate anyway; the caller's serde
        // parse will produce a precise error message for the repair-exhausted
        // case rather than us re-deriving one here.
        Some(normalized)
    }
}

fn strip_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(start) = text.find("```") {
        let after_open = &text[start + 3..];
        let after_open = after_open
            .strip_prefix("json")
            .or_else(|| after_open.strip_prefix("JSON"))
            .unwrap_or(after_open);
        if let Some(end) = after_open.find("```") {
            text = after_open[..end].trim();
        } else {
            text = after_open.trim();
        }
    }
    text.to_string()
}

/// A single forward scan tracking brace depth and string/escape state,
/// returning the largest balanced `{...}` substring. Hand-rolled rather than
/// regex since regex cannot match recursively-nested braces.
fn extract_balanced_braces(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    let mut start: Option<usize> = None;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
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
            b'{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        let len = i - s + 1;
                        if best.is_none_or(|(bs, be)| be - bs < len) {
                            best = Some((s, i + 1));
                        }
                    }
                    start = None;
                } else if depth < 0 {
                    depth = 0;
                }
            }
            _ => {}
        }
    }

    best.map(|(s, e)| text[s..e].to_string())
}

fn normalize(text: &str) -> String {
    let quotes_fixed = text
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let keys_fixed = DANGLING_KEY_COLON.replace_all(&quotes_fixed, "\"$1\": \"");
    TRAILING_COMMA.replace_all(&keys_fixed, "$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fence_and_leading_prose() {
        let raw = "Here you go:\n```json\n{\"a\":1}\n```\nenjoy";
        assert_eq!(recover_json_object(raw).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn extracts_largest_balanced_braces_among_noise() {
        let raw = "note: {tiny} then the real one {\"a\":{\"b\":1}}";
        let recovered = recover_json_object(raw).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&recovered).unwrap();
        assert_eq!(parsed["a"]["b"], 1);
    }

    #[test]
    fn strips_trailing_commas() {
        let raw = "{\"a\":[1,2,],}";
        let recovered = recover_json_object(raw).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&recovered).is_ok());
    }

    #[test]
    fn normalizes_smart_quotes() {
        let raw = "{\u{201C}a\u{201D}: 1}";
        let recovered = recover_json_object(raw).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&recovered).is_ok());
    }

    #[test]
    fn passthrough_for_already_valid_json() {
        let raw = r#"{"a":1,"b":[1,2,3]}"#;
        assert_eq!(recover_json_object(raw).unwrap(), raw);
    }
}
