//! JSON extraction from free-form generator output

use lamad_sync::LamadError;
use serde::de::DeserializeOwned;

/// First balanced `{...}` substring of `raw`.
///
/// Braces inside JSON string literals (including escaped quotes) do not count
/// toward the balance. Returns `None` when no opening brace is ever closed.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = raw[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = find_matching_brace(raw, start) {
            return Some(&raw[start..=end]);
        }
        search_from = start + 1;
    }

    None
}

fn find_matching_brace(raw: &str, open_pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw[open_pos..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open_pos + i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extract and deserialize the first JSON object in `raw`.
pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T, LamadError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| LamadError::UpstreamParse("no JSON object in response".into()))?;
    serde_json::from_str(json).map_err(|e| LamadError::UpstreamParse(e.to_string()))
}
