use podcast_core::types::Speaker;

use crate::catalog::{HostRole, Style};
use crate::classify::{classify_content_type, ContentType};

/// Decides a content-driven speaker override: a question routes to the
/// questioner role, strong explanation/complex prose to the explainer role,
/// controversial content to the critical role — only when the style
/// actually declares that role for some host. Returns `None` to fall back
/// to alternation.
pub(crate) fn override_speaker(style: &Style, text: &str) -> Option<Speaker> {
    let trimmed = text.trim_end();
    if trimmed.ends_with('?') {
        return style.speaker_for_role(HostRole::Questioner);
    }
    match classify_content_type(text) {
        ContentType::Technical | ContentType::Complex => style.speaker_for_role(HostRole::Explainer),
        ContentType::Controversial => style.speaker_for_role(HostRole::Critical),
        _ => None,
    }
}

pub(crate) fn other(speaker: Speaker) -> Speaker {
    match speaker {
        Speaker::Host1 => Speaker::Host2,
        Speaker::Host2 => Speaker::Host1,
        Speaker::Narrator => Speaker::Narrator,
    }
}

/// Finds the nearest sentence boundary (`.`/`?`/`!` followed by whitespace)
/// at or after the midpoint and splits there. Falls back to a whitespace
/// split at the nearest word boundary if no sentence-ending punctuation is
/// found past the midpoint.
pub(crate) fn split_at_sentence_boundary(text: &str) -> (String, String) {
    let bytes = text.as_bytes();
    let midpoint = bytes.len() / 2;
    let mut split_at = None;
    for i in midpoint..bytes.len().saturating_sub(1) {
        if matches!(bytes[i], b'.' | b'?' | b'!') && bytes[i + 1] == b' ' {
            split_at = Some(i + 1);
            break;
        }
    }
    match split_at {
        Some(i) => (text[..i].trim().to_string(), text[i..].trim().to_string()),
        None => {
            let words: Vec<&str> = text.split_whitespace().collect();
            let half = words.len() / 2;
            (words[..half].join(" "), words[half..].join(" "))
        }
    }
}
