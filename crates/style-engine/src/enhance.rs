use std::collections::HashSet;

const BREATH_THRESHOLD_WORDS: usize = 20;

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("NLP", "N L P"),
    ("LLM", "L L M"),
    ("GPU", "G P U"),
    ("API", "A P I"),
];

/// Inserts style-appropriate filler at clause boundaries, spells out an
/// abbreviation's disambiguated pronunciation the first time it's seen in a
/// segment (tracked via `seen_abbreviations`), and inserts a breathing-pause
/// token at the nearest clause boundary past the 20-word mark for long
/// lines. Never reorders or drops words — insertion only — which is what
/// makes repeated arrangement idempotent.
pub fn enhance_line(text: &str, energy: f32, seen_abbreviations: &mut HashSet<&'static str>) -> String {
    let mut result = expand_first_abbreviation(text, seen_abbreviations);

    if energy > 0.7 {
        result = insert_filler_at_first_comma(&result);
    }

    let word_count = result.split_whitespace().count();
    if word_count > BREATH_THRESHOLD_WORDS {
        result = insert_breathing_pause(&result);
    }

    result
}

fn expand_first_abbreviation(text: &str, seen: &mut HashSet<&'static str>) -> String {
    let mut result = text.to_string();
    for (abbr, expansion) in ABBREVIATIONS {
        if result.contains(abbr) && !seen.contains(abbr) {
            seen.insert(abbr);
            result = result.replacen(abbr, expansion, 1);
        }
    }
    result
}

fn insert_filler_at_first_comma(text: &str) -> String {
    match text.find(',') {
        Some(idx) => {
            let (before, after) = text.split_at(idx + 1);
            format!("{before} well,{after}")
        }
        None => text.to_string(),
    }
}

fn insert_breathing_pause(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut byte_offset = 0usize;
    let mut boundary_word_index = None;
    for (i, word) in words.iter().enumerate() {
        byte_offset += word.len() + 1;
        if i >= BREATH_THRESHOLD_WORDS
            && (word.ends_with(',') || word.ends_with('.') || word.ends_with(';'))
        {
            boundary_word_index = Some(i);
            break;
        }
    }
    let _ = byte_offset;
    match boundary_word_index {
        Some(i) => {
            let mut out = words[..=i].join(" ");
            out.push_str(" … ");
            out.push_str(&words[i + 1..].join(" "));
            out
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_abbreviation_only_on_first_occurrence() {
        let mut seen = HashSet::new();
        let first = expand_first_abbreviation("NLP models are great, NLP is everywhere", &mut seen);
        assert!(first.contains("N L P"));
        assert!(first.contains("NLP is everywhere"));
    }

    #[test]
    fn long_lines_get_a_breathing_pause() {
        let text = (0..25).map(|i| format!("word{i},")).collect::<Vec<_>>().join(" ");
        let enhanced = enhance_line(&text, 0.5, &mut HashSet::new());
        assert!(enhanced.contains('…'));
    }

    #[test]
    fn short_lines_are_untouched_structurally() {
        let mut seen = HashSet::new();
        let enhanced = enhance_line("short line here", 0.3, &mut seen);
        assert_eq!(enhanced, "short line here");
    }
}
