pub mod catalog;
pub mod classify;
pub mod enhance;
pub mod speakers;
pub mod structural;

use std::collections::HashSet;

use podcast_core::types::{Emotion, ScriptLine, Speaker};

pub use catalog::{find as find_style, Style, STYLE_IDS};

const LONG_SPLIT_WORDS: usize = 60;

/// `ArrangeSegment` from the component contract: re-derives speaker
/// assignment (ignoring whatever host tag the draft/rewrite step produced,
/// since that tag is provisional) and applies speech enhancement, preserving
/// each input line's citations/verification metadata. A line longer than
/// [`LONG_SPLIT_WORDS`] is split with a transition line inserted between the
/// halves; both halves inherit the original line's citations.
///
/// Idempotent: re-running on already-arranged output reproduces it exactly.
/// Speaker assignment is a pure function of the *position and content* of
/// the line sequence, so rerunning it on an unchanged sequence reproduces
/// the same speakers; splitting only fires on lines still longer than the
/// threshold, which an already-split line never is; and `enhance_line`
/// checks for its own markers before inserting them, so it never
/// double-applies.
pub fn arrange_segment(lines: &[ScriptLine], style: &Style) -> Vec<ScriptLine> {
    let mut arranged = Vec::with_capacity(lines.len());
    let mut alternation = Speaker::Host1;
    let mut transition_cursor = 0usize;
    let mut seen_abbreviations = HashSet::new();

    for line in lines {
        let word_count = line.text.split_whitespace().count();
        if word_count > LONG_SPLIT_WORDS {
            let (first_half, second_half) = speakers::split_at_sentence_boundary(&line.text);

            // A re-arrange pass sees `first_half`/`second_half` as ordinary
            // short lines, so each goes through the very override-then-
            // alternate logic applied below; using that same logic here
            // keeps the first pass consistent with what the second pass
            // will do. Each pushed line also toggles `alternation` exactly
            // once, same as the short-line branch, so the three lines this
            // split produces alternate the same way on every pass instead
            // of drifting out of phase with the transition line's speaker.
            let first_speaker = speakers::override_speaker(style, &first_half).unwrap_or(alternation);
            arranged.push(derive_line(line, first_speaker, &first_half, &mut seen_abbreviations, style));
            alternation = speakers::other(first_speaker);

            let transition = style.flow.transitions[transition_cursor % style.flow.transitions.len()];
            transition_cursor += 1;
            arranged.push(ScriptLine {
                speaker: alternation,
                text: transition.to_string(),
                emotion: Emotion::Neutral,
                citations: Vec::new(),
                is_verified: true,
                needs_rewrite: false,
                synthesis_degraded: false,
                audio_ref: None,
            });
            alternation = speakers::other(alternation);

            let second_speaker = speakers::override_speaker(style, &second_half).unwrap_or(alternation);
            arranged.push(derive_line(line, second_speaker, &second_half, &mut seen_abbreviations, style));
            alternation = speakers::other(second_speaker);
            continue;
        }

        let speaker = speakers::override_speaker(style, &line.text).unwrap_or(alternation);
        arranged.push(derive_line(line, speaker, &line.text, &mut seen_abbreviations, style));
        alternation = speakers::other(alternation);
    }

    arranged
}

fn derive_line(
    original: &ScriptLine,
    speaker: Speaker,
    text: &str,
    seen_abbreviations: &mut HashSet<&'static str>,
    style: &Style,
) -> ScriptLine {
    let energy = match speaker {
        Speaker::Host1 => style.host1.energy,
        Speaker::Host2 => style.host2.energy,
        Speaker::Narrator => 0.3,
    };
    ScriptLine {
        speaker,
        text: enhance::enhance_line(text, energy, seen_abbreviations),
        emotion: original.emotion,
        citations: original.citations.clone(),
        is_verified: original.is_verified,
        needs_rewrite: original.needs_rewrite,
        synthesis_degraded: original.synthesis_degraded,
        audio_ref: original.audio_ref,
    }
}

/// Convenience entry point for callers that only have raw text units (no
/// prior `ScriptLine` metadata yet) — wraps each unit as a fresh line and
/// arranges it.
pub fn assign_and_arrange(units: &[String], style: &Style) -> Vec<ScriptLine> {
    let fresh: Vec<ScriptLine> = units
        .iter()
        .map(|text| ScriptLine {
            speaker: Speaker::Host1,
            text: text.clone(),
            emotion: Emotion::Neutral,
            citations: Vec::new(),
            is_verified: false,
            needs_rewrite: false,
            synthesis_degraded: false,
            audio_ref: None,
        })
        .collect();
    arrange_segment(&fresh, style)
}
