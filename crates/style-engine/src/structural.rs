use podcast_core::types::{Emotion, ScriptLine, SegmentDraft, SegmentPlan, SegmentType, Speaker};

use crate::catalog::Style;

fn instantiate(template: &str, topic: &str) -> String {
    template.replace("{topic}", topic)
}

fn structural_draft(index: usize, segment_type: SegmentType, title: &str, text: String) -> SegmentDraft {
    let line = ScriptLine {
        speaker: Speaker::Narrator,
        text,
        emotion: Emotion::Neutral,
        citations: Vec::new(),
        is_verified: true,
        needs_rewrite: false,
        synthesis_degraded: false,
        audio_ref: None,
    };
    SegmentDraft {
        plan: SegmentPlan {
            index,
            segment_type,
            title: title.to_string(),
            duration_target_s: 30,
            key_points: Vec::new(),
            conversation_starters: Vec::new(),
        },
        lines: vec![line],
        factcheck_score: 1.0,
        rewrite_count: 0,
        is_complete: true,
        verification_passed: true,
        audio_ref: None,
        is_structural: true,
    }
}

pub fn intro(style: &Style, topic: &str, index: usize) -> SegmentDraft {
    structural_draft(index, SegmentType::Intro, "Intro", instantiate(style.templates.intro, topic))
}

pub fn ad_break(style: &Style, topic: &str, index: usize) -> SegmentDraft {
    structural_draft(
        index,
        SegmentType::AdBreak,
        "Ad Break",
        instantiate(style.templates.ad_break, topic),
    )
}

pub fn outro(style: &Style, topic: &str, index: usize) -> SegmentDraft {
    structural_draft(index, SegmentType::Outro, "Outro", instantiate(style.templates.outro, topic))
}
