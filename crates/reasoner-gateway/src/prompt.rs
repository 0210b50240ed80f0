use contract_codec::{
    self, FactCheckContract, OutlineContract, ScriptLineContract, SegmentContract,
};
use podcast_core::types::{Citation, Emotion, Outline, ScriptLine, SegmentDraft, SegmentPlan, SegmentType};

use crate::{Message, Role};

pub fn outline_prompt(title: &str, excerpt: &str, target_duration_s: u32) -> Vec<Message> {
    vec![
        Message {
            role: Role::System,
            content: "You plan multi-segment podcast episodes from research papers. Only plan \
                the content segments — the intro, ad break, and outro are inserted separately \
                and must not appear in your output. Respond with JSON only: \
                {\"title\":...,\"segments\":[{\"type\":\"core\"|\"takeaways\",\"title\":...,\
                \"duration_target_s\":...,\"key_points\":[...]}]}."
                .to_string(),
        },
        Message {
            role: Role::User,
            content: format!(
                "Paper title: {title}\nTarget duration: {target_duration_s}s\n\nExcerpt:\n{excerpt}"
            ),
        },
    ]
}

pub fn outline_from_contract(contract: OutlineContract, target_duration_s: u32) -> Outline {
    let segments = contract
        .segments
        .into_iter()
        .enumerate()
        .map(|(index, s)| SegmentPlan {
            index,
            segment_type: segment_type_from_str(&s.segment_type),
            title: s.title,
            duration_target_s: s.duration_target_s,
            key_points: s.key_points,
            conversation_starters: s.conversation_starters,
        })
        .collect();
    Outline {
        episode_title: contract.title,
        target_duration_s,
        segments,
    }
}

/// Intro/ad-break/outro are never model output — the orchestrator inserts
/// those itself over this outline (see `insert_structural_segments`). Any of
/// those strings showing up here is a model that didn't follow instructions,
/// not a value we need to honor, so they fall through to `Core` like anything
/// else unrecognized.
fn segment_type_from_str(raw: &str) -> SegmentType {
    match raw.to_ascii_lowercase().as_str() {
        "takeaways" => SegmentType::Takeaways,
        _ => SegmentType::Core,
    }
}

pub fn draft_prompt(plan: &SegmentPlan, fact_context: &[String]) -> Vec<Message> {
    vec![
        Message {
            role: Role::System,
            content: "You write natural two-host podcast dialogue from a segment plan and \
                supporting facts. Respond with JSON only: \
                {\"script\":[{\"speaker\":\"host1\"|\"host2\",\"text\":...}]}."
                .to_string(),
        },
        Message {
            role: Role::User,
            content: format!(
                "Segment: {}\nKey points:\n- {}\n\nFacts:\n{}",
                plan.title,
                plan.key_points.join("\n- "),
                fact_context.join("\n---\n")
            ),
        },
    ]
}

#[derive(Debug, Clone)]
pub struct DraftLine {
    pub speaker: podcast_core::types::Speaker,
    pub text: String,
}

pub fn lines_from_contract(contract: SegmentContract) -> Vec<DraftLine> {
    contract
        .script
        .into_iter()
        .filter_map(|line: ScriptLineContract| {
            contract_codec::parse_speaker(&line.speaker).map(|speaker| DraftLine {
                speaker,
                text: line.text,
            })
        })
        .collect()
}

pub fn draft_lines_to_script_lines(lines: Vec<DraftLine>) -> Vec<ScriptLine> {
    lines
        .into_iter()
        .map(|l| ScriptLine {
            speaker: l.speaker,
            text: l.text,
            emotion: Emotion::Neutral,
            citations: Vec::new(),
            is_verified: false,
            needs_rewrite: false,
            synthesis_degraded: false,
            audio_ref: None,
        })
        .collect()
}

pub fn factcheck_prompt(draft: &SegmentDraft, fact_context: &[String]) -> Vec<Message> {
    let script = draft
        .lines
        .iter()
        .enumerate()
        .map(|(i, l)| format!("[{i}] {:?}: {}", l.speaker, l.text))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        Message {
            role: Role::System,
            content: "You fact-check podcast dialogue against supporting facts. Respond with \
                JSON only: {\"accuracy\":0..1,\"needs_rewrite\":bool,\"feedback\":...,\
                \"per_line\":[{\"line_index\":...,\"is_verified\":bool,\"citations\":[...]}]}."
                .to_string(),
        },
        Message {
            role: Role::User,
            content: format!("Script:\n{script}\n\nFacts:\n{}", fact_context.join("\n---\n")),
        },
    ]
}

#[derive(Debug, Clone)]
pub struct FactCheckOutcome {
    pub accuracy: f64,
    pub needs_rewrite: bool,
    pub feedback: String,
    pub per_line_verified: Vec<bool>,
    pub per_line_citations: Vec<Vec<Citation>>,
}

/// If `per_line` is absent, every line inherits `is_verified = accuracy >=
/// ACC_THRESHOLD`'s caller-side decision — this function only derives the
/// per-line vector; the threshold comparison against `ACC_THRESHOLD` happens
/// in `segment-pipeline`, which knows the configured threshold.
pub fn outcome_from_contract(contract: FactCheckContract, line_count: usize) -> FactCheckOutcome {
    let (per_line_verified, per_line_citations) = match contract.per_line {
        Some(verdicts) => {
            let mut verified = vec![false; line_count];
            let mut citations = vec![Vec::new(); line_count];
            for verdict in verdicts {
                if let Some(slot) = verified.get_mut(verdict.line_index) {
                    *slot = verdict.is_verified;
                }
                if let Some(slot) = citations.get_mut(verdict.line_index) {
                    *slot = verdict
                        .citations
                        .into_iter()
                        .map(|span| Citation {
                            chunk_id: podcast_core::ids::ChunkId::new(),
                            span,
                        })
                        .collect();
                }
            }
            (verified, citations)
        }
        None => (Vec::new(), Vec::new()),
    };
    FactCheckOutcome {
        accuracy: contract.accuracy,
        needs_rewrite: contract.needs_rewrite,
        feedback: contract.feedback,
        per_line_verified,
        per_line_citations,
    }
}

pub fn rewrite_prompt(draft: &SegmentDraft, feedback: &str, fact_context: &[String]) -> Vec<Message> {
    let flagged = draft
        .lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.needs_rewrite)
        .map(|(i, l)| format!("[{i}] {:?}: {}", l.speaker, l.text))
        .collect::<Vec<_>>()
        .join("\n");
    vec![
        Message {
            role: Role::System,
            content: "Rewrite only the flagged lines to fix the feedback, keeping dialogue \
                natural. Respond with JSON only: {\"script\":[{\"speaker\":...,\"text\":...}]} \
                containing just the rewritten lines, in original order."
                .to_string(),
        },
        Message {
            role: Role::User,
            content: format!(
                "Feedback: {feedback}\n\nFlagged lines:\n{flagged}\n\nFacts:\n{}",
                fact_context.join("\n---\n")
            ),
        },
    ]
}
