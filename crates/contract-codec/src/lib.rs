mod repair;
mod validate;

use podcast_core::types::{Emotion, Speaker};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("response did not contain a parseable JSON object: {0}")]
    Unparseable(String),
    #[error("response violated the {response_type:?} contract: {reason}")]
    Invalid {
        response_type: ResponseType,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Outline,
    Segment,
    FactCheck,
    Rewrite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSegmentContract {
    #[serde(rename = "type")]
    pub segment_type: String,
    pub title: String,
    pub duration_target_s: u32,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub conversation_starters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineContract {
    pub title: String,
    pub segments: Vec<OutlineSegmentContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptLineContract {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub emotion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentContract {
    pub script: Vec<ScriptLineContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerLineVerdict {
    pub line_index: usize,
    pub is_verified: bool,
    #[serde(default)]
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckContract {
    pub accuracy: f64,
    pub needs_rewrite: bool,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub per_line: Option<Vec<PerLineVerdict>>,
}

/// The tagged variant every decoded response is normalized into. `Rewrite`
/// reuses `SegmentContract`'s shape, as the response format is identical.
#[derive(Debug, Clone)]
pub enum Contract {
    Outline(OutlineContract),
    Segment(SegmentContract),
    FactCheck(FactCheckContract),
    Rewrite(SegmentContract),
}

pub fn parse_speaker(raw: &str) -> Option<Speaker> {
    match raw.to_ascii_lowercase().as_str() {
        "host1" | "host_1" => Some(Speaker::Host1),
        "host2" | "host_2" => Some(Speaker::Host2),
        "narrator" => Some(Speaker::Narrator),
        _ => None,
    }
}

pub fn parse_emotion(raw: Option<&str>) -> Emotion {
    match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("curious") => Emotion::Curious,
        Some("excited") => Emotion::Excited,
        Some("concerned") => Emotion::Concerned,
        Some("skeptical") => Emotion::Skeptical,
        Some("amused") => Emotion::Amused,
        _ => Emotion::Neutral,
    }
}

/// Decodes and validates raw model output against `response_type`'s
/// contract, applying the repair pipeline (fence-strip, brace-balance
/// extraction, quote/comma normalization) before giving up. Step 3 of the
/// repair policy (a single re-prompt) is not performed here — it needs a
/// live `Reasoner` call and is owned by `reasoner-gateway::repair_json`.
pub fn decode(raw: &str, response_type: ResponseType) -> Result<Contract, ContractError> {
    let json_text = repair::recover_json_object(raw)
        .ok_or_else(|| ContractError::Unparseable(raw.chars().take(200).collect()))?;

    match response_type {
        ResponseType::Outline => {
            let contract: OutlineContract = serde_json::from_str(&json_text)
                .map_err(|e| unparseable(response_type, &e))?;
            validate::outline(&contract)?;
            Ok(Contract::Outline(contract))
        }
        ResponseType::Segment => {
            let contract: SegmentContract = serde_json::from_str(&json_text)
                .map_err(|e| unparseable(response_type, &e))?;
            validate::segment(&contract)?;
            Ok(Contract::Segment(contract))
        }
        ResponseType::Rewrite => {
            let contract: SegmentContract = serde_json::from_str(&json_text)
                .map_err(|e| unparseable(response_type, &e))?;
            validate::segment(&contract)?;
            Ok(Contract::Rewrite(contract))
        }
        ResponseType::FactCheck => {
            let contract: FactCheckContract = serde_json::from_str(&json_text)
                .map_err(|e| unparseable(response_type, &e))?;
            validate::factcheck(&contract)?;
            Ok(Contract::FactCheck(contract))
        }
    }
}

fn unparseable(response_type: ResponseType, e: &serde_json::Error) -> ContractError {
    ContractError::Invalid {
        response_type,
        reason: format!("json shape mismatch: {e}"),
    }
}
