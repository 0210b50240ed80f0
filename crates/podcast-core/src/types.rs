use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChunkId, EpisodeId, JobId, PaperId, StyleId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: PaperId,
    pub title: String,
    pub body: String,
    pub source_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    pub paper_id: PaperId,
    pub ordinal: u32,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylePattern {
    pub style_id: StyleId,
    pub section: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

/// A scored hit from [`crate::types::Chunk`]/style-pattern retrieval.
/// `fallback: true` marks a result produced by ordinal-proximity slicing
/// rather than vector similarity, for callers that need to distinguish the
/// two sources of evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredItem {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Intro,
    Core,
    Takeaways,
    AdBreak,
    Outro,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub index: usize,
    pub segment_type: SegmentType,
    pub title: String,
    pub duration_target_s: u32,
    pub key_points: Vec<String>,
    pub conversation_starters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    pub episode_title: String,
    pub target_duration_s: u32,
    pub segments: Vec<SegmentPlan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Host1,
    Host2,
    Narrator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Neutral,
    Curious,
    Excited,
    Concerned,
    Skeptical,
    Amused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_id: ChunkId,
    pub span: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptLine {
    pub speaker: Speaker,
    pub text: String,
    pub emotion: Emotion,
    pub citations: Vec<Citation>,
    pub is_verified: bool,
    pub needs_rewrite: bool,
    /// Set once by the synthesizer when line-level TTS exhausted its retry
    /// budget and fell back to a silence placeholder. Never cleared.
    pub synthesis_degraded: bool,
    /// Opaque handle to the line's synthesized audio, set after
    /// `SynthesizerGateway::synthesize_line`.
    pub audio_ref: Option<AudioRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub id: uuid::Uuid,
    pub duration_ms: u64,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDraft {
    pub plan: SegmentPlan,
    pub lines: Vec<ScriptLine>,
    pub factcheck_score: f64,
    pub rewrite_count: u32,
    pub is_complete: bool,
    pub verification_passed: bool,
    pub audio_ref: Option<AudioRef>,
    /// True for intro/ad-break/outro segments emitted directly by the style
    /// engine; these bypass `SegmentPipeline` and fact-checking entirely and
    /// are excluded from `Episode::verification_rate`'s denominator.
    pub is_structural: bool,
}

impl SegmentDraft {
    pub fn verified_line_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_verified).count()
    }

    pub fn citation_count(&self) -> usize {
        self.lines.iter().map(|l| l.citations.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: EpisodeId,
    pub paper_id: PaperId,
    pub outline: Outline,
    pub segments: Vec<SegmentDraft>,
    pub audio_ref: Option<AudioRef>,
    pub verification_rate: f64,
    pub total_duration_s: f64,
    pub total_cost: f64,
    pub processing_time_s: f64,
    pub citation_count: usize,
    pub verification_degraded: bool,
    pub synthesis_degraded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Uploaded,
    Indexing,
    Planning,
    Drafting,
    FactChecking,
    Rewriting,
    GeneratingAudio,
    Stitching,
    Completed,
    Failed,
}

impl JobState {
    /// The legal successors of this state per the orchestrator's transition
    /// table. A `transition` call targeting anything outside this list is a
    /// programmer error, not a recoverable runtime condition.
    pub fn legal_successors(self) -> &'static [JobState] {
        use JobState::*;
        match self {
            Uploaded => &[Indexing, Failed],
            Indexing => &[Planning, Failed],
            Planning => &[Drafting, Failed],
            Drafting => &[Drafting, FactChecking, Failed],
            FactChecking => &[Rewriting, GeneratingAudio, Failed],
            Rewriting => &[FactChecking, Failed],
            GeneratingAudio => &[Stitching, Failed],
            Stitching => &[Completed, Failed],
            Completed => &[],
            Failed => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// The fixed progress-percentage table transitions advance through.
    pub fn progress_pct(self) -> u8 {
        use JobState::*;
        match self {
            Uploaded => 0,
            Indexing => 10,
            Planning => 20,
            Drafting => 50,
            FactChecking => 70,
            Rewriting => 75,
            GeneratingAudio => 85,
            Stitching => 95,
            Completed => 100,
            Failed => 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub kind: String,
    pub message: String,
    pub retriable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub paper_id: PaperId,
    pub style_id: StyleId,
    pub state: JobState,
    pub previous_state: Option<JobState>,
    pub progress_pct: u8,
    pub retry_count_for_state: u32,
    pub iterations: u32,
    pub outline: Option<Outline>,
    pub segments: Vec<SegmentDraft>,
    pub cursor: usize,
    pub cost_estimate: f64,
    pub tokens_used: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<JobError>,
}

impl Job {
    pub fn new(job_id: JobId, paper_id: PaperId, style_id: StyleId, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            paper_id,
            style_id,
            state: JobState::Uploaded,
            previous_state: None,
            progress_pct: JobState::Uploaded.progress_pct(),
            retry_count_for_state: 0,
            iterations: 0,
            outline: None,
            segments: Vec::new(),
            cursor: 0,
            cost_estimate: 0.0,
            tokens_used: 0,
            started_at,
            ended_at: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub max_cost: f64,
    pub alert_threshold: f64,
    pub max_tokens_per_paper: u64,
    pub max_processing_time_s: u64,
    pub cost_spent: f64,
    pub tokens_used: u64,
    pub elapsed_s: u64,
}
