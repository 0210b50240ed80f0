use chrono::Utc;
use podcast_core::ids::EpisodeId;
use podcast_core::types::{Episode, Job, JobState};
use podcast_core::Error;
use synthesizer_gateway::{ConcatGaps, SynthesizerGateway};

/// `EpisodeAssembler::assemble` from the component contract: a pure
/// aggregation over a completed job's already-synthesized `SegmentDraft`s.
/// Requires `job.state == JobState::Stitching`; any other state is a
/// programmer error, not a recoverable input condition.
pub struct EpisodeAssembler;

impl EpisodeAssembler {
    pub fn assemble(job: &Job, synthesizer: &SynthesizerGateway, gaps: ConcatGaps) -> Result<Episode, Error> {
        if job.state != JobState::Stitching {
            return Err(Error::Internal(format!(
                "EpisodeAssembler::assemble called on job in state {:?}, expected Stitching",
                job.state
            )));
        }
        let outline = job
            .outline
            .clone()
            .ok_or_else(|| Error::Internal("stitching job has no outline".to_string()))?;

        let segment_audio: Vec<_> = job.segments.iter().filter_map(|s| s.audio_ref).collect();
        let audio_ref = synthesizer.concatenate_episode(&segment_audio, gaps);

        let factcheckable: Vec<_> = job.segments.iter().filter(|s| !s.is_structural).collect();
        let total_lines: usize = factcheckable.iter().map(|s| s.lines.len()).sum();
        let verified_lines: usize = factcheckable.iter().map(|s| s.verified_line_count()).sum();
        let verification_rate = if total_lines == 0 {
            1.0
        } else {
            verified_lines as f64 / total_lines as f64
        };

        let verification_degraded = factcheckable.iter().any(|s| !s.verification_passed);
        let synthesis_degraded = job
            .segments
            .iter()
            .flat_map(|s| &s.lines)
            .any(|l| l.synthesis_degraded);

        let total_duration_s = job
            .segments
            .iter()
            .filter_map(|s| s.audio_ref)
            .map(|a| a.duration_ms as f64 / 1000.0)
            .sum();

        let citation_count = job
            .segments
            .iter()
            .flat_map(|s| &s.lines)
            .map(|l| l.citations.len())
            .sum();

        let processing_time_s = job
            .ended_at
            .unwrap_or_else(Utc::now)
            .signed_duration_since(job.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;

        Ok(Episode {
            episode_id: EpisodeId::new(),
            paper_id: job.paper_id,
            outline,
            segments: job.segments.clone(),
            audio_ref: Some(audio_ref),
            verification_rate,
            total_duration_s,
            total_cost: job.cost_estimate,
            processing_time_s,
            citation_count,
            verification_degraded,
            synthesis_degraded: synthesis_degraded || audio_ref.degraded,
            created_at: Utc::now(),
        })
    }
}
