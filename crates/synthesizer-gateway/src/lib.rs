use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use budget_governor::{BudgetGovernor, OperationClass};
use podcast_core::types::{AudioRef, Speaker};
use style_engine::Style;

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub speech_rate_wpm: f32,
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub id: uuid::Uuid,
    pub duration_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesizerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited, retry after backoff")]
    RateLimited,
    #[error("budget exceeded before the call was issued")]
    BudgetExceeded,
}

impl SynthesizerError {
    fn is_transient(&self) -> bool {
        matches!(self, SynthesizerError::Transport(_) | SynthesizerError::RateLimited)
    }
}

/// The collaborator seam for text-to-speech. Implementations are plain
/// structs wrapping an HTTP/SDK client (production) or a scripted responder
/// (tests); the gateway never constructs one, it only holds an
/// `Arc<dyn Synthesizer>`.
///
/// Returns a boxed future rather than using `async fn` so the trait stays
/// object-safe behind `Arc<dyn Synthesizer>`.
pub trait Synthesizer: Send + Sync {
    fn synthesize<'a>(
        &'a self,
        request: &'a SynthesisRequest,
    ) -> Pin<Box<dyn Future<Output = Result<SynthesizedAudio, SynthesizerError>> + Send + 'a>>;
}

/// Silence inserted between consecutive lines/segments in a concatenated
/// track, modelled as a count of milliseconds rather than an audio format —
/// the actual mixdown is out of scope, only the timeline is tracked.
#[derive(Debug, Clone, Copy)]
pub struct ConcatGaps {
    pub inter_line_ms: u64,
    pub inter_segment_ms: u64,
}

impl Default for ConcatGaps {
    fn default() -> Self {
        Self {
            inter_line_ms: 300,
            inter_segment_ms: 1200,
        }
    }
}

/// Estimates spoken duration from word count at the given rate, used both
/// for the degraded-silence fallback and for concatenation bookkeeping when
/// no real synthesis occurred.
fn estimate_duration_ms(text: &str, speech_rate_wpm: f32) -> u64 {
    let words = text.split_whitespace().count().max(1) as f32;
    let minutes = words / speech_rate_wpm.max(1.0);
    (minutes * 60_000.0) as u64
}

pub struct SynthesizerGateway {
    synthesizer: Arc<dyn Synthesizer>,
    budget: BudgetGovernor,
    max_line_retries: usize,
}

impl SynthesizerGateway {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, budget: BudgetGovernor, max_line_retries: u32) -> Self {
        Self {
            synthesizer,
            budget,
            max_line_retries: max_line_retries as usize,
        }
    }

    /// `SynthesizeLine` from the component contract. Retries transport
    /// failures up to `max_line_retries` times; on exhaustion falls back to
    /// a silence placeholder sized from the line's word count, marking
    /// `AudioRef::degraded` so the episode-level `synthesis_degraded` flag can
    /// be raised without failing the whole job.
    pub async fn synthesize_line(&self, text: &str, speaker: Speaker, style: &Style) -> AudioRef {
        let voice_id = style.voice_for(speaker).to_string();
        let speech_rate_wpm = match speaker {
            Speaker::Host1 => style.host1.speech_rate_wpm,
            Speaker::Host2 => style.host2.speech_rate_wpm,
            Speaker::Narrator => 150.0,
        };
        let request = SynthesisRequest {
            text: text.to_string(),
            voice_id,
            speech_rate_wpm,
        };

        if !self
            .budget
            .check_precall(text.len() as u64, OperationClass::Synthesis)
        {
            return self.degraded_placeholder(text, speech_rate_wpm);
        }

        let synthesizer = Arc::clone(&self.synthesizer);
        let attempt = {
            let request = &request;
            move || {
                let synthesizer = Arc::clone(&synthesizer);
                let request = request.clone();
                async move { synthesizer.synthesize(&request).await }
            }
        };

        let backoff = ExponentialBuilder::default()
            .with_jitter()
            .with_max_times(self.max_line_retries);

        match attempt.retry(backoff).when(|e: &SynthesizerError| e.is_transient()).await {
            Ok(audio) => {
                self.budget
                    .record_usage(text.len() as u64, OperationClass::Synthesis);
                AudioRef {
                    id: audio.id,
                    duration_ms: audio.duration_ms,
                    degraded: false,
                }
            }
            Err(_) => self.degraded_placeholder(text, speech_rate_wpm),
        }
    }

    fn degraded_placeholder(&self, text: &str, speech_rate_wpm: f32) -> AudioRef {
        tracing::warn!(chars = text.len(), "synthesis_degraded_to_silence_placeholder");
        AudioRef {
            id: uuid::Uuid::new_v4(),
            duration_ms: estimate_duration_ms(text, speech_rate_wpm),
            degraded: true,
        }
    }

    /// `ConcatenateSegment` from the component contract: sums line durations
    /// plus `inter_line_ms` gaps between them, and ORs each line's degraded
    /// flag into the segment-level result.
    pub fn concatenate_segment(&self, lines: &[AudioRef], gaps: ConcatGaps) -> AudioRef {
        let total_duration: u64 = lines.iter().map(|l| l.duration_ms).sum::<u64>()
            + gaps.inter_line_ms * lines.len().saturating_sub(1) as u64;
        let degraded = lines.iter().any(|l| l.degraded);
        AudioRef {
            id: uuid::Uuid::new_v4(),
            duration_ms: total_duration,
            degraded,
        }
    }

    /// `ConcatenateEpisode` from the component contract: the structural and
    /// core segments' already-concatenated `AudioRef`s, joined with
    /// `inter_segment_ms` gaps.
    pub fn concatenate_episode(&self, segments: &[AudioRef], gaps: ConcatGaps) -> AudioRef {
        let total_duration: u64 = segments.iter().map(|s| s.duration_ms).sum::<u64>()
            + gaps.inter_segment_ms * segments.len().saturating_sub(1) as u64;
        let degraded = segments.iter().any(|s| s.degraded);
        AudioRef {
            id: uuid::Uuid::new_v4(),
            duration_ms: total_duration,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSynthesizer {
        responses: Mutex<Vec<Result<SynthesizedAudio, SynthesizerError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSynthesizer {
        fn new(responses: Vec<Result<SynthesizedAudio, SynthesizerError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Synthesizer for ScriptedSynthesizer {
        fn synthesize<'a>(
            &'a self,
            _request: &'a SynthesisRequest,
        ) -> Pin<Box<dyn Future<Output = Result<SynthesizedAudio, SynthesizerError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.is_empty() {
                Err(SynthesizerError::Transport("exhausted script".to_string()))
            } else {
                responses.remove(0)
            };
            Box::pin(async move { next })
        }
    }

    fn governor() -> BudgetGovernor {
        BudgetGovernor::new(&podcast_core::AppConfig::default())
    }

    #[tokio::test]
    async fn synthesize_line_succeeds_on_the_first_attempt() {
        let synth = Arc::new(ScriptedSynthesizer::new(vec![Ok(SynthesizedAudio {
            id: uuid::Uuid::new_v4(),
            duration_ms: 2000,
        })]));
        let gateway = SynthesizerGateway::new(synth, governor(), 2);
        let style = style_engine::find_style("layperson").unwrap();
        let audio = gateway.synthesize_line("Hello there", Speaker::Host1, style).await;
        assert!(!audio.degraded);
        assert_eq!(audio.duration_ms, 2000);
    }

    #[tokio::test]
    async fn exhausted_retries_fall_back_to_a_degraded_silence_placeholder() {
        let synth = Arc::new(ScriptedSynthesizer::new(vec![]));
        let gateway = SynthesizerGateway::new(synth, governor(), 1);
        let style = style_engine::find_style("layperson").unwrap();
        let audio = gateway
            .synthesize_line("a line with several words in it", Speaker::Host1, style)
            .await;
        assert!(audio.degraded);
        assert!(audio.duration_ms > 0);
    }

    #[test]
    fn segment_concatenation_sums_line_durations_plus_gaps() {
        let gateway = SynthesizerGateway::new(
            Arc::new(ScriptedSynthesizer::new(vec![])),
            governor(),
            2,
        );
        let lines = vec![
            AudioRef { id: uuid::Uuid::new_v4(), duration_ms: 1000, degraded: false },
            AudioRef { id: uuid::Uuid::new_v4(), duration_ms: 2000, degraded: false },
        ];
        let gaps = ConcatGaps { inter_line_ms: 300, inter_segment_ms: 1200 };
        let result = gateway.concatenate_segment(&lines, gaps);
        assert_eq!(result.duration_ms, 1000 + 2000 + 300);
        assert!(!result.degraded);
    }

    #[test]
    fn degraded_line_propagates_to_the_segment_level() {
        let gateway = SynthesizerGateway::new(
            Arc::new(ScriptedSynthesizer::new(vec![])),
            governor(),
            2,
        );
        let lines = vec![
            AudioRef { id: uuid::Uuid::new_v4(), duration_ms: 1000, degraded: false },
            AudioRef { id: uuid::Uuid::new_v4(), duration_ms: 500, degraded: true },
        ];
        let result = gateway.concatenate_segment(&lines, ConcatGaps::default());
        assert!(result.degraded);
    }
}
