//! Drives one segment plan through draft → fact-check → (rewrite →
//! fact-check)* → arrange → synthesize, bottoming out in a complete
//! [`SegmentDraft`]. Structural segments (intro/ad-break/outro) never enter
//! this pipeline — `style_engine::structural` emits them directly and the
//! orchestrator only routes `SegmentType::Core`/`Takeaways` plans here.

use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use budget_governor::BudgetGovernor;
use podcast_core::{types::{AudioRef, Emotion, ScriptLine, SegmentDraft, SegmentPlan, Speaker}, Error};
use reasoner_gateway::{GenerationOptions, ReasonerError, ReasonerGateway};
use retriever_gateway::{RetrieverError, RetrieverGateway};
use style_engine::Style;
use synthesizer_gateway::{ConcatGaps, SynthesizerGateway};
use tokio_util::sync::CancellationToken;

const FACT_CONTEXT_K: usize = 8;

/// Bundles every collaborator a running segment needs. Held by value (all
/// fields are cheap `Arc` clones) so each segment task in the orchestrator's
/// `JoinSet` owns an independent copy.
#[derive(Clone)]
pub struct SegmentContext {
    pub reasoner: Arc<ReasonerGateway>,
    pub retriever: Arc<RetrieverGateway>,
    pub synthesizer: Arc<SynthesizerGateway>,
    pub budget: BudgetGovernor,
    pub style: &'static Style,
    pub paper_id: podcast_core::ids::PaperId,
    pub acc_threshold: f64,
    pub max_rewrites: u32,
    pub max_segment_retries: usize,
    pub reasoner_deadline_ms: u64,
    pub gaps: ConcatGaps,
    pub cancel: CancellationToken,
}

fn map_reasoner_err(budget: &BudgetGovernor, e: ReasonerError) -> Error {
    match e {
        ReasonerError::Transport(m) => Error::UpstreamTransient(m),
        ReasonerError::RateLimited => Error::UpstreamTransient("rate limited".to_string()),
        ReasonerError::Contract(c) => Error::Contract(c.to_string()),
        ReasonerError::BudgetExceeded => budget
            .check_hard_stop()
            .err()
            .unwrap_or_else(|| Error::UpstreamPermanent("budget exceeded before call".to_string())),
    }
}

fn map_retriever_err(e: RetrieverError) -> Error {
    Error::UpstreamTransient(e.to_string())
}

/// The unified segment-level retry wrapper: retries the whole step (not just
/// the transport call the gateway already retries internally) when the
/// mapped error is retriable, capped at `max_segment_retries`. A gateway's
/// own `backon` loop handles transient transport noise; this layer handles
/// the step itself failing again after that loop gives up (e.g. the contract
/// repair re-prompt also came back malformed).
async fn retry_segment_step<T, F, Fut>(max_retries: usize, step: F) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, Error>>,
{
    let backoff = ExponentialBuilder::default().with_jitter().with_max_times(max_retries);
    step.retry(backoff).when(|e: &Error| e.is_retriable()).await
}

/// `RunSegment` from the component contract.
pub async fn run_segment(ctx: &SegmentContext, plan: SegmentPlan) -> Result<SegmentDraft, Error> {
    if ctx.cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let query = format!("{} {}", plan.title, plan.key_points.join(" "));
    let fact_items = retry_segment_step(ctx.max_segment_retries, || async {
        ctx.retriever
            .retrieve_facts(&query, FACT_CONTEXT_K, Some(ctx.paper_id))
            .await
            .map_err(map_retriever_err)
    })
    .await?;
    let fact_context: Vec<String> = fact_items.iter().map(|f| f.text.clone()).collect();

    let options = GenerationOptions {
        deadline_ms: ctx.reasoner_deadline_ms,
        ..Default::default()
    };

    let (draft_lines, _usage) = retry_segment_step(ctx.max_segment_retries, || async {
        ctx.reasoner
            .generate_draft(&plan, &fact_context, options.clone())
            .await
            .map_err(|e| map_reasoner_err(&ctx.budget, e))
    })
    .await?;

    let mut lines = reasoner_gateway::prompt::draft_lines_to_script_lines(draft_lines);
    let mut rewrite_count = 0u32;
    let mut last_accuracy = 0.0f64;
    let mut verification_passed = false;

    loop {
        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let draft_snapshot = SegmentDraft {
            plan: plan.clone(),
            lines: lines.clone(),
            factcheck_score: last_accuracy,
            rewrite_count,
            is_complete: false,
            verification_passed: false,
            audio_ref: None,
            is_structural: false,
        };

        let (outcome, _usage) = retry_segment_step(ctx.max_segment_retries, || async {
            ctx.reasoner
                .fact_check(&draft_snapshot, &fact_context, options.clone())
                .await
                .map_err(|e| map_reasoner_err(&ctx.budget, e))
        })
        .await?;

        last_accuracy = outcome.accuracy;
        apply_factcheck_outcome(&mut lines, &outcome, ctx.acc_threshold);

        let all_verified = lines.iter().all(|l| l.is_verified);
        if all_verified && !outcome.needs_rewrite {
            verification_passed = true;
            break;
        }

        if rewrite_count >= ctx.max_rewrites {
            tracing::warn!(
                segment = plan.index,
                accuracy = last_accuracy,
                "verify_unresolvable_after_max_rewrites"
            );
            verification_passed = false;
            break;
        }

        let flagged_draft = SegmentDraft {
            plan: plan.clone(),
            lines: lines.clone(),
            factcheck_score: last_accuracy,
            rewrite_count,
            is_complete: false,
            verification_passed: false,
            audio_ref: None,
            is_structural: false,
        };
        let (rewritten, _usage) = retry_segment_step(ctx.max_segment_retries, || async {
            ctx.reasoner
                .rewrite(&flagged_draft, &outcome.feedback, &fact_context, options.clone())
                .await
                .map_err(|e| map_reasoner_err(&ctx.budget, e))
        })
        .await?;

        merge_rewritten_lines(&mut lines, rewritten);
        rewrite_count += 1;
    }

    let arranged = style_engine::arrange_segment(&lines, ctx.style);

    let mut synthesized = Vec::with_capacity(arranged.len());
    let mut any_degraded = false;
    for line in arranged {
        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let audio = ctx.synthesizer.synthesize_line(&line.text, line.speaker, ctx.style).await;
        any_degraded |= audio.degraded;
        synthesized.push(ScriptLine {
            audio_ref: Some(audio),
            ..line
        });
    }

    let line_audio: Vec<AudioRef> = synthesized.iter().filter_map(|l| l.audio_ref).collect();
    let segment_audio = ctx.synthesizer.concatenate_segment(&line_audio, ctx.gaps);

    Ok(SegmentDraft {
        plan,
        lines: synthesized,
        factcheck_score: last_accuracy,
        rewrite_count,
        is_complete: true,
        verification_passed,
        audio_ref: Some(AudioRef {
            degraded: segment_audio.degraded || any_degraded,
            ..segment_audio
        }),
        is_structural: false,
    })
}

fn apply_factcheck_outcome(lines: &mut [ScriptLine], outcome: &reasoner_gateway::prompt::FactCheckOutcome, acc_threshold: f64) {
    if outcome.per_line_verified.len() == lines.len() {
        for (i, line) in lines.iter_mut().enumerate() {
            line.is_verified = outcome.per_line_verified[i];
            line.needs_rewrite = !line.is_verified;
            if let Some(citations) = outcome.per_line_citations.get(i) {
                line.citations = citations.clone();
            }
        }
    } else {
        let verified = outcome.accuracy >= acc_threshold;
        for line in lines.iter_mut() {
            line.is_verified = verified;
            line.needs_rewrite = !verified;
        }
    }
}

fn merge_rewritten_lines(lines: &mut [ScriptLine], rewritten: Vec<reasoner_gateway::prompt::DraftLine>) {
    let mut rewritten = rewritten.into_iter();
    for line in lines.iter_mut().filter(|l| l.needs_rewrite) {
        if let Some(new_line) = rewritten.next() {
            line.text = new_line.text;
            line.speaker = new_line.speaker;
            line.needs_rewrite = false;
            line.is_verified = false;
            line.emotion = Emotion::Neutral;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podcast_core::ids::ChunkId;
    use podcast_core::types::Citation;

    #[test]
    fn factcheck_outcome_without_per_line_falls_back_to_the_accuracy_threshold() {
        let mut lines = vec![line("a"), line("b")];
        let outcome = reasoner_gateway::prompt::FactCheckOutcome {
            accuracy: 0.9,
            needs_rewrite: false,
            feedback: String::new(),
            per_line_verified: Vec::new(),
            per_line_citations: Vec::new(),
        };
        apply_factcheck_outcome(&mut lines, &outcome, 0.75);
        assert!(lines.iter().all(|l| l.is_verified));
    }

    #[test]
    fn factcheck_outcome_with_per_line_overrides_individual_lines() {
        let mut lines = vec![line("a"), line("b")];
        let outcome = reasoner_gateway::prompt::FactCheckOutcome {
            accuracy: 0.5,
            needs_rewrite: true,
            feedback: "fix b".to_string(),
            per_line_verified: vec![true, false],
            per_line_citations: vec![
                vec![Citation { chunk_id: ChunkId::new(), span: "x".to_string() }],
                Vec::new(),
            ],
        };
        apply_factcheck_outcome(&mut lines, &outcome, 0.75);
        assert!(lines[0].is_verified);
        assert!(!lines[1].is_verified);
        assert!(lines[1].needs_rewrite);
    }

    #[test]
    fn merge_replaces_only_flagged_lines_in_order() {
        let mut lines = vec![line("keep"), flagged("replace me")];
        merge_rewritten_lines(
            &mut lines,
            vec![reasoner_gateway::prompt::DraftLine {
                speaker: Speaker::Host2,
                text: "replaced".to_string(),
            }],
        );
        assert_eq!(lines[0].text, "keep");
        assert_eq!(lines[1].text, "replaced");
        assert!(!lines[1].needs_rewrite);
    }

    fn line(text: &str) -> ScriptLine {
        ScriptLine {
            speaker: Speaker::Host1,
            text: text.to_string(),
            emotion: Emotion::Neutral,
            citations: Vec::new(),
            is_verified: false,
            needs_rewrite: false,
            synthesis_degraded: false,
            audio_ref: None,
        }
    }

    fn flagged(text: &str) -> ScriptLine {
        ScriptLine {
            needs_rewrite: true,
            ..line(text)
        }
    }
}
