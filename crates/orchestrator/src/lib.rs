//! The job-level state machine. `Orchestrator::drive` is the
//! `_execute_workflow` loop rewritten as an explicit Rust state machine: a
//! bounded `loop`, one `match` dispatch per iteration, with the per-state
//! retry counter incremented on failure and reset on a successful
//! transition. `JobStore` is the sole source of truth for `job.state`;
//! `Orchestrator` is its only writer.

pub mod assembler;

use std::sync::Arc;

use budget_governor::BudgetGovernor;
use job_store::JobStore;
use podcast_core::ids::JobId;
use podcast_core::types::{Episode, Job, JobState, Paper, SegmentDraft, SegmentType};
use podcast_core::{AppConfig, Error};
use reasoner_gateway::{GenerationOptions, ReasonerGateway};
use retriever_gateway::RetrieverGateway;
use segment_pipeline::SegmentContext;
use style_engine::Style;
use synthesizer_gateway::{ConcatGaps, SynthesizerGateway};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub use assembler::EpisodeAssembler;

/// Every collaborator and tunable `Orchestrator::drive` needs for one job.
/// Constructed once per job by whatever embeds the engine.
#[derive(Clone)]
pub struct DriveContext {
    pub paper: Paper,
    pub style: &'static Style,
    pub target_duration_s: u32,
    pub reasoner: Arc<ReasonerGateway>,
    pub retriever: Arc<RetrieverGateway>,
    pub synthesizer: Arc<SynthesizerGateway>,
    pub budget: BudgetGovernor,
    pub config: AppConfig,
    pub cancel: CancellationToken,
}

pub struct Orchestrator;

impl Orchestrator {
    /// Drives `job_id` from whatever state it's currently in through to
    /// `Completed`/`Failed`. Returns the final `Job` snapshot plus the
    /// assembled `Episode`, present iff the job reached `Completed`.
    pub async fn drive(store: &JobStore, job_id: JobId, ctx: DriveContext) -> (Job, Option<Episode>) {
        let mut iterations = 0u32;
        let episode_slot: std::sync::Arc<std::sync::Mutex<Option<Episode>>> =
            std::sync::Arc::new(std::sync::Mutex::new(None));

        loop {
            iterations += 1;
            if iterations > ctx.config.max_workflow_iterations {
                return (Self::fail(store, job_id, Error::Internal("max_workflow_iterations exceeded".to_string())).await, None);
            }

            if let Err(e) = ctx.budget.check_hard_stop() {
                return (Self::fail(store, job_id, e).await, None);
            }
            if ctx.cancel.is_cancelled() {
                return (Self::fail(store, job_id, Error::Cancelled).await, None);
            }

            let job = store.get(job_id).await.expect("job exists in its own store");
            if job.state.is_terminal() {
                return (job, episode_slot.lock().unwrap().take());
            }

            let outcome = match job.state {
                JobState::Uploaded => Self::step_uploaded(&job).await,
                JobState::Indexing => Self::step_indexing(&job, &ctx).await,
                JobState::Planning => Self::step_planning(&job, &ctx).await,
                JobState::Drafting => Self::step_drafting(&job, &ctx).await,
                JobState::FactChecking => Self::step_fact_checking(&job),
                JobState::Rewriting => Self::step_rewriting(&job),
                JobState::GeneratingAudio => Self::step_generating_audio(&job),
                JobState::Stitching => Self::step_stitching(&job, &ctx, &episode_slot),
                JobState::Completed | JobState::Failed => unreachable!("terminal states returned above"),
            };

            match outcome {
                Ok(StepResult { to, mutate }) => {
                    tracing::info!(job_id = %job_id, from = ?job.state, to = ?to, "state_transition");
                    if let Err(e) = Self::transition(store, job_id, job.state, job.retry_count_for_state, to, mutate).await {
                        return (Self::fail(store, job_id, e).await, None);
                    }
                }
                Err(e) => {
                    if !e.is_retriable() || job.retry_count_for_state + 1 > ctx.config.max_state_retries {
                        tracing::error!(job_id = %job_id, state = ?job.state, error = %e, "state_failed_terminally");
                        return (Self::fail(store, job_id, e).await, None);
                    }
                    tracing::warn!(job_id = %job_id, state = ?job.state, error = %e, attempt = job.retry_count_for_state + 1, "state_retry");
                    let _ = store
                        .transition(job_id, (job.state, job.retry_count_for_state), |j| {
                            j.retry_count_for_state += 1;
                            j.error = Some(podcast_core::types::JobError {
                                kind: format!("{e:?}"),
                                message: e.to_string(),
                                retriable: true,
                            });
                        })
                        .await;
                }
            }
        }
    }

    async fn transition(
        store: &JobStore,
        job_id: JobId,
        from: JobState,
        expected_retry: u32,
        to: JobState,
        mutate: Box<dyn FnOnce(&mut Job) + Send>,
    ) -> Result<Job, Error> {
        store
            .transition(job_id, (from, expected_retry), move |j| {
                j.previous_state = Some(j.state);
                j.state = to;
                j.retry_count_for_state = 0;
                j.error = None;
                mutate(j);
            })
            .await
    }

    async fn fail(store: &JobStore, job_id: JobId, error: Error) -> Job {
        let job = store.get(job_id).await.expect("job exists in its own store");
        tracing::error!(job_id = %job_id, error = %error, "job_failed");
        store
            .transition(job_id, (job.state, job.retry_count_for_state), move |j| {
                j.previous_state = Some(j.state);
                j.state = JobState::Failed;
                j.ended_at = Some(chrono::Utc::now());
                j.error = Some(podcast_core::types::JobError {
                    kind: format!("{error:?}"),
                    message: error.to_string(),
                    retriable: false,
                });
            })
            .await
            .unwrap_or(job)
    }

    async fn step_uploaded(job: &Job) -> Result<StepResult, Error> {
        let _ = job;
        Ok(StepResult::to(JobState::Indexing))
    }

    async fn step_indexing(job: &Job, ctx: &DriveContext) -> Result<StepResult, Error> {
        let _ = job;
        let receipt = ctx
            .retriever
            .index_paper(ctx.paper.paper_id, &ctx.paper.body)
            .await
            .map_err(|e| Error::UpstreamTransient(e.to_string()))?;
        if receipt.coverage_ratio() < ctx.config.min_index_coverage {
            tracing::warn!(coverage = receipt.coverage_ratio(), "index_coverage_below_threshold");
        }
        Ok(StepResult::to(JobState::Planning))
    }

    async fn step_planning(job: &Job, ctx: &DriveContext) -> Result<StepResult, Error> {
        let _ = job;
        let options = GenerationOptions {
            deadline_ms: ctx.config.reasoner_deadline_ms,
            ..Default::default()
        };
        let excerpt: String = ctx.paper.body.chars().take(4000).collect();
        let (outline, usage) = ctx
            .reasoner
            .generate_outline(&ctx.paper.title, &excerpt, ctx.target_duration_s, options)
            .await
            .map_err(|e| map_reasoner_err(&ctx.budget, e))?;
        ctx.budget
            .record_usage(usage.total(), budget_governor::OperationClass::Reasoning);
        let mut outline = outline;
        outline.segments = insert_structural_segments(outline.segments);
        Ok(StepResult::to_with(JobState::Drafting, move |j| {
            j.outline = Some(outline);
        }))
    }

    async fn step_drafting(job: &Job, ctx: &DriveContext) -> Result<StepResult, Error> {
        let outline = job
            .outline
            .clone()
            .ok_or_else(|| Error::Internal("drafting without an outline".to_string()))?;

        let semaphore = Arc::new(Semaphore::new(ctx.config.max_segment_parallelism.max(1)));
        let mut joinset: JoinSet<Result<(usize, SegmentDraft), Error>> = JoinSet::new();

        for plan in &outline.segments {
            if matches!(plan.segment_type, SegmentType::Intro | SegmentType::AdBreak | SegmentType::Outro) {
                let draft = structural_draft(plan, ctx.style, &ctx.paper.title);
                let synthesizer = Arc::clone(&ctx.synthesizer);
                let style = ctx.style;
                joinset.spawn(async move {
                    let index = draft.plan.index;
                    Ok((index, synthesize_structural(draft, &synthesizer, style).await))
                });
                continue;
            }

            let permit = Arc::clone(&semaphore);
            let seg_ctx = SegmentContext {
                reasoner: Arc::clone(&ctx.reasoner),
                retriever: Arc::clone(&ctx.retriever),
                synthesizer: Arc::clone(&ctx.synthesizer),
                budget: ctx.budget.clone(),
                style: ctx.style,
                paper_id: ctx.paper.paper_id,
                acc_threshold: ctx.config.acc_threshold,
                max_rewrites: ctx.config.max_rewrites,
                max_segment_retries: ctx.config.max_segment_retries as usize,
                reasoner_deadline_ms: ctx.config.reasoner_deadline_ms,
                gaps: ConcatGaps::default(),
                cancel: ctx.cancel.clone(),
            };
            let plan = plan.clone();
            joinset.spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore never closed");
                let index = plan.index;
                segment_pipeline::run_segment(&seg_ctx, plan).await.map(|d| (index, d))
            });
        }

        let mut results: Vec<Option<SegmentDraft>> = (0..outline.segments.len()).map(|_| None).collect();
        let mut first_error = None;
        while let Some(joined) = joinset.join_next().await {
            match joined.expect("segment task panicked") {
                Ok((index, draft)) => results[index] = Some(draft),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if ctx.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let segments: Vec<SegmentDraft> = results
            .into_iter()
            .map(|s| s.ok_or_else(|| Error::Internal("segment task missing from join results".to_string())))
            .collect::<Result<_, _>>()?;

        Ok(StepResult::to_with(JobState::FactChecking, move |j| {
            j.segments = segments;
        }))
    }

    fn step_fact_checking(job: &Job) -> Result<StepResult, Error> {
        let already_rewritten = job.previous_state == Some(JobState::Rewriting);
        if already_rewritten {
            return Ok(StepResult::to(JobState::GeneratingAudio));
        }
        let any_rewritten = job.segments.iter().any(|s| s.rewrite_count > 0 && !s.is_structural);
        if any_rewritten {
            Ok(StepResult::to(JobState::Rewriting))
        } else {
            Ok(StepResult::to(JobState::GeneratingAudio))
        }
    }

    fn step_rewriting(job: &Job) -> Result<StepResult, Error> {
        let _ = job;
        Ok(StepResult::to(JobState::FactChecking))
    }

    fn step_generating_audio(job: &Job) -> Result<StepResult, Error> {
        let _ = job;
        Ok(StepResult::to(JobState::Stitching))
    }

    fn step_stitching(
        job: &Job,
        ctx: &DriveContext,
        episode_slot: &std::sync::Arc<std::sync::Mutex<Option<Episode>>>,
    ) -> Result<StepResult, Error> {
        let episode = EpisodeAssembler::assemble(job, &ctx.synthesizer, ConcatGaps::default())?;
        ctx.budget.record_usage(0, budget_governor::OperationClass::Reasoning);
        let ended_at = episode.created_at;
        let total_cost = episode.total_cost;
        *episode_slot.lock().unwrap() = Some(episode);
        Ok(StepResult::to_with(JobState::Completed, move |j| {
            j.ended_at = Some(ended_at);
            j.cost_estimate = total_cost;
        }))
    }
}

fn map_reasoner_err(budget: &budget_governor::BudgetGovernor, e: reasoner_gateway::ReasonerError) -> Error {
    use reasoner_gateway::ReasonerError;
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

/// Structural segments bypass [`segment_pipeline::run_segment`] entirely
/// (they're pre-verified by construction) but their single narrator line
/// still needs real audio before [`EpisodeAssembler`] can stitch them in.
async fn synthesize_structural(mut draft: SegmentDraft, synthesizer: &SynthesizerGateway, style: &'static Style) -> SegmentDraft {
    for line in draft.lines.iter_mut() {
        let audio = synthesizer.synthesize_line(&line.text, line.speaker, style).await;
        line.synthesis_degraded = audio.degraded;
        line.audio_ref = Some(audio);
    }
    let line_audio: Vec<podcast_core::types::AudioRef> = draft.lines.iter().filter_map(|l| l.audio_ref).collect();
    draft.audio_ref = Some(synthesizer.concatenate_segment(&line_audio, ConcatGaps::default()));
    draft
}

/// Inserts the intro at position 0, the outro at the end, and an ad break
/// after the middle core segment when there are at least four of them —
/// these are always `StyleEngine`-produced, never planned by the reasoner.
/// `core` is the reasoner's outline restricted to `Core`/`Takeaways`
/// segments; every returned plan's `index` is renumbered to its final
/// position so `step_drafting` can route by index regardless of join order.
fn insert_structural_segments(core: Vec<podcast_core::types::SegmentPlan>) -> Vec<podcast_core::types::SegmentPlan> {
    let mut segments = Vec::with_capacity(core.len() + 3);
    segments.push(structural_plan(SegmentType::Intro, "Intro"));
    if core.len() >= 4 {
        let midpoint = core.len() / 2;
        let (before, after) = core.split_at(midpoint);
        segments.extend(before.iter().cloned());
        segments.push(structural_plan(SegmentType::AdBreak, "Ad Break"));
        segments.extend(after.iter().cloned());
    } else {
        segments.extend(core);
    }
    segments.push(structural_plan(SegmentType::Outro, "Outro"));

    for (index, plan) in segments.iter_mut().enumerate() {
        plan.index = index;
    }
    segments
}

fn structural_plan(segment_type: SegmentType, title: &str) -> podcast_core::types::SegmentPlan {
    podcast_core::types::SegmentPlan {
        index: 0,
        segment_type,
        title: title.to_string(),
        duration_target_s: 0,
        key_points: Vec::new(),
        conversation_starters: Vec::new(),
    }
}

fn structural_draft(plan: &podcast_core::types::SegmentPlan, style: &'static Style, topic: &str) -> SegmentDraft {
    match plan.segment_type {
        SegmentType::Intro => style_engine::structural::intro(style, topic, plan.index),
        SegmentType::AdBreak => style_engine::structural::ad_break(style, topic, plan.index),
        SegmentType::Outro => style_engine::structural::outro(style, topic, plan.index),
        _ => unreachable!("structural_draft called on a non-structural segment type"),
    }
}

struct StepResult {
    to: JobState,
    mutate: Box<dyn FnOnce(&mut Job) + Send>,
}

impl StepResult {
    fn to(to: JobState) -> Self {
        Self { to, mutate: Box::new(|_| {}) }
    }

    fn to_with(to: JobState, mutate: impl FnOnce(&mut Job) + Send + 'static) -> Self {
        Self { to, mutate: Box::new(mutate) }
    }
}
