//! The job registry. One process-wide `JobStore` holds every in-flight
//! `Job` behind a `tokio::sync::RwLock<HashMap<..>>` — readers (status
//! polling) never block each other, writers (the orchestrator's drive loop)
//! take the lock only for the duration of a single snapshot swap.
//!
//! Transitions go through [`JobStore::transition`], which compares the
//! caller's expected `(JobState, retry_count_for_state)` against the stored
//! job before applying a mutation. A caller racing against a more recent
//! write — of which there should only ever be one, since a job is only ever
//! driven by one orchestrator task at a time — gets
//! `Error::Internal("stale job transition")` rather than silently clobbering
//! the fresher state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use podcast_core::ids::{JobId, PaperId, StyleId};
use podcast_core::types::{Job, JobState};
use podcast_core::Error;
use tokio::sync::{broadcast, RwLock};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct JobEvent {
    pub job_id: JobId,
    pub state: JobState,
    pub progress_pct: u8,
    pub error: Option<String>,
}

struct JobEntry {
    job: Job,
    events: broadcast::Sender<JobEvent>,
}

#[derive(Default)]
pub struct JobStore {
    inner: RwLock<HashMap<JobId, JobEntry>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, paper_id: PaperId, style_id: StyleId) -> Job {
        let job = Job::new(JobId::new(), paper_id, style_id, Utc::now());
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let entry = JobEntry {
            job: job.clone(),
            events: tx,
        };
        self.inner.write().await.insert(job.job_id, entry);
        job
    }

    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        self.inner.read().await.get(&job_id).map(|e| e.job.clone())
    }

    pub async fn subscribe(&self, job_id: JobId) -> Option<broadcast::Receiver<JobEvent>> {
        self.inner.read().await.get(&job_id).map(|e| e.events.subscribe())
    }

    /// Applies `mutate` to the stored job iff its current `(state,
    /// retry_count_for_state)` matches `expected`, then broadcasts the
    /// resulting `JobEvent` to any subscriber. `mutate` is responsible for
    /// setting `job.state` to a member of `job.state.legal_successors()`;
    /// this function only enforces the CAS precondition, not the transition
    /// table itself (see `JobState::legal_successors`).
    pub async fn transition<F>(
        &self,
        job_id: JobId,
        expected: (JobState, u32),
        mutate: F,
    ) -> Result<Job, Error>
    where
        F: FnOnce(&mut Job),
    {
        let mut guard = self.inner.write().await;
        let entry = guard
            .get_mut(&job_id)
            .ok_or_else(|| Error::Internal(format!("unknown job {job_id}")))?;

        let actual = (entry.job.state, entry.job.retry_count_for_state);
        if actual != expected {
            return Err(Error::Internal(format!(
                "stale job transition for {job_id}: expected {expected:?}, found {actual:?}"
            )));
        }

        mutate(&mut entry.job);
        // `Rewriting(75) -> FactChecking(70)` is a legal re-entry edge with a
        // lower raw table value; clamp so `progress_pct` stays
        // monotonically non-decreasing across the whole job regardless of
        // how many rewrite passes it takes.
        entry.job.progress_pct = entry.job.progress_pct.max(entry.job.state.progress_pct());

        let event = JobEvent {
            job_id,
            state: entry.job.state,
            progress_pct: entry.job.progress_pct,
            error: entry.job.error.as_ref().map(|e| e.message.clone()),
        };
        let _ = entry.events.send(event);

        Ok(entry.job.clone())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

pub type SharedJobStore = Arc<JobStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips_the_job() {
        let store = JobStore::new();
        let job = store.create(PaperId::new(), StyleId::new()).await;
        let fetched = store.get(job.job_id).await.unwrap();
        assert_eq!(fetched.job_id, job.job_id);
        assert_eq!(fetched.state, JobState::Uploaded);
    }

    #[tokio::test]
    async fn transition_applies_mutation_when_expectation_matches() {
        let store = JobStore::new();
        let job = store.create(PaperId::new(), StyleId::new()).await;
        let updated = store
            .transition(job.job_id, (JobState::Uploaded, 0), |j| {
                j.state = JobState::Indexing;
            })
            .await
            .unwrap();
        assert_eq!(updated.state, JobState::Indexing);
        assert_eq!(updated.progress_pct, JobState::Indexing.progress_pct());
    }

    #[tokio::test]
    async fn transition_rejects_a_stale_expectation() {
        let store = JobStore::new();
        let job = store.create(PaperId::new(), StyleId::new()).await;
        store
            .transition(job.job_id, (JobState::Uploaded, 0), |j| j.state = JobState::Indexing)
            .await
            .unwrap();

        let err = store
            .transition(job.job_id, (JobState::Uploaded, 0), |j| j.state = JobState::Planning)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn subscribers_observe_transition_events() {
        let store = JobStore::new();
        let job = store.create(PaperId::new(), StyleId::new()).await;
        let mut rx = store.subscribe(job.job_id).await.unwrap();
        store
            .transition(job.job_id, (JobState::Uploaded, 0), |j| j.state = JobState::Indexing)
            .await
            .unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.state, JobState::Indexing);
    }

    /// Drives real `transition` calls along a randomly chosen legal walk
    /// (including the `Rewriting -> FactChecking` re-entry edge, where the
    /// raw per-state table dips from 75 to 70) and asserts the `progress_pct`
    /// a caller actually observes never regresses, exercising the
    /// `progress_pct.max(...)` clamp above rather than the bare table.
    #[quickcheck_macros::quickcheck]
    fn progress_clamp_is_monotonic_along_any_legal_walk(choices: Vec<u8>) -> bool {
        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let store = JobStore::new();
            let job = store.create(PaperId::new(), StyleId::new()).await;
            let mut state = JobState::Uploaded;
            let mut retry = 0u32;
            let mut last_pct = 0u8;
            for &choice in choices.iter().take(32) {
                let successors = state.legal_successors();
                if successors.is_empty() {
                    break;
                }
                let next = successors[choice as usize % successors.len()];
                let updated = store
                    .transition(job.job_id, (state, retry), move |j| j.state = next)
                    .await
                    .expect("walk only ever uses the expectation it just observed");
                if updated.progress_pct < last_pct {
                    return false;
                }
                last_pct = updated.progress_pct;
                state = next;
                retry = 0;
            }
            true
        })
    }
}
