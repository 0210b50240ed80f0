//! One `BudgetGovernor` per job. Internally lock-free: every counter is an
//! `AtomicU64`, so every segment task and gateway call can hold a cheap
//! `Arc`-cloned handle without contending on a mutex. A momentarily stale
//! read only delays a threshold check by one call; the hard per-state gate in
//! the orchestrator's drive loop still catches it on the next iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use podcast_core::{AppConfig, BudgetExceededReason, Error};

/// Which per-unit pricing rate applies to a usage record. `Synthesis` is
/// priced per character rather than per token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Reasoning,
    Embedding,
    Synthesis,
}

/// `$` per 1,000 tokens for `Reasoning`/`Embedding`, `$` per character for
/// `Synthesis`. Kept in one place so pricing never scatters across call
/// sites as ad-hoc `cost_estimate += ...` arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct RateTable {
    pub reasoning_per_1k_tokens: f64,
    pub embedding_per_1k_tokens: f64,
    pub synthesis_per_char: f64,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            reasoning_per_1k_tokens: 0.01,
            embedding_per_1k_tokens: 0.0001,
            synthesis_per_char: 0.00003,
        }
    }
}

struct Inner {
    cost_micros: AtomicU64,
    tokens_used: AtomicU64,
    started_at: Instant,
    max_cost_usd: f64,
    cost_alert_threshold: f64,
    max_tokens_per_paper: u64,
    max_processing_time_s: u64,
    rates: RateTable,
}

#[derive(Clone)]
pub struct BudgetGovernor(Arc<Inner>);

impl BudgetGovernor {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_rates(config, RateTable::default())
    }

    pub fn with_rates(config: &AppConfig, rates: RateTable) -> Self {
        Self(Arc::new(Inner {
            cost_micros: AtomicU64::new(0),
            tokens_used: AtomicU64::new(0),
            started_at: Instant::now(),
            max_cost_usd: config.max_cost_usd,
            cost_alert_threshold: config.cost_alert_threshold,
            max_tokens_per_paper: config.max_tokens_per_paper,
            max_processing_time_s: config.max_processing_time_s,
            rates,
        }))
    }

    fn cost_spent(&self) -> f64 {
        self.0.cost_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    fn elapsed_s(&self) -> u64 {
        self.0.started_at.elapsed().as_secs()
    }

    /// Estimates the dollar cost of `amount` units of `class` (tokens for
    /// `Reasoning`/`Embedding`, characters for `Synthesis`) without recording
    /// it.
    pub fn estimate_cost(&self, amount: u64, class: OperationClass) -> f64 {
        match class {
            OperationClass::Reasoning => amount as f64 / 1000.0 * self.0.rates.reasoning_per_1k_tokens,
            OperationClass::Embedding => amount as f64 / 1000.0 * self.0.rates.embedding_per_1k_tokens,
            OperationClass::Synthesis => amount as f64 * self.0.rates.synthesis_per_char,
        }
    }

    /// Checks whether spending `estimated_tokens` more (priced under `class`)
    /// would breach the token or cost ceiling, without mutating any counter.
    /// Called by gateways before an upstream call is issued.
    pub fn check_precall(&self, estimated_tokens: u64, class: OperationClass) -> bool {
        let projected_tokens = self.0.tokens_used.load(Ordering::Relaxed) + estimated_tokens;
        if projected_tokens > self.0.max_tokens_per_paper {
            return false;
        }
        let projected_cost = self.cost_spent() + self.estimate_cost(estimated_tokens, class);
        projected_cost <= self.0.max_cost_usd
    }

    /// Records actually-consumed usage. `amount` is tokens for
    /// `Reasoning`/`Embedding`, characters for `Synthesis`; only
    /// `Reasoning`/`Embedding` usage counts against `max_tokens_per_paper`.
    pub fn record_usage(&self, amount: u64, class: OperationClass) {
        let dollars = self.estimate_cost(amount, class);
        self.0
            .cost_micros
            .fetch_add((dollars * 1_000_000.0) as u64, Ordering::Relaxed);
        if matches!(class, OperationClass::Reasoning | OperationClass::Embedding) {
            self.0.tokens_used.fetch_add(amount, Ordering::Relaxed);
        }
        if self.cost_spent() >= self.0.cost_alert_threshold {
            tracing::warn!(
                cost_spent = self.cost_spent(),
                threshold = self.0.cost_alert_threshold,
                "budget_alert_threshold_crossed"
            );
        }
    }

    pub fn snapshot(&self) -> podcast_core::types::BudgetSnapshot {
        podcast_core::types::BudgetSnapshot {
            max_cost: self.0.max_cost_usd,
            alert_threshold: self.0.cost_alert_threshold,
            max_tokens_per_paper: self.0.max_tokens_per_paper,
            max_processing_time_s: self.0.max_processing_time_s,
            cost_spent: self.cost_spent(),
            tokens_used: self.0.tokens_used.load(Ordering::Relaxed),
            elapsed_s: self.elapsed_s(),
        }
    }

    /// The hard per-state gate the orchestrator consults before every
    /// transition. Returns `Err(Error::BudgetExceeded(..))` with the reason
    /// that actually tripped, `Ok(())` otherwise.
    pub fn check_hard_stop(&self) -> Result<(), Error> {
        let snap = self.snapshot();
        if snap.cost_spent >= snap.max_cost {
            return Err(Error::BudgetExceeded(BudgetExceededReason::Cost {
                spent: snap.cost_spent,
                max: snap.max_cost,
            }));
        }
        if snap.tokens_used >= snap.max_tokens_per_paper {
            return Err(Error::BudgetExceeded(BudgetExceededReason::Tokens {
                used: snap.tokens_used,
                max: snap.max_tokens_per_paper,
            }));
        }
        if snap.elapsed_s >= snap.max_processing_time_s {
            return Err(Error::BudgetExceeded(BudgetExceededReason::ElapsedTime {
                elapsed_s: snap.elapsed_s,
                max_s: snap.max_processing_time_s,
            }));
        }
        Ok(())
    }
}
