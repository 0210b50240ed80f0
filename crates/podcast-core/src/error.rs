#[derive(Debug, Clone, PartialEq)]
pub enum BudgetExceededReason {
    Cost { spent: f64, max: f64 },
    Tokens { used: u64, max: u64 },
    ElapsedTime { elapsed_s: u64, max_s: u64 },
}

impl std::fmt::Display for BudgetExceededReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cost { spent, max } => write!(f, "cost ${spent:.2} >= max ${max:.2}"),
            Self::Tokens { used, max } => write!(f, "tokens {used} >= max {max}"),
            Self::ElapsedTime { elapsed_s, max_s } => {
                write!(f, "elapsed {elapsed_s}s >= max {max_s}s")
            }
        }
    }
}

/// The error taxonomy every component's failures fold into. Lower-layer
/// crates keep their own narrow `thiserror` enums and convert into this one
/// at the point they cross into `segment-pipeline`/`orchestrator` — nothing
/// below that boundary depends on the full cross-cutting taxonomy directly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(BudgetExceededReason),

    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    #[error("upstream permanent error: {0}")]
    UpstreamPermanent(String),

    #[error("malformed contract: {0}")]
    Contract(String),

    #[error("verification unresolvable for segment {segment_index}")]
    VerifyUnresolvable { segment_index: usize },

    #[error("synthesis degraded for segment {segment_index} line {line_index}")]
    SynthesizeDegraded {
        segment_index: usize,
        line_index: usize,
    },

    #[error("job cancelled")]
    Cancelled,

    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same state/operation could plausibly succeed.
    /// A pure function of the variant, not a stored field, so it can never
    /// drift out of sync with the variant it describes.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::UpstreamTransient(_) | Error::Contract(_))
    }

    /// Maps a terminal job outcome to the process exit codes named for the
    /// batch-tool surface: `0` success, `1` bad input, `2` budget exceeded,
    /// `3` upstream failure, `4` internal contract violation. Defined here so
    /// a future CLI/HTTP surface gets the mapping for free.
    pub fn exit_code<T>(result: &Result<T, Error>) -> u8 {
        match result {
            Ok(_) => 0,
            Err(Error::BadInput(_)) => 1,
            Err(Error::BudgetExceeded(_)) => 2,
            Err(Error::UpstreamTransient(_) | Error::UpstreamPermanent(_)) => 3,
            Err(Error::Contract(_) | Error::Internal(_)) => 4,
            Err(Error::VerifyUnresolvable { .. } | Error::SynthesizeDegraded { .. }) => 0,
            Err(Error::Cancelled) => 3,
        }
    }
}
