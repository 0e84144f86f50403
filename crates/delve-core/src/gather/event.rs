use std::fmt;

use crate::extract::Medium;

/// Extraction round within one gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    First,
    Retry,
    Backfill,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Round::First => "first pass",
            Round::Retry => "retry",
            Round::Backfill => "backfill",
        };
        f.write_str(s)
    }
}

/// Why a candidate did not become a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingUrl,
    ExtractionFailed,
    TooShort { chars: usize, threshold: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingUrl => f.write_str("candidate has no URL"),
            RejectReason::ExtractionFailed => f.write_str("no extractable content"),
            RejectReason::TooShort { chars, threshold } => {
                write!(f, "content too short ({chars} chars, need more than {threshold})")
            }
        }
    }
}

/// Progress notifications from [`Gatherer`](super::Gatherer).
///
/// The gatherer never prints; a front end subscribes to these instead.
#[derive(Debug, Clone, PartialEq)]
pub enum GatherEvent {
    Searching { desired: usize },
    ManualCandidates { count: usize },
    CandidatesFound { count: usize },
    RoundStarted { round: Round, count: usize },
    Accepted {
        url: String,
        title: String,
        medium: Medium,
        chars: usize,
    },
    Rejected { url: String, reason: RejectReason },
    RoundFinished { round: Round, accepted: usize, failed: usize },
    Finished { accepted: usize, min_sources: usize },
}
