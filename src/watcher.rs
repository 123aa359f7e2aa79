use crate::engine::HostHandle;
use crate::host::{Candidate, CandidateQuery, HostPage};

/// What a structural mutation of the host subtree means for the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchVerdict {
    /// The bound composer is still the one the query finds.
    Unchanged,
    /// The query now finds a different composer node: the host replaced it.
    Replaced(Candidate),
    /// No composer matches at the moment. Multi-step host re-renders pass
    /// through this state; restarting here would thrash, so the binding is
    /// kept until a successor actually shows up.
    NoCandidate,
}

/// Classify a subtree mutation against the current binding.
pub fn inspect(
    host: &dyn HostPage,
    bound: &HostHandle,
    query: &CandidateQuery,
) -> WatchVerdict {
    match host.find_candidate(query) {
        Some(candidate) if candidate.editable != bound.editable => {
            tracing::info!(
                old = bound.editable,
                new = candidate.editable,
                "host replaced the composer node"
            );
            WatchVerdict::Replaced(candidate)
        }
        Some(_) => WatchVerdict::Unchanged,
        None => WatchVerdict::NoCandidate,
    }
}
