use crate::model::Value;
use crate::trace::RunTrace;
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Blocked input name to the producers it still waits for, by invocation index.
pub(crate) type MissingInputs = BTreeMap<String, BTreeSet<usize>>;

/// Run-local state, reset before every execution.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    /// Named outputs of every executed invocation.
    pub(crate) results: AHashMap<usize, AHashMap<String, Value>>,
    pub(crate) blocked: BTreeMap<usize, MissingInputs>,
    pub(crate) trace: RunTrace,
}

impl RunState {
    pub(crate) fn has_executed(&self, idx: usize) -> bool {
        self.results.contains_key(&idx)
    }

    /// Drops inputs that one of their producers has delivered since the
    /// invocation blocked. Producers of one input are mutually exclusive, so
    /// the others will not run.
    pub(crate) fn prune_blocked(&mut self) {
        let RunState {
            results, blocked, ..
        } = self;
        for missing in blocked.values_mut() {
            missing.retain(|_, producers| !producers.iter().any(|p| results.contains_key(p)));
        }
    }

    /// Blocked invocations with no remaining missing input, in index order.
    pub(crate) fn resumable(&self) -> Vec<usize> {
        self.blocked
            .iter()
            .filter(|(_, missing)| missing.is_empty())
            .map(|(idx, _)| *idx)
            .collect()
    }
}

/// Inputs gathered for one invocation.
pub(crate) enum Gathered {
    Ready(AHashMap<String, Value>),
    Missing(MissingInputs),
}

/// Result of visiting one invocation during a sweep.
pub(crate) enum Visit {
    /// Ran; descend into successors, restricted to the filter when present.
    Proceed(Option<Vec<usize>>),
    Blocked,
    /// Already ran earlier in this run.
    Done,
}
