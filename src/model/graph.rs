use super::Process;
use ahash::AHashMap;

/// Positional view of a process's control flow.
///
/// Invocations are addressed by their index in `Process::invocations`.
/// Transitions naming unknown invocations are left out; the standardizer
/// reports them.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    by_name: AHashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl GraphIndex {
    pub fn build(process: &Process) -> Self {
        let count = process.invocations.len();
        let mut by_name = AHashMap::with_capacity(count);
        for (idx, invocation) in process.invocations.iter().enumerate() {
            by_name.entry(invocation.name.clone()).or_insert(idx);
        }

        let mut successors = vec![Vec::new(); count];
        let mut predecessors = vec![Vec::new(); count];
        for transition in &process.transitions {
            let (Some(&prev), Some(&next)) = (
                by_name.get(&transition.previous.name),
                by_name.get(&transition.next.name),
            ) else {
                continue;
            };
            if !successors[prev].contains(&next) {
                successors[prev].push(next);
                predecessors[next].push(prev);
            }
        }

        Self {
            by_name,
            successors,
            predecessors,
        }
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.successors[idx]
    }

    pub fn predecessors(&self, idx: usize) -> &[usize] {
        &self.predecessors[idx]
    }

    /// Invocations without an incoming transition, in declaration order.
    pub fn starting_points(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&idx| self.predecessors[idx].is_empty())
            .collect()
    }
}
