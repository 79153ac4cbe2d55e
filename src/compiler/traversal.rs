use crate::error::DeclarationError;
use crate::model::{GraphIndex, Invocation, Process};
use ahash::AHashSet;
use std::collections::VecDeque;

/// Computes the traversed-node set of every invocation.
///
/// `traversed(X)` holds X and every invocation on some path from a root to X.
/// Sets are computed in topological order; invocations on a cycle are
/// reported and only see the predecessors outside the cycle.
pub(crate) fn traversed_sets(
    process: &Process,
    graph: &GraphIndex,
) -> (Vec<AHashSet<String>>, Option<DeclarationError>) {
    let count = graph.len();
    let mut sets: Vec<AHashSet<String>> = process
        .invocations
        .iter()
        .map(|inv| AHashSet::from_iter([inv.name.clone()]))
        .collect();

    let mut indegree: Vec<usize> = (0..count).map(|idx| graph.predecessors(idx).len()).collect();
    let mut queue: VecDeque<usize> = (0..count).filter(|&idx| indegree[idx] == 0).collect();
    let mut visited = vec![false; count];

    while let Some(idx) = queue.pop_front() {
        visited[idx] = true;
        for &next in graph.successors(idx) {
            let inherited: Vec<String> = sets[idx].iter().cloned().collect();
            sets[next].extend(inherited);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    let cycle = (0..count)
        .filter(|&idx| !visited[idx])
        .map(|idx| process.invocations[idx].name.clone())
        .min()
        .map(DeclarationError::CyclicTransitions);

    (sets, cycle)
}

/// Two producers are mutually exclusive when neither lies on a path to the other,
/// as with the two sides of a conditional.
pub fn mutually_exclusive(a: &Invocation, b: &Invocation) -> bool {
    !a.traversed.contains(&b.name) && !b.traversed.contains(&a.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Invocation};

    fn process_with(names: &[&str], edges: &[(&str, &str)]) -> Process {
        let mut process = Process::new("p", "P");
        for name in names {
            process = process.with_invocation(Invocation::new(*name, Action::field_update()));
        }
        for (from, to) in edges {
            process = process.with_transition(from, to);
        }
        process
    }

    #[test]
    fn sets_accumulate_every_path_from_the_roots() {
        let process = process_with(
            &["A", "B", "C", "D"],
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D")],
        );
        let graph = GraphIndex::build(&process);
        let (sets, cycle) = traversed_sets(&process, &graph);
        assert!(cycle.is_none());

        let d: AHashSet<&str> = sets[3].iter().map(String::as_str).collect();
        assert_eq!(d, AHashSet::from_iter(["A", "B", "C", "D"]));
        let b: AHashSet<&str> = sets[1].iter().map(String::as_str).collect();
        assert_eq!(b, AHashSet::from_iter(["A", "B"]));
    }

    #[test]
    fn detects_cycles() {
        let process = process_with(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "B")]);
        let graph = GraphIndex::build(&process);
        let (_, cycle) = traversed_sets(&process, &graph);
        assert_eq!(cycle, Some(DeclarationError::CyclicTransitions("B".into())));
    }
}
