//! Evaluation order resolution.
//!
//! [`Schedule::resolve`] runs once before the first step. It orders systems
//! so that every system is evaluated after all systems whose outputs or
//! derivatives it reads, breaking ties by registration order. A dependency
//! cycle is reported as the concrete path of systems that forms it.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use portsim_core::SystemId;

use crate::error::SimError;

/// A resolved evaluation order over all registered systems.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    order: Vec<SystemId>,
}

impl Schedule {
    /// Order `system_count` systems subject to `dependencies`, given as
    /// `(before, after)` pairs.
    ///
    /// Among systems that are ready at the same time, the one registered
    /// first runs first. `label` names systems in the cycle report.
    ///
    /// ```
    /// use portsim_core::SystemId;
    /// use portsim_engine::Schedule;
    ///
    /// // 2 feeds 0; 1 is independent.
    /// let s = Schedule::resolve(3, [(SystemId(2), SystemId(0))], |id| id.to_string()).unwrap();
    /// assert_eq!(s.order(), &[SystemId(1), SystemId(2), SystemId(0)]);
    /// ```
    pub fn resolve<I, F>(system_count: usize, dependencies: I, label: F) -> Result<Self, SimError>
    where
        I: IntoIterator<Item = (SystemId, SystemId)>,
        F: Fn(SystemId) -> String,
    {
        let edges: BTreeSet<(usize, usize)> = dependencies
            .into_iter()
            .map(|(before, after)| (before.index(), after.index()))
            .filter(|&(before, after)| before < system_count && after < system_count)
            .collect();

        let mut successors = vec![Vec::new(); system_count];
        let mut predecessors = vec![Vec::new(); system_count];
        let mut indegree = vec![0usize; system_count];
        for &(before, after) in &edges {
            successors[before].push(after);
            predecessors[after].push(before);
            indegree[after] += 1;
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..system_count)
            .filter(|&i| indegree[i] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(system_count);
        while let Some(Reverse(next)) = ready.pop() {
            order.push(SystemId(next as u32));
            for &after in &successors[next] {
                indegree[after] -= 1;
                if indegree[after] == 0 {
                    ready.push(Reverse(after));
                }
            }
        }

        if order.len() < system_count {
            let cycle = find_cycle(&indegree, &predecessors)
                .into_iter()
                .map(|i| label(SystemId(i as u32)))
                .collect();
            return Err(SimError::CyclicDependency { cycle });
        }
        Ok(Self { order })
    }

    /// Systems in evaluation order.
    pub fn order(&self) -> &[SystemId] {
        &self.order
    }

    /// Number of scheduled systems.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no systems are scheduled.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `system` in the order.
    pub fn position(&self, system: SystemId) -> Option<usize> {
        self.order.iter().position(|&s| s == system)
    }
}

/// Walk backwards through unscheduled systems until one repeats.
///
/// Every system left with a positive in-degree has an unscheduled
/// predecessor, so the walk always closes. Returns the cycle in forward
/// order with its first system repeated at the end.
fn find_cycle(indegree: &[usize], predecessors: &[Vec<usize>]) -> Vec<usize> {
    let Some(start) = indegree.iter().position(|&d| d > 0) else {
        return Vec::new();
    };
    let mut seen_at = vec![None; indegree.len()];
    let mut path = Vec::new();
    let mut current = start;
    loop {
        if let Some(at) = seen_at[current] {
            let mut cycle: Vec<usize> = path[at..].to_vec();
            cycle.reverse();
            if let Some(&first) = cycle.first() {
                cycle.push(first);
            }
            return cycle;
        }
        seen_at[current] = Some(path.len());
        path.push(current);
        match predecessors[current].iter().find(|&&p| indegree[p] > 0) {
            Some(&p) => current = p,
            None => return path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(i: u32) -> SystemId {
        SystemId(i)
    }

    fn label(id: SystemId) -> String {
        format!("s{id}")
    }

    #[test]
    fn independent_systems_keep_registration_order() {
        let s = Schedule::resolve(4, std::iter::empty(), label).unwrap();
        assert_eq!(s.order(), &[id(0), id(1), id(2), id(3)]);
    }

    #[test]
    fn sources_run_before_destinations() {
        // 3 -> 1 -> 0, 2 independent
        let s = Schedule::resolve(4, [(id(3), id(1)), (id(1), id(0))], label).unwrap();
        assert_eq!(s.order(), &[id(2), id(3), id(1), id(0)]);
        assert!(s.position(id(3)) < s.position(id(1)));
    }

    #[test]
    fn duplicate_edges_are_harmless() {
        let s = Schedule::resolve(2, [(id(1), id(0)), (id(1), id(0))], label).unwrap();
        assert_eq!(s.order(), &[id(1), id(0)]);
    }

    #[test]
    fn two_cycle_reported_as_path() {
        let err = Schedule::resolve(3, [(id(0), id(1)), (id(1), id(0))], label).unwrap_err();
        match err {
            SimError::CyclicDependency { cycle } => {
                assert_eq!(cycle.len(), 3);
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"s0".to_string()));
                assert!(cycle.contains(&"s1".to_string()));
                assert!(!cycle.contains(&"s2".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn cycle_path_follows_edge_direction() {
        // 0 -> 1 -> 2 -> 0, plus 3 downstream of the cycle
        let err = Schedule::resolve(
            4,
            [(id(0), id(1)), (id(1), id(2)), (id(2), id(0)), (id(2), id(3))],
            label,
        )
        .unwrap_err();
        let SimError::CyclicDependency { cycle } = err else {
            panic!("expected cycle");
        };
        let rotations = [
            vec!["s0", "s1", "s2", "s0"],
            vec!["s1", "s2", "s0", "s1"],
            vec!["s2", "s0", "s1", "s2"],
        ];
        assert!(rotations.iter().any(|r| *r == cycle), "{cycle:?}");
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let err = Schedule::resolve(1, [(id(0), id(0))], label).unwrap_err();
        assert_eq!(
            err,
            SimError::CyclicDependency {
                cycle: vec!["s0".into(), "s0".into()]
            }
        );
    }

    proptest! {
        #[test]
        fn forward_edges_always_schedule(
            n in 1usize..12,
            raw in prop::collection::vec((0usize..12, 0usize..12), 0..40),
        ) {
            // Edges from lower to higher index can never form a cycle.
            let edges: Vec<_> = raw
                .into_iter()
                .filter(|&(a, b)| a < b && b < n)
                .map(|(a, b)| (id(a as u32), id(b as u32)))
                .collect();
            let s = Schedule::resolve(n, edges.clone(), label).unwrap();
            prop_assert_eq!(s.len(), n);
            for (a, b) in edges {
                prop_assert!(s.position(a) < s.position(b));
            }
        }
    }
}
