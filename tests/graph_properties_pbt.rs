//! Property-based tests for prerequisite graph validation and eligibility.
//!
//! - Any DAG validates and its topological order respects every edge
//! - Adding a two-way edge between two modules is always rejected with a real cycle
//! - A back edge closing an existing path is rejected with a real, possibly long, cycle
//! - Eligibility holds exactly when all direct prerequisites are completed
//! - Course completion requires a non-empty course with every module completed

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use course_progress_backend::progress::eligibility;
use course_progress_backend::progress::types::PrerequisiteEdge;
use course_progress_backend::progress::{GraphError, PrerequisiteGraph};

// ============================================================================
// Generators
// ============================================================================

fn module_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("m{i}")).collect()
}

/// Edges only point from a higher index to a lower one, so the result is acyclic.
fn arb_dag() -> impl Strategy<Value = (Vec<String>, Vec<PrerequisiteEdge>)> {
    (1usize..12).prop_flat_map(|n| {
        let pairs = n * (n - 1) / 2;
        proptest::collection::vec(any::<bool>(), pairs).prop_map(move |mask| {
            let ids = module_ids(n);
            let mut edges = Vec::new();
            let mut bit = 0;
            for dependent in 0..n {
                for required in 0..dependent {
                    if mask[bit] {
                        edges.push(PrerequisiteEdge::new(ids[dependent].clone(), ids[required].clone()));
                    }
                    bit += 1;
                }
            }
            (ids, edges)
        })
    })
}

/// A DAG that contains the chain `m1 -> m0, m2 -> m1, ..., mk -> m(k-1)` plus a back
/// edge `m0 -> mk`, so every cycle runs through the back edge and the chain path.
fn arb_dag_with_back_edge() -> impl Strategy<Value = (Vec<PrerequisiteEdge>, Vec<String>, usize)> {
    arb_dag()
        .prop_filter("needs at least three modules", |(ids, _)| ids.len() >= 3)
        .prop_flat_map(|(ids, edges)| {
            let n = ids.len();
            (Just(ids), Just(edges), 2..n)
        })
        .prop_map(|(ids, mut edges, k)| {
            for i in 1..=k {
                let link = PrerequisiteEdge::new(ids[i].clone(), ids[i - 1].clone());
                if !edges.contains(&link) {
                    edges.push(link);
                }
            }
            edges.push(PrerequisiteEdge::new(ids[0].clone(), ids[k].clone()));
            (edges, ids, k)
        })
}

fn arb_dag_with_completions(
) -> impl Strategy<Value = (Vec<String>, Vec<PrerequisiteEdge>, HashSet<String>)> {
    arb_dag().prop_flat_map(|(ids, edges)| {
        let n = ids.len();
        proptest::collection::vec(any::<bool>(), n).prop_map(move |mask| {
            let completed = ids
                .iter()
                .zip(mask)
                .filter(|(_, done)| *done)
                .map(|(id, _)| id.clone())
                .collect();
            (ids.clone(), edges.clone(), completed)
        })
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_dag_validates_with_consistent_order((ids, edges) in arb_dag()) {
        let graph = PrerequisiteGraph::build(ids.iter().cloned(), &edges)
            .validate()
            .expect("acyclic graph must validate");

        let order = graph.topological_order();
        prop_assert_eq!(order.len(), ids.len());
        let unique: BTreeSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());

        let position = |id: &str| order.iter().position(|o| o == id).unwrap();
        for edge in &edges {
            prop_assert!(position(edge.required_module_id.as_str()) < position(edge.module_id.as_str()));
        }
    }

    #[test]
    fn prop_two_way_edge_is_rejected_with_witness(
        (ids, mut edges) in arb_dag(),
        a in 0usize..12,
        b in 0usize..12,
    ) {
        let a = a % ids.len();
        let b = b % ids.len();
        edges.push(PrerequisiteEdge::new(ids[a].clone(), ids[b].clone()));
        edges.push(PrerequisiteEdge::new(ids[b].clone(), ids[a].clone()));

        let err = PrerequisiteGraph::build(ids.iter().cloned(), &edges)
            .validate()
            .unwrap_err();

        let witness = match err {
            GraphError::CycleDetected { module_ids } => module_ids,
            other => return Err(TestCaseError::fail(format!("unexpected error: {other:?}"))),
        };
        prop_assert!(!witness.is_empty());

        let edge_set: HashSet<(String, String)> = edges
            .iter()
            .map(|e| (e.module_id.clone(), e.required_module_id.clone()))
            .collect();
        for (i, dependent) in witness.iter().enumerate() {
            let required = &witness[(i + 1) % witness.len()];
            prop_assert!(edge_set.contains(&(dependent.clone(), required.clone())));
        }
    }

    #[test]
    fn prop_back_edge_along_a_path_is_rejected_with_witness(
        (edges, ids, k) in arb_dag_with_back_edge()
    ) {
        let err = PrerequisiteGraph::build(ids.iter().cloned(), &edges)
            .validate()
            .unwrap_err();

        let witness = match err {
            GraphError::CycleDetected { module_ids } => module_ids,
            other => return Err(TestCaseError::fail(format!("unexpected error: {other:?}"))),
        };
        prop_assert!(witness.len() >= 2);
        prop_assert!(witness.len() <= k + 1);

        let edge_set: HashSet<(String, String)> = edges
            .iter()
            .map(|e| (e.module_id.clone(), e.required_module_id.clone()))
            .collect();
        for (i, dependent) in witness.iter().enumerate() {
            let required = &witness[(i + 1) % witness.len()];
            prop_assert!(edge_set.contains(&(dependent.clone(), required.clone())));
        }
        // The only upward edge is the injected one, so every cycle uses it.
        prop_assert!(edge_set.contains(&(ids[0].clone(), ids[k].clone())));
        prop_assert!(witness.contains(&ids[0]) && witness.contains(&ids[k]));
    }

    #[test]
    fn prop_eligibility_matches_direct_prerequisites(
        (ids, edges, completed) in arb_dag_with_completions()
    ) {
        let graph = PrerequisiteGraph::build(ids.iter().cloned(), &edges)
            .validate()
            .unwrap();

        for id in &ids {
            let decision = eligibility::can_complete(&graph, &completed, id).unwrap();
            let expected = edges
                .iter()
                .filter(|e| &e.module_id == id)
                .all(|e| completed.contains(&e.required_module_id));
            prop_assert_eq!(decision.eligible, expected);
            prop_assert!(decision
                .missing_prerequisites
                .iter()
                .all(|m| !completed.contains(m)));
        }
    }

    #[test]
    fn prop_course_complete_iff_every_module_done(
        (ids, _edges, completed) in arb_dag_with_completions()
    ) {
        let counts = eligibility::compute_progress(&ids, &completed);
        prop_assert!((0.0..=100.0).contains(&counts.percent_complete()));
        prop_assert_eq!(
            eligibility::is_course_complete(&ids, &completed),
            ids.iter().all(|id| completed.contains(id))
        );
    }
}

#[test]
fn empty_course_is_not_complete() {
    let completed = HashSet::new();
    assert!(!eligibility::is_course_complete(&[], &completed));
    assert_eq!(eligibility::compute_progress(&[], &completed).percent_complete(), 0.0);
}
