// tests/pipeline_property.rs

use proptest::prelude::*;

use pagewright::pipeline::{Pipeline, parallel, series, task};
use pagewright::types::TaskKind;

/// A random series/parallel tree over distinct tasks.
fn pipeline_strategy() -> impl Strategy<Value = Pipeline> {
    Just(TaskKind::ALL.to_vec())
        .prop_shuffle()
        .prop_flat_map(|kinds| {
            (1..=kinds.len()).prop_flat_map(move |n| {
                let leaves: Vec<Pipeline> = kinds[..n].iter().copied().map(task).collect();
                proptest::collection::vec(any::<(bool, u8)>(), n).prop_map(move |shape| {
                    combine(leaves.clone(), &shape)
                })
            })
        })
}

/// Fold leaves into nested groups, choosing series or parallel per level.
fn combine(mut nodes: Vec<Pipeline>, shape: &[(bool, u8)]) -> Pipeline {
    let mut i = 0;
    while nodes.len() > 1 {
        let (is_series, width) = shape[i % shape.len()];
        let width = (width as usize % nodes.len()).max(2).min(nodes.len());
        let group: Vec<Pipeline> = nodes.drain(..width).collect();
        let node = if is_series { series(group) } else { parallel(group) };
        nodes.insert(0, node);
        i += 1;
    }
    nodes.remove(0)
}

/// Every pair (a, b) where `a` must finish before `b` starts.
fn ordering_pairs(p: &Pipeline) -> Vec<(TaskKind, TaskKind)> {
    let mut out = Vec::new();
    if let Pipeline::Series(children) = p {
        for (i, earlier) in children.iter().enumerate() {
            for later in &children[i + 1..] {
                for a in earlier.tasks() {
                    for b in later.tasks() {
                        out.push((a, b));
                    }
                }
            }
        }
    }
    if let Pipeline::Series(children) | Pipeline::Parallel(children) = p {
        for c in children {
            out.extend(ordering_pairs(c));
        }
    }
    out
}

proptest! {
    #[test]
    fn lowering_keeps_every_task_once(p in pipeline_strategy()) {
        let graph = p.lower().unwrap();
        prop_assert_eq!(graph.len(), p.tasks().len());
    }

    #[test]
    fn series_order_survives_lowering(p in pipeline_strategy()) {
        let graph = p.lower().unwrap();
        let order = graph.topo_order().unwrap();
        for (a, b) in ordering_pairs(&p) {
            prop_assert!(graph.depends_on(b, a), "{} should depend on {}", b, a);
            let pa = order.iter().position(|k| *k == a).unwrap();
            let pb = order.iter().position(|k| *k == b).unwrap();
            prop_assert!(pa < pb);
        }
    }

    #[test]
    fn parallel_siblings_are_independent(p in pipeline_strategy()) {
        let graph = p.lower().unwrap();
        if let Pipeline::Parallel(children) = &p {
            for (i, left) in children.iter().enumerate() {
                for right in &children[i + 1..] {
                    for a in left.tasks() {
                        for b in right.tasks() {
                            prop_assert!(!graph.depends_on(a, b) && !graph.depends_on(b, a));
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn duplicate_task_is_rejected() {
    let p = series([task(TaskKind::Style), task(TaskKind::Style)]);
    assert!(p.lower().is_err());
}
