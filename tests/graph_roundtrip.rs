use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use webgraph::bits::Code;
use webgraph::{BVGraph, CompressionFlags, LoadMode};

fn store(dir: &TempDir, name: &str, lists: &[Vec<u64>], flags: CompressionFlags) -> String {
    let basename = dir.path().join(name).to_string_lossy().to_string();
    BVGraph::store_from(
        &basename,
        lists.len() as u64,
        "webgraph.testgraph",
        flags,
        lists.iter().cloned(),
    )
    .unwrap();
    basename
}

fn assert_full_graph_matches(basename: &str, lists: &[Vec<u64>]) {
    for mode in [LoadMode::Offline, LoadMode::Sequential, LoadMode::Random] {
        let graph = BVGraph::load(basename, mode).unwrap();
        assert_eq!(graph.num_nodes(), lists.len() as u64);
        assert_eq!(
            graph.num_arcs(),
            lists.iter().map(|l| l.len() as u64).sum::<u64>()
        );

        let mut iter = graph.node_iterator(0).unwrap();
        let mut seen = Vec::new();
        while iter.has_next() {
            let (node_id, succ) = iter.next().unwrap();
            assert_eq!(node_id, seen.len() as u64);
            seen.push(succ);
        }
        assert_eq!(&seen, lists);

        if mode == LoadMode::Random {
            for (node_id, expected) in lists.iter().enumerate() {
                assert_eq!(graph.outdegree(node_id as u64).unwrap(), expected.len() as u64);
                assert_eq!(&graph.successors(node_id as u64).unwrap(), expected);
            }
        }
    }
}

#[test]
fn scenario_a_tiny_round_trip() {
    let lists = vec![vec![1, 2], vec![2, 3], vec![3], vec![0, 1]];
    let flags = CompressionFlags {
        compression_window: 2,
        max_ref_count: 3,
        min_interval_length: 2,
        residuals: Code::Zeta { k: 3 },
        ..CompressionFlags::default()
    };
    let dir = TempDir::new().unwrap();
    let basename = store(&dir, "scenario_a", &lists, flags);
    assert_full_graph_matches(&basename, &lists);
}

#[test]
fn scenario_b_reference_block_residual() {
    let lists = vec![vec![1, 2, 4, 5, 7], vec![1, 2, 4, 5, 8], vec![0, 2, 5]];
    let flags = CompressionFlags {
        compression_window: 2,
        max_ref_count: 3,
        min_interval_length: 2,
        ..CompressionFlags::default()
    };
    let dir = TempDir::new().unwrap();
    let basename = store(&dir, "scenario_b", &lists, flags);
    assert_full_graph_matches(&basename, &lists);
}

#[test]
fn scenario_c_interval_extraction() {
    let lists = vec![vec![3, 4, 5, 6, 10, 11, 12, 20]];
    let flags = CompressionFlags {
        compression_window: 0,
        min_interval_length: 3,
        ..CompressionFlags::default()
    };
    let dir = TempDir::new().unwrap();
    let basename = store(&dir, "scenario_c", &lists, flags);
    assert_full_graph_matches(&basename, &lists);
}

#[test]
fn scenario_d_empty_list_interleave() {
    let lists = vec![vec![], vec![0, 2], vec![]];
    let flags = CompressionFlags {
        compression_window: 2,
        ..CompressionFlags::default()
    };
    let dir = TempDir::new().unwrap();
    let basename = store(&dir, "scenario_d", &lists, flags);
    let graph = BVGraph::load(&basename, LoadMode::Random).unwrap();
    assert_eq!(graph.outdegree(0).unwrap(), 0);
    assert_eq!(graph.outdegree(2).unwrap(), 0);
    assert_eq!(graph.num_arcs(), 2);
    assert_full_graph_matches(&basename, &lists);
}

#[test]
fn node_iterator_from_nonzero_requires_random_offsets() {
    let lists = vec![vec![1], vec![0], vec![]];
    let dir = TempDir::new().unwrap();
    let basename = store(&dir, "seq_from", &lists, CompressionFlags::default());

    let sequential = BVGraph::load(&basename, LoadMode::Sequential).unwrap();
    assert!(sequential.node_iterator(1).is_err());

    let random = BVGraph::load(&basename, LoadMode::Random).unwrap();
    let mut iter = random.node_iterator(1).unwrap();
    let (node_id, succ) = iter.next().unwrap();
    assert_eq!(node_id, 1);
    assert_eq!(succ, vec![0]);
}

#[test]
fn rejects_unsorted_or_self_looping_input_before_touching_disk() {
    let dir = TempDir::new().unwrap();
    let basename = dir.path().join("bad").to_string_lossy().to_string();
    let err = BVGraph::store_from(
        &basename,
        2,
        "webgraph.testgraph",
        CompressionFlags::default(),
        vec![vec![1, 0], vec![]],
    )
    .unwrap_err();
    assert!(matches!(err, webgraph::Error::InvalidInput { .. }));
}

#[cfg_attr(feature = "slow_tests", test)]
#[cfg_attr(not(feature = "slow_tests"), allow(dead_code))]
fn randomized_round_trip_across_parameter_grid() {
    let mut rng = SmallRng::seed_from_u64(0xB00D_1E);
    for compression_window in [0usize, 1, 3, 7] {
        for min_interval_length in [0usize, 2, 4] {
            for residuals in [Code::Gamma, Code::Delta, Code::Zeta { k: 2 }, Code::Zeta { k: 3 }] {
                let num_nodes = 40u64;
                let mut lists = Vec::with_capacity(num_nodes as usize);
                for node in 0..num_nodes {
                    let degree = rng.gen_range(0..6);
                    let mut succ: Vec<u64> = (0..degree)
                        .map(|_| rng.gen_range(0..num_nodes))
                        .filter(|&v| v != node)
                        .collect();
                    succ.sort_unstable();
                    succ.dedup();
                    lists.push(succ);
                }

                let flags = CompressionFlags {
                    compression_window,
                    max_ref_count: 3,
                    min_interval_length,
                    residuals,
                    ..CompressionFlags::default()
                };
                let dir = TempDir::new().unwrap();
                let basename = store(&dir, "grid", &lists, flags);
                assert_full_graph_matches(&basename, &lists);
            }
        }
    }
}
