use crate::model::config::ModelConfig;
use crate::model::markov_model::Model;
use crate::model::node::NodeId;
use crate::model::tree::Tree;
use proptest::prelude::*;
use std::collections::HashMap;

/// Small alphabet so that paths repeat and counts grow.
fn tokens() -> impl Strategy<Value = Vec<&'static str>> {
	prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "d", "."]), 0..40)
}

fn model(n_factor: usize, use_smoothing: bool) -> Model {
	Model::new(ModelConfig { n_factor, use_smoothing, ..Default::default() }).unwrap()
}

/// Every node as (path from root, count).
fn counts_by_path(tree: &Tree) -> HashMap<Vec<String>, u32> {
	(1..tree.len())
		.map(NodeId)
		.map(|id| {
			let path = tree.path_from_root(id).into_iter().map(str::to_owned).collect();
			(path, tree.node(id).count())
		})
		.collect()
}

proptest! {
	/// Property 1: Probabilities of the children of any node sum to 1.
	#[test]
	fn prop_sibling_probabilities_sum_to_one(input in tokens(), n_factor in 2usize..5, smoothing: bool) {
		let mut m = model(n_factor, smoothing);
		m.load_tokens(&input, 1, true);

		let tree = m.tree();
		for index in 0..tree.len() {
			let id = NodeId(index);
			if tree.node(id).is_leaf() {
				continue;
			}
			let sum: f32 = tree.children(id).map(|c| tree.probability(c)).sum();
			prop_assert!((sum - 1.0).abs() < 1e-5, "sum {} below node #{}", sum, index);
		}
	}

	/// Property 2: Counts are positive and never decrease as more data arrives.
	#[test]
	fn prop_counts_positive_and_monotonic(first in tokens(), second in tokens(), n_factor in 2usize..5) {
		let mut m = model(n_factor, false);
		m.load_tokens(&first, 1, true);
		let before = counts_by_path(m.tree());

		m.load_tokens(&second, 1, true);
		let after = counts_by_path(m.tree());

		prop_assert!(after.values().all(|c| *c >= 1));
		for (path, count) in &before {
			prop_assert!(after[path] >= *count, "{:?} went from {} to {}", path, count, after[path]);
		}
		prop_assert!(m.check_invariants().is_ok());
	}

	/// Property 3: A multiplier of k is the same as loading k times.
	#[test]
	fn prop_multiplier_equals_repeated_loads(input in tokens(), k in 1usize..4, n_factor in 2usize..4) {
		let mut multiplied = model(n_factor, false);
		multiplied.load_tokens(&input, k, true);

		let mut repeated = model(n_factor, false);
		for _ in 0..k {
			repeated.load_tokens(&input, 1, true);
		}

		prop_assert_eq!(multiplied.as_tree(true), repeated.as_tree(true));
	}

	/// Property 4: The sorted dump does not change the model.
	#[test]
	fn prop_sorted_dump_is_idempotent(input in tokens(), n_factor in 2usize..5) {
		let mut m = model(n_factor, false);
		m.load_tokens(&input, 1, true);
		let first = m.as_tree(true);
		prop_assert_eq!(&first, &m.as_tree(true));
		prop_assert_eq!(m.as_tree(false).len(), first.len());
	}

	/// Property 5: Merging two models equals loading their data in sequence.
	#[test]
	fn prop_merge_equals_sequential_loads(first in tokens(), second in tokens(), n_factor in 2usize..5, smoothing: bool) {
		let mut sequential = model(n_factor, smoothing);
		sequential.load_tokens(&first, 1, true);
		sequential.load_tokens(&second, 1, true);

		let mut left = model(n_factor, smoothing);
		left.load_tokens(&first, 1, true);
		let mut right = model(n_factor, smoothing);
		right.load_tokens(&second, 1, true);
		left.merge(&right).unwrap();

		prop_assert_eq!(left.as_tree(true), sequential.as_tree(true));
		prop_assert_eq!(left.word_count(), sequential.word_count());
		prop_assert!(left.check_invariants().is_ok());
	}
}
