use std::collections::HashMap;

use super::markov_model::Model;
use super::node::NodeId;
use super::tree::Tree;
use crate::error::ConfigError;

/// Read-only lookups over the trained tree.
///
/// Misses are not errors: unknown tokens give a probability of 0, and
/// unresolved paths give empty results or `None`.
impl Model {
	/// Unigram probability of `token` (0 if unknown).
	pub fn get_probability(&self, token: &str) -> f32 {
		self.tree
			.lookup(Tree::ROOT, token)
			.map_or(0.0, |id| self.tree.probability(id))
	}

	/// Probability of the last token of `tokens` following the ones before it.
	///
	/// Sequences longer than `n_factor` are cut to their last `n_factor`
	/// tokens. Returns 0 for an empty sequence or any missing link.
	pub fn get_sequence_probability<S: AsRef<str>>(&self, tokens: &[S]) -> f32 {
		if tokens.is_empty() {
			return 0.0;
		}
		let start = tokens.len().saturating_sub(self.config.n_factor);
		self.tree
			.resolve(Tree::ROOT, &tokens[start..])
			.map_or(0.0, |id| self.tree.probability(id))
	}

	/// Node reached by the last `n_factor - 1` tokens of `seed`.
	fn context_node<S: AsRef<str>>(&self, seed: &[S]) -> Option<NodeId> {
		let start = seed.len().saturating_sub(self.config.n_factor - 1);
		self.tree.resolve(Tree::ROOT, &seed[start..])
	}

	fn ranked_tokens(&self, parent: NodeId, keep: impl Fn(NodeId) -> bool) -> Vec<String> {
		self.tree
			.sorted_children(parent)
			.into_iter()
			.filter(|id| keep(*id))
			.filter_map(|id| self.tree.node(id).token().map(str::to_owned))
			.collect()
	}

	/// Every token seen after `seed`, most frequent first.
	///
	/// Only the last `n_factor - 1` tokens of the seed are used.
	/// Returns an empty list for an empty seed or an unknown context.
	pub fn get_completions<S: AsRef<str>>(&self, seed: &[S]) -> Vec<String> {
		if seed.is_empty() {
			return Vec::new();
		}
		match self.context_node(seed) {
			Some(node) => self.ranked_tokens(node, |_| true),
			None => Vec::new(),
		}
	}

	/// Tokens `w` such that `pre + [w] + post` occurs in the model, most
	/// frequent first. An empty `pre` starts from the root.
	///
	/// For example with `n_factor = 3`, `(["the"], ["ball"])` returns the
	/// words seen between "the" and "ball".
	///
	/// # Errors
	/// [`ConfigError::InvalidContext`] unless `pre.len() < n_factor` and
	/// `pre.len() + post.len() < n_factor`.
	pub fn get_completions_between<S, T>(&self, pre: &[S], post: &[T]) -> Result<Vec<String>, ConfigError>
	where
		S: AsRef<str>,
		T: AsRef<str>,
	{
		let n_factor = self.config.n_factor;
		if pre.len() >= n_factor || pre.len() + post.len() >= n_factor {
			return Err(ConfigError::InvalidContext { pre: pre.len(), post: post.len(), n_factor });
		}

		let Some(node) = self.tree.resolve(Tree::ROOT, pre) else {
			return Ok(Vec::new());
		};
		Ok(self.ranked_tokens(node, |child| self.tree.resolve(child, post).is_some()))
	}

	/// Distribution of the tokens following `path`.
	///
	/// An empty path gives the unigram distribution. The values sum to 1.
	///
	/// Returns `None` if `path.len() >= n_factor`, if the path is unknown or
	/// if nothing follows it.
	pub fn get_probabilities<S: AsRef<str>>(&self, path: &[S]) -> Option<HashMap<String, f32>> {
		if path.len() >= self.config.n_factor {
			return None;
		}
		let node = self.tree.resolve(Tree::ROOT, path)?;
		if self.tree.node(node).is_leaf() {
			return None;
		}
		Some(
			self.tree
				.children(node)
				.filter_map(|id| {
					let token = self.tree.node(id).token()?;
					Some((token.to_owned(), self.tree.probability(id)))
				})
				.collect(),
		)
	}
}

#[cfg(test)]
mod tests {
	use crate::error::ConfigError;
	use crate::model::config::ModelConfig;
	use crate::model::markov_model::Model;

	fn trained(n_factor: usize, text: &str) -> Model {
		let mut model = Model::new(ModelConfig::with_n_factor(n_factor)).unwrap();
		let tokens: Vec<&str> = text.split_whitespace().collect();
		model.load_tokens(&tokens, 1, true);
		model
	}

	#[test]
	fn unknown_tokens_have_zero_probability() {
		let model = trained(2, "a b a");
		assert_eq!(model.get_probability("z"), 0.0);
		assert_eq!(model.get_sequence_probability(&["a", "z"]), 0.0);
		assert_eq!(model.get_sequence_probability::<&str>(&[]), 0.0);
	}

	#[test]
	fn empty_model_queries_miss() {
		let model = Model::new(ModelConfig::with_n_factor(3)).unwrap();
		assert_eq!(model.get_probability("a"), 0.0);
		assert_eq!(model.get_sequence_probability(&["a", "b"]), 0.0);
		assert!(model.get_completions(&["a"]).is_empty());
		assert!(model.get_completions_between::<&str, &str>(&[], &["a"]).unwrap().is_empty());
		assert!(model.get_probabilities::<&str>(&[]).is_none());
	}

	#[test]
	fn long_sequences_use_the_last_window() {
		let model = trained(2, "a b c a b d");
		// Only ["b", "d"] counts
		assert!((model.get_sequence_probability(&["x", "y", "b", "d"]) - 0.5).abs() < 1e-6);
	}

	#[test]
	fn completions_are_ranked() {
		let model = trained(3, "the red ball the red ball the big ball the red cup");
		assert_eq!(model.get_completions(&["the"]), vec!["red", "big"]);
		assert_eq!(model.get_completions(&["x", "the", "red"]), vec!["ball", "cup"]);
		assert!(model.get_completions(&["unknown"]).is_empty());
		assert!(model.get_completions::<&str>(&[]).is_empty());
	}

	#[test]
	fn completions_between_filter_on_post() {
		let model = trained(3, "the red ball the big ball the red cup the old hat");
		assert_eq!(model.get_completions_between(&["the"], &["ball"]).unwrap(), vec!["red", "big"]);
		assert_eq!(model.get_completions_between(&["the"], &["hat"]).unwrap(), vec!["old"]);
		assert!(model.get_completions_between(&["nope"], &["ball"]).unwrap().is_empty());

		let roots = model.get_completions_between::<&str, &str>(&[], &["red"]).unwrap();
		assert_eq!(roots, vec!["the"]);
	}

	#[test]
	fn completions_between_rejects_wide_contexts() {
		let model = trained(3, "a b c");
		assert_eq!(
			model.get_completions_between(&["a", "b"], &["c"]),
			Err(ConfigError::InvalidContext { pre: 2, post: 1, n_factor: 3 })
		);
		assert!(model.get_completions_between(&["a", "b", "c"], &[] as &[&str]).is_err());
	}

	#[test]
	fn probabilities_sum_to_one() {
		let model = trained(3, "a b a c a b");
		let probs = model.get_probabilities(&["a"]).unwrap();
		assert_eq!(probs.len(), 2);
		let sum: f32 = probs.values().sum();
		assert!((sum - 1.0).abs() < 1e-6);
		assert!((probs["b"] - 2.0 / 3.0).abs() < 1e-6);

		let unigrams = model.get_probabilities::<&str>(&[]).unwrap();
		assert!((unigrams.values().sum::<f32>() - 1.0).abs() < 1e-6);
	}

	#[test]
	fn probabilities_reject_long_or_unknown_paths() {
		let model = trained(3, "a b a c a b");
		assert!(model.get_probabilities(&["a", "b", "a"]).is_none());
		assert!(model.get_probabilities(&["q"]).is_none());
		assert!(model.get_probabilities(&["c", "a"]).is_some());

		// The last token of the data has no follower
		let model = trained(3, "x y");
		assert!(model.get_probabilities(&["y"]).is_none());
	}
}
