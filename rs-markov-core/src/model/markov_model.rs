use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::config::{check_sentence_bounds, ModelConfig};
use super::tree::Tree;
use crate::error::{ConfigError, Error};
use crate::tokenizer::{RegexTokenizer, Tokenizer};

/// A word-level n-gram ("Markov chain") model.
///
/// The `Model` owns the prefix tree and everything learned alongside it.
/// Training (see the `trainer` module) is the only thing that mutates the
/// tree; queries and [`Generator`](super::generator::Generator)s borrow the
/// model immutably, so the borrow checker enforces the single-writer rule:
/// training must be finished before anyone generates from the model.
///
/// # Responsibilities
/// - Own the tree and its policy (`n_factor`, case, smoothing, duplicates)
/// - Keep the bookkeeping filled during training: sentence starts, seen
///   sentences and the word count
/// - Refuse policy changes once data has been loaded
/// - Merge with another model of the same policy
///
/// # Invariants
/// - `config` is always valid
/// - `tree.is_ignoring_case() == config.ignore_case`
/// - `sentence_start` is the compiled form of `config.sentence_start_pattern`
#[derive(Clone, Debug)]
pub struct Model {
	pub(crate) config: ModelConfig,
	pub(crate) tree: Tree,
	/// Tokens that opened a training sentence at the root, in training order
	/// (repeated tokens stay repeated, so picking uniformly is frequency-weighted).
	pub(crate) sentence_starts: Vec<String>,
	/// Training sentences as the generator would print them (see
	/// [`Model::duplicate_key`]), filled only when duplicates are not allowed.
	pub(crate) seen_sentences: HashSet<String>,
	pub(crate) word_count: usize,
	pub(crate) sentence_start: Regex,
	pub(crate) tokenizer: Arc<dyn Tokenizer>,
}

/// Serializable state of a [`Model`].
///
/// The core does not pick a storage format: encode the snapshot with any
/// serde format and rebuild the model with [`Model::from_snapshot`].
/// The tokenizer is not part of the snapshot.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelSnapshot {
	config: ModelConfig,
	tree: Tree,
	sentence_starts: Vec<String>,
	seen_sentences: HashSet<String>,
	word_count: usize,
}

impl ModelSnapshot {
	pub fn config(&self) -> &ModelConfig {
		&self.config
	}
}

impl Model {
	/// Creates an empty model using the default [`RegexTokenizer`].
	///
	/// # Errors
	/// Returns an error if the configuration is invalid (see [`ModelConfig::validate`]).
	pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
		Self::with_tokenizer(config, RegexTokenizer::default())
	}

	/// Creates an empty model with a custom tokenizer.
	pub fn with_tokenizer<T>(config: ModelConfig, tokenizer: T) -> Result<Self, ConfigError>
	where
		T: Tokenizer + 'static,
	{
		config.validate()?;
		let sentence_start = config.compile_sentence_start()?;
		Ok(Self {
			tree: Tree::new(config.ignore_case),
			config,
			sentence_starts: Vec::new(),
			seen_sentences: HashSet::new(),
			word_count: 0,
			sentence_start,
			tokenizer: Arc::new(tokenizer),
		})
	}

	pub fn config(&self) -> &ModelConfig {
		&self.config
	}

	pub fn n_factor(&self) -> usize {
		self.config.n_factor
	}

	pub fn is_ignoring_case(&self) -> bool {
		self.config.ignore_case
	}

	pub fn is_smoothing(&self) -> bool {
		self.config.use_smoothing
	}

	pub fn is_allowing_duplicates(&self) -> bool {
		self.config.allow_duplicates
	}

	pub fn is_recognizing_sentences(&self) -> bool {
		self.config.recognize_sentences
	}

	/// Read access to the prefix tree, for manual navigation.
	pub fn tree(&self) -> &Tree {
		&self.tree
	}

	/// Number of tokens trained on.
	pub fn word_count(&self) -> usize {
		self.word_count
	}

	/// Recorded sentence-opening tokens, in training order.
	pub fn sentence_starts(&self) -> &[String] {
		&self.sentence_starts
	}

	/// Number of tree nodes, root excluded.
	pub fn node_count(&self) -> usize {
		self.tree.len() - 1
	}

	/// True until some data has been loaded.
	pub fn is_empty(&self) -> bool {
		self.tree.is_empty()
	}

	/// True if `token` occurs in the training data.
	pub fn contains(&self, token: &str) -> bool {
		self.tree.lookup(self.tree.root(), token).is_some()
	}

	pub fn tokenizer(&self) -> &dyn Tokenizer {
		self.tokenizer.as_ref()
	}

	/// Replaces the tokenizer used by subsequent loads.
	pub fn set_tokenizer<T>(&mut self, tokenizer: T)
	where
		T: Tokenizer + 'static,
	{
		self.tokenizer = Arc::new(tokenizer);
	}

	/// Form under which a finished sentence is compared for duplicates:
	/// lower-cased when the model ignores case, unchanged otherwise.
	pub(crate) fn duplicate_key(&self, sentence: &str) -> String {
		if self.config.ignore_case {
			sentence.to_lowercase()
		} else {
			sentence.to_owned()
		}
	}

	fn ensure_empty(&self, setting: &'static str) -> Result<(), ConfigError> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(ConfigError::ModelNotEmpty { setting })
		}
	}

	/// Sets whether generated sentences may repeat training sentences.
	///
	/// # Errors
	/// Returns [`ConfigError::ModelNotEmpty`] when the value changes after
	/// data was loaded; seen sentences are only recorded while training.
	pub fn set_allow_duplicates(&mut self, allow: bool) -> Result<(), ConfigError> {
		if allow != self.config.allow_duplicates {
			self.ensure_empty("allow_duplicates")?;
		}
		self.config.allow_duplicates = allow;
		Ok(())
	}

	/// Enables or disables add-one smoothing.
	///
	/// # Errors
	/// Returns [`ConfigError::ModelNotEmpty`] when the value changes after
	/// data was loaded.
	pub fn set_use_smoothing(&mut self, use_smoothing: bool) -> Result<(), ConfigError> {
		if use_smoothing != self.config.use_smoothing {
			self.ensure_empty("use_smoothing")?;
		}
		self.config.use_smoothing = use_smoothing;
		Ok(())
	}

	/// Sets the inclusive bounds on the number of tokens per generated sentence.
	pub fn set_sentence_length_bounds(&mut self, min: usize, max: usize) -> Result<(), ConfigError> {
		check_sentence_bounds(min, max)?;
		self.config.min_sentence_length = min;
		self.config.max_sentence_length = max;
		Ok(())
	}

	pub fn set_recognize_sentences(&mut self, recognize: bool) {
		self.config.recognize_sentences = recognize;
	}

	pub fn set_remove_quotations(&mut self, remove: bool) {
		self.config.remove_quotations = remove;
	}

	pub fn set_log_skipped_sentences(&mut self, log_skipped: bool) {
		self.config.log_skipped_sentences = log_skipped;
	}

	pub fn set_add_spaces(&mut self, add_spaces: bool) {
		self.config.add_spaces = add_spaces;
	}

	pub fn set_max_generation_attempts(&mut self, attempts: usize) {
		self.config.max_generation_attempts = attempts;
	}

	pub fn set_max_duplicates_to_skip(&mut self, max: usize) {
		self.config.max_duplicates_to_skip = max;
	}

	pub fn set_generation_timeout(&mut self, timeout: Option<Duration>) {
		self.config.generation_timeout = timeout;
	}

	/// Indented dump of the tree (see [`Tree::as_tree`]).
	pub fn as_tree(&self, sort: bool) -> String {
		self.tree.as_tree(sort)
	}

	/// Drops everything learned so far. The configuration is kept, and
	/// policy setters are allowed again.
	pub fn reset(&mut self) {
		self.tree = Tree::new(self.config.ignore_case);
		self.sentence_starts.clear();
		self.seen_sentences.clear();
		self.word_count = 0;
	}

	/// Merges another model into this one.
	///
	/// # Behavior
	/// - Counts of matching paths are summed; missing paths are copied
	/// - Sentence-start flags are combined, sentence starts are appended
	///   and seen sentences are united
	///
	/// Merging models trained on separate batches of sentences gives the
	/// same tree as loading those batches one after the other.
	///
	/// # Errors
	/// Returns [`ConfigError::IncompatibleModels`] if `n_factor`, case or
	/// smoothing policies differ.
	pub fn merge(&mut self, other: &Self) -> Result<(), ConfigError> {
		let (mine, theirs) = (&self.config, &other.config);
		if mine.n_factor != theirs.n_factor {
			return Err(ConfigError::IncompatibleModels(format!(
				"n_factor mismatch: self={}, other={}",
				mine.n_factor, theirs.n_factor
			)));
		}
		if mine.ignore_case != theirs.ignore_case || mine.use_smoothing != theirs.use_smoothing {
			return Err(ConfigError::IncompatibleModels(
				"ignore_case and use_smoothing must match".to_owned(),
			));
		}

		self.tree.merge_from(&other.tree, self.config.use_smoothing);
		self.sentence_starts.extend(other.sentence_starts.iter().cloned());
		self.seen_sentences.extend(other.seen_sentences.iter().cloned());
		self.word_count += other.word_count;
		Ok(())
	}

	/// Captures the learned state and configuration.
	pub fn snapshot(&self) -> ModelSnapshot {
		ModelSnapshot {
			config: self.config.clone(),
			tree: self.tree.clone(),
			sentence_starts: self.sentence_starts.clone(),
			seen_sentences: self.seen_sentences.clone(),
			word_count: self.word_count,
		}
	}

	/// Rebuilds a model from a snapshot, with the default tokenizer.
	///
	/// # Errors
	/// - [`Error::Config`] if the stored configuration is invalid
	/// - [`Error::Internal`] if the stored tree is inconsistent
	pub fn from_snapshot(snapshot: ModelSnapshot) -> Result<Self, Error> {
		let mut model = Self::new(snapshot.config)?;
		model.tree = snapshot.tree;
		model.sentence_starts = snapshot.sentence_starts;
		model.seen_sentences = snapshot.seen_sentences;
		model.word_count = snapshot.word_count;
		model.check_invariants()?;
		Ok(model)
	}

	/// Verifies the tree invariants: positive counts, consistent parent links
	/// and keys that follow the case policy.
	///
	/// # Errors
	/// Returns [`Error::Internal`] describing the first violation.
	pub fn check_invariants(&self) -> Result<(), Error> {
		if self.tree.is_ignoring_case() != self.config.ignore_case {
			return Err(Error::Internal("tree case policy differs from the configuration".to_owned()));
		}
		self.tree.check().map_err(Error::Internal)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(s: &str) -> Vec<String> {
		s.split_whitespace().map(str::to_owned).collect()
	}

	#[test]
	fn new_validates_config() {
		assert!(Model::new(ModelConfig::with_n_factor(1)).is_err());
		let model = Model::new(ModelConfig::default()).unwrap();
		assert!(model.is_empty());
		assert_eq!(model.node_count(), 0);
		assert_eq!(model.n_factor(), 3);
	}

	#[test]
	fn policy_is_frozen_after_loading() {
		let mut model = Model::new(ModelConfig::with_n_factor(2)).unwrap();
		model.set_use_smoothing(true).unwrap();
		model.set_allow_duplicates(false).unwrap();
		model.load_tokens(&tokens("a b c"), 1, true);

		assert_eq!(
			model.set_use_smoothing(false),
			Err(ConfigError::ModelNotEmpty { setting: "use_smoothing" })
		);
		assert_eq!(
			model.set_allow_duplicates(true),
			Err(ConfigError::ModelNotEmpty { setting: "allow_duplicates" })
		);
		// Re-stating the current value is harmless
		assert!(model.set_use_smoothing(true).is_ok());

		model.reset();
		assert!(model.is_empty());
		assert!(model.set_use_smoothing(false).is_ok());
	}

	#[test]
	fn sentence_bounds_setter_validates() {
		let mut model = Model::new(ModelConfig::default()).unwrap();
		assert!(model.set_sentence_length_bounds(3, 2).is_err());
		assert!(model.set_sentence_length_bounds(2, 3).is_ok());
		assert_eq!(model.config().min_sentence_length, 2);
	}

	#[test]
	fn merge_rejects_other_policies() {
		let mut a = Model::new(ModelConfig::with_n_factor(2)).unwrap();
		let b = Model::new(ModelConfig::with_n_factor(3)).unwrap();
		assert!(matches!(a.merge(&b), Err(ConfigError::IncompatibleModels(_))));

		let c = Model::new(ModelConfig { n_factor: 2, ignore_case: true, ..Default::default() }).unwrap();
		assert!(matches!(a.merge(&c), Err(ConfigError::IncompatibleModels(_))));
	}

	#[test]
	fn merge_with_smoothing_matches_sequential_loading() {
		let config = ModelConfig { n_factor: 2, use_smoothing: true, ..Default::default() };
		let mut sequential = Model::new(config.clone()).unwrap();
		sequential.load_tokens(&tokens("a b a"), 1, true);
		sequential.load_tokens(&tokens("b a c"), 1, true);

		let mut left = Model::new(config.clone()).unwrap();
		left.load_tokens(&tokens("a b a"), 1, true);
		let mut right = Model::new(config).unwrap();
		right.load_tokens(&tokens("b a c"), 1, true);
		left.merge(&right).unwrap();

		assert_eq!(left.as_tree(true), sequential.as_tree(true));
		assert_eq!(left.word_count(), sequential.word_count());
	}

	#[test]
	fn snapshot_round_trip_keeps_tree() {
		let mut model = Model::new(ModelConfig::with_n_factor(3)).unwrap();
		model.load_sentences(&["The cat sat on the mat.", "The dog slept."], 1);

		let bytes = postcard::to_stdvec(&model.snapshot()).unwrap();
		let snapshot: ModelSnapshot = postcard::from_bytes(&bytes).unwrap();
		let restored = Model::from_snapshot(snapshot).unwrap();

		assert_eq!(restored.as_tree(true), model.as_tree(true));
		assert_eq!(restored.sentence_starts(), model.sentence_starts());
		assert_eq!(restored.word_count(), model.word_count());
	}

	#[test]
	fn contains_follows_case_policy() {
		let mut model = Model::new(ModelConfig { n_factor: 2, ignore_case: true, ..Default::default() }).unwrap();
		model.load_tokens(&tokens("Dog cat"), 1, true);
		assert!(model.contains("dog"));
		assert!(model.contains("DOG"));
		assert!(!model.contains("bird"));
		assert!(model.check_invariants().is_ok());
	}
}
