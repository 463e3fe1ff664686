use std::collections::HashSet;
use std::time::Instant;

use log::{debug, warn};
use rand::Rng;
use rand::rngs::ThreadRng;
use rand::seq::IndexedRandom;

use super::config::check_sentence_bounds;
use super::markov_model::Model;
use super::node::{Node, NodeId};
use super::tree::Tree;
use crate::error::ConfigError;
use crate::text::{is_abbreviation, normalize_punctuation, starts_with_non_word};

/// Samples token sequences and sentences from a trained [`Model`].
///
/// A `Generator` borrows the model immutably and owns its random source,
/// so several generators can read one model while none can train it.
///
/// # Responsibilities
/// - Walk the tree by weighted child selection
/// - Recover from dead ends (trace back from the root, or restart)
/// - Validate sentences (length, first character, last word, duplicates)
/// - Give up gracefully when the attempt budget or the deadline runs out
///
/// # Notes
/// - Duplicate bookkeeping lives here: the number of consecutive duplicate
///   rejections and, once that reaches `max_duplicates_to_skip`, the switch
///   that lets duplicates through for the rest of the generator's life.
/// - When duplicates are not allowed, sentences this generator already
///   produced are rejected as well.
#[derive(Debug)]
pub struct Generator<'m, R: Rng> {
	model: &'m Model,
	rng: R,
	allow_duplicates: bool,
	skipped_duplicates: usize,
	emitted: HashSet<String>,
}

impl<'m> Generator<'m, ThreadRng> {
	/// Creates a generator backed by the thread-local RNG.
	pub fn new(model: &'m Model) -> Self {
		Self::with_rng(model, rand::rng())
	}
}

impl Model {
	/// Shortcut for [`Generator::new`].
	pub fn generator(&self) -> Generator<'_, ThreadRng> {
		Generator::new(self)
	}

	/// Shortcut for [`Generator::with_rng`].
	pub fn generator_with_rng<R: Rng>(&self, rng: R) -> Generator<'_, R> {
		Generator::with_rng(self, rng)
	}
}

impl<'m, R: Rng> Generator<'m, R> {
	/// Creates a generator with an explicit random source.
	///
	/// Use a seeded RNG (e.g. `StdRng::seed_from_u64`) for reproducible output.
	pub fn with_rng(model: &'m Model, rng: R) -> Self {
		Self {
			model,
			rng,
			allow_duplicates: model.config.allow_duplicates,
			skipped_duplicates: 0,
			emitted: HashSet::new(),
		}
	}

	pub fn model(&self) -> &'m Model {
		self.model
	}

	/// False until duplicates are allowed, either by the model or because
	/// the skip maximum was reached.
	pub fn is_allowing_duplicates(&self) -> bool {
		self.allow_duplicates
	}

	/// Consecutive duplicate rejections so far.
	pub fn skipped_duplicates(&self) -> usize {
		self.skipped_duplicates
	}

	fn token(&self, id: NodeId) -> &'m str {
		let model = self.model;
		model.tree.node(id).token().unwrap_or_default()
	}

	fn is_past(deadline: Option<Instant>) -> bool {
		deadline.is_some_and(|d| Instant::now() >= d)
	}

	fn deadline(&self) -> Option<Instant> {
		self.model.config.generation_timeout.map(|t| Instant::now() + t)
	}

	/// Entry node for a new walk.
	///
	/// With sentence recognition on, a uniform pick among the recorded
	/// sentence starts (so frequent starts come up more often). Otherwise a
	/// weighted pick among the root's children.
	fn select_start(&mut self) -> Option<NodeId> {
		let model = self.model;
		if model.config.recognize_sentences {
			let token = model.sentence_starts.choose(&mut self.rng)?;
			model.tree.lookup(Tree::ROOT, token)
		} else {
			model.tree.select_child(Tree::ROOT, &mut self.rng, true, None)
		}
	}

	/// Weighted pick among the children of `current`; at the root only
	/// sentence starts qualify when sentences are recognized.
	fn next_node(&mut self, current: NodeId) -> Option<NodeId> {
		let model = self.model;
		let only_starts: &dyn Fn(&Node) -> bool = &|node| node.is_sentence_start();
		let filter = (current == Tree::ROOT && model.config.recognize_sentences).then_some(only_starts);
		model.tree.select_child(current, &mut self.rng, true, filter)
	}

	/// Re-enters the tree one level higher: drops the first token of the
	/// path to `id` and resolves the rest from the root.
	fn trace_path_from_root(&self, id: NodeId) -> Option<NodeId> {
		let tree = &self.model.tree;
		let path = tree.path_from_root(id);
		tree.resolve(Tree::ROOT, path.get(1..).unwrap_or_default())
	}

	/// Generates up to `count` sentences, following the model across
	/// sentence boundaries.
	///
	/// # Behavior
	/// - The walk starts from a sentence start and keeps picking children
	/// - Reaching a node flagged as a sentence start closes the current
	///   sentence; it is kept if it has at least `min_sentence_length`
	///   tokens and passes validation
	/// - A sentence growing to `max_sentence_length` tokens is dropped
	/// - On a leaf the walk continues from the equivalent shorter context
	///
	/// # Returns
	/// A vector of length `count`. If `max_generation_attempts` steps pass
	/// without a new sentence, or the deadline is hit, a warning is logged
	/// and the missing entries are `None`.
	///
	/// # Errors
	/// - [`ConfigError::SentencesDisabled`] if sentence recognition is off
	/// - [`ConfigError::EmptyModel`] if nothing was loaded
	/// - [`ConfigError::NoSentenceStarts`] if no sentence start was recorded
	pub fn generate_sentences(&mut self, count: usize) -> Result<Vec<Option<String>>, ConfigError> {
		let model = self.model;
		let config = &model.config;
		if !config.recognize_sentences {
			return Err(ConfigError::SentencesDisabled);
		}
		if model.is_empty() {
			return Err(ConfigError::EmptyModel);
		}
		let Some(mut current) = self.select_start() else {
			return Err(ConfigError::NoSentenceStarts);
		};

		let deadline = self.deadline();
		let mut result: Vec<Option<String>> = Vec::with_capacity(count);
		let mut sentence: Vec<&'m str> = vec![self.token(current)];
		let mut tries = 0usize;
		let mut total_tries = 0usize;

		while result.len() < count {
			if sentence.len() >= config.max_sentence_length {
				sentence.clear();
			}

			if model.tree.node(current).is_leaf() {
				if let Some(traced) = self.trace_path_from_root(current) {
					current = traced;
					continue;
				}
			}

			let next = match self.next_node(current) {
				Some(next) => next,
				None => {
					debug!("Dead end after {:?}, restarting from a sentence start", sentence);
					current = self.select_start().ok_or(ConfigError::NoSentenceStarts)?;
					sentence.clear();
					sentence.push(self.token(current));
					tries += 1;
					if tries >= config.max_generation_attempts || Self::is_past(deadline) {
						break;
					}
					continue;
				}
			};

			if model.tree.node(next).is_sentence_start() {
				if sentence.len() >= config.min_sentence_length {
					let candidate = normalize_punctuation(&sentence.join(" "));
					if self.validate(&candidate) {
						if !self.allow_duplicates {
							self.emitted.insert(model.duplicate_key(&candidate));
						}
						result.push(Some(candidate));
						total_tries += tries;
						tries = 0;
					}
				}
				sentence.clear();
			}
			sentence.push(self.token(next));
			current = next;

			tries += 1;
			if tries >= config.max_generation_attempts || Self::is_past(deadline) {
				break;
			}
		}

		if result.len() < count {
			total_tries += tries;
			warn!(
				"Sentence generation gave up after {total_tries} tries with only {} of {count} sentences",
				result.len()
			);
			result.resize(count, None);
		}
		Ok(result)
	}

	/// Generates a single sentence; `None` if the budget ran out.
	pub fn generate_sentence(&mut self) -> Result<Option<String>, ConfigError> {
		Ok(self.generate_sentences(1)?.into_iter().next().flatten())
	}

	/// Checks a finished sentence.
	///
	/// Rejects sentences starting with a non-word character, ending with
	/// an abbreviation, or (when duplicates are not allowed) already seen in
	/// training or already generated.
	fn validate(&mut self, candidate: &str) -> bool {
		let model = self.model;
		let config = &model.config;
		let first = candidate.split(' ').next().unwrap_or_default();
		if starts_with_non_word(first) {
			if config.log_skipped_sentences {
				warn!("Rejected (bad first character): {candidate:?}");
			}
			return false;
		}
		let last = candidate.split(' ').next_back().unwrap_or_default();
		if is_abbreviation(last) {
			debug!("Rejected (ends with abbreviation {last:?}): {candidate:?}");
			return false;
		}

		if !self.allow_duplicates {
			let key = model.duplicate_key(candidate);
			if model.seen_sentences.contains(&key) || self.emitted.contains(&key) {
				self.skipped_duplicates += 1;
				debug!("Rejected (duplicate #{}): {candidate:?}", self.skipped_duplicates);
				if self.skipped_duplicates >= config.max_duplicates_to_skip {
					warn!(
						"Hit the skip maximum after {} duplicates, now allowing duplicates",
						self.skipped_duplicates
					);
					self.allow_duplicates = true;
				}
				return false;
			}
			self.skipped_duplicates = 0;
		}
		true
	}

	/// Weighted pick of the token after `tokens`, using at most the last
	/// `n_factor - 1` of them as context.
	fn next_token(&mut self, tokens: &[&str]) -> Option<NodeId> {
		let model = self.model;
		let start = tokens.len().saturating_sub(model.config.n_factor - 1);
		let context = model.tree.resolve(Tree::ROOT, &tokens[start..])?;
		model.tree.select_child(context, &mut self.rng, true, None)
	}

	fn join(&self, tokens: &[&str]) -> String {
		let separator = if self.model.config.add_spaces { " " } else { "" };
		tokens.join(separator)
	}

	/// Generates exactly `target` tokens when possible.
	///
	/// The walk starts from a weighted root pick and restarts from scratch on
	/// a dead end, at most `max_token_tries` times. When that budget runs
	/// out, a warning is logged and the longest attempt is returned.
	///
	/// Tokens are joined with spaces unless the model's `add_spaces` is off.
	///
	/// # Errors
	/// [`ConfigError::EmptyModel`] if nothing was loaded.
	pub fn generate_tokens(&mut self, target: usize) -> Result<String, ConfigError> {
		let model = self.model;
		if model.is_empty() {
			return Err(ConfigError::EmptyModel);
		}
		if target == 0 {
			return Ok(String::new());
		}

		let deadline = self.deadline();
		let mut best: Vec<&'m str> = Vec::new();
		let mut tries = 0;

		while tries < model.config.max_token_tries && !Self::is_past(deadline) {
			tries += 1;
			let Some(first) = model.tree.select_child(Tree::ROOT, &mut self.rng, true, None) else {
				continue;
			};
			let mut tokens = vec![self.token(first)];
			while tokens.len() < target {
				match self.next_token(&tokens) {
					Some(next) => tokens.push(self.token(next)),
					None => break,
				}
			}
			if tokens.len() > best.len() {
				best = tokens;
			}
			if best.len() >= target {
				return Ok(self.join(&best));
			}
			debug!("Dead end after {} of {target} tokens, restarting", best.len());
		}

		warn!(
			"Token generation gave up after {tries} tries with only {} of {target} tokens",
			best.len()
		);
		Ok(self.join(&best))
	}

	/// Generates tokens until the last one fully matches `pattern`, with a
	/// total length in `min_length..=max_length`.
	///
	/// A walk that hits a dead end or grows past `max_length` is restarted,
	/// at most `max_token_tries` times. When that budget runs out, a warning
	/// is logged and an empty string is returned.
	///
	/// # Errors
	/// - [`ConfigError::InvalidPattern`] if `pattern` does not compile
	/// - [`ConfigError::InvalidSentenceLength`] for bad length bounds
	/// - [`ConfigError::EmptyModel`] if nothing was loaded
	pub fn generate_tokens_until(
		&mut self,
		pattern: &str,
		min_length: usize,
		max_length: usize,
	) -> Result<String, ConfigError> {
		let model = self.model;
		let ender = regex::Regex::new(&format!("^(?:{pattern})$"))?;
		check_sentence_bounds(min_length, max_length)?;
		if model.is_empty() {
			return Err(ConfigError::EmptyModel);
		}

		let deadline = self.deadline();
		let mut tries = 0;
		'attempts: while tries < model.config.max_token_tries && !Self::is_past(deadline) {
			tries += 1;
			let Some(first) = model.tree.select_child(Tree::ROOT, &mut self.rng, true, None) else {
				continue;
			};
			let mut tokens = vec![self.token(first)];
			loop {
				let last = tokens[tokens.len() - 1];
				if tokens.len() >= min_length && ender.is_match(last) {
					return Ok(self.join(&tokens));
				}
				if tokens.len() >= max_length {
					debug!("No match for {pattern:?} within {max_length} tokens, restarting");
					continue 'attempts;
				}
				match self.next_token(&tokens) {
					Some(next) => tokens.push(self.token(next)),
					None => continue 'attempts,
				}
			}
		}

		warn!("Token generation for {pattern:?} gave up after {tries} tries");
		Ok(String::new())
	}
}
