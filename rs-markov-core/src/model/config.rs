use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default full-match pattern for a token that may open a sentence:
/// an optional double quote, one capital, then lowercase letters or
/// in-word punctuation.
pub const DEFAULT_SENTENCE_START: &str = r#""?[A-Z][a-z"',;`-]*"#;

/// Settings of a [`Model`](super::markov_model::Model).
///
/// `ModelConfig` groups both the **tree policy** (fixed once data is
/// loaded: `n_factor`, `ignore_case`, `use_smoothing`, `allow_duplicates`)
/// and the **generation parameters** (sentence bounds, budgets), which can be
/// changed at any time through the model's setters.
///
/// # Invariants (checked by [`ModelConfig::validate`])
/// - `n_factor >= 2`
/// - `1 <= min_sentence_length <= max_sentence_length`
/// - `sentence_start_pattern` compiles
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
	/// Context window size; lookups use at most `n_factor - 1` tokens of history.
	pub n_factor: usize,

	/// Case-fold child keys. Fixed for the lifetime of the tree.
	pub ignore_case: bool,

	/// Create nodes with a count of 2 instead of 1 (add-one smoothing).
	pub use_smoothing: bool,

	/// Accept generated sentences that also appear in the training data.
	pub allow_duplicates: bool,

	/// Recognize sentences in the input and anchor generation on sentence starts.
	pub recognize_sentences: bool,

	/// Strip quotation marks while cleaning training sentences.
	pub remove_quotations: bool,

	/// Join generated tokens with spaces.
	pub add_spaces: bool,

	/// Minimum number of tokens in a generated sentence.
	pub min_sentence_length: usize,

	/// Maximum number of tokens in a generated sentence.
	pub max_sentence_length: usize,

	/// Step budget for sentence generation.
	pub max_generation_attempts: usize,

	/// Restart budget for token generation.
	pub max_token_tries: usize,

	/// Consecutive duplicate rejections after which duplicates are let through.
	pub max_duplicates_to_skip: usize,

	/// Full-match pattern a sentence's first token must satisfy.
	pub sentence_start_pattern: String,

	/// Log every training sentence skipped for a bad start.
	pub log_skipped_sentences: bool,

	/// Optional wall-clock limit for one generation call.
	pub generation_timeout: Option<Duration>,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			n_factor: 3,
			ignore_case: false,
			use_smoothing: false,
			allow_duplicates: true,
			recognize_sentences: true,
			remove_quotations: true,
			add_spaces: true,
			min_sentence_length: 6,
			max_sentence_length: 35,
			max_generation_attempts: 1000,
			max_token_tries: 100,
			max_duplicates_to_skip: 10_000,
			sentence_start_pattern: DEFAULT_SENTENCE_START.to_owned(),
			log_skipped_sentences: false,
			generation_timeout: None,
		}
	}
}

impl ModelConfig {
	/// Default settings with the given context window.
	pub fn with_n_factor(n_factor: usize) -> Self {
		Self { n_factor, ..Self::default() }
	}

	/// Checks every invariant.
	///
	/// # Errors
	/// Returns the first [`ConfigError`] found.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.n_factor < 2 {
			return Err(ConfigError::InvalidNFactor(self.n_factor));
		}
		check_sentence_bounds(self.min_sentence_length, self.max_sentence_length)?;
		self.compile_sentence_start()?;
		Ok(())
	}

	/// Compiles `sentence_start_pattern` anchored at both ends.
	pub(crate) fn compile_sentence_start(&self) -> Result<Regex, ConfigError> {
		Ok(Regex::new(&format!("^(?:{})$", self.sentence_start_pattern))?)
	}
}

pub(crate) fn check_sentence_bounds(min: usize, max: usize) -> Result<(), ConfigError> {
	if min == 0 || min > max {
		return Err(ConfigError::InvalidSentenceLength { min, max });
	}
	Ok(())
}
