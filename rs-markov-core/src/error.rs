use thiserror::Error;

/// Errors caused by invalid settings or by using the model in a state
/// that does not allow the requested operation.
///
/// These are always reported to the caller; lookup misses and exhausted
/// generation budgets are not errors and never produce one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
	/// The context window must hold at least one token of history.
	#[error("n_factor must be >= 2, got {0}")]
	InvalidNFactor(usize),

	/// Sentence length bounds must satisfy `1 <= min <= max`.
	#[error("invalid sentence length bounds: min={min}, max={max}")]
	InvalidSentenceLength { min: usize, max: usize },

	/// The sentence-start pattern does not compile.
	#[error("invalid sentence-start pattern: {0}")]
	InvalidPattern(String),

	/// A setting that shapes the tree was changed after data was loaded.
	#[error("`{setting}` must be set before any data is loaded into the model")]
	ModelNotEmpty { setting: &'static str },

	/// `pre` and `post` do not fit in the context window.
	#[error("invalid completion context: pre={pre}, post={post} (both must fit in n_factor={n_factor})")]
	InvalidContext { pre: usize, post: usize, n_factor: usize },

	/// The model holds no training data.
	#[error("the model has no training data")]
	EmptyModel,

	/// Sentence generation was requested with sentence recognition disabled.
	#[error("sentence generation requires sentence recognition to be enabled")]
	SentencesDisabled,

	/// Sentence recognition is on but no training sentence had a valid start.
	#[error("no sentence starts were recorded during training")]
	NoSentenceStarts,

	/// Two models with different tree policies cannot be merged.
	#[error("incompatible models: {0}")]
	IncompatibleModels(String),
}

impl From<regex::Error> for ConfigError {
	fn from(err: regex::Error) -> Self {
		ConfigError::InvalidPattern(err.to_string())
	}
}

/// Crate-level error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// A tree invariant does not hold. This is a bug, not bad input.
	#[error("internal invariant violated: {0}")]
	Internal(String),
}
