//! Word-level n-gram ("Markov chain") text model.
//!
//! This crate provides:
//! - A frequency-weighted prefix tree over token sequences
//! - Training from token arrays, sentence arrays or raw text
//! - Probability and completion queries
//! - Sentence and token generation with bounded retries
//!
//! ```
//! use rs_markov_core::model::config::ModelConfig;
//! use rs_markov_core::model::markov_model::Model;
//!
//! let mut model = Model::new(ModelConfig::with_n_factor(2)).unwrap();
//! model.load_tokens(&["a", "b", "a", "b", "a"], 1, true);
//! assert!((model.get_probability("a") - 0.6).abs() < 1e-6);
//! assert_eq!(model.get_completions(&["a"]), vec!["b"]);
//! ```

/// Error types.
pub mod error;

/// Model, tree, training, queries and generation.
pub mod model;

/// Text cleanup helpers shared by training and generation.
pub mod text;

/// Tokenizer trait and the default regex tokenizer.
pub mod tokenizer;

pub use error::{ConfigError, Error};
pub use model::config::ModelConfig;
pub use model::generator::Generator;
pub use model::markov_model::{Model, ModelSnapshot};
pub use tokenizer::{RegexTokenizer, Tokenizer};

#[cfg(test)]
mod tests;
