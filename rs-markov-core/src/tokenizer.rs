//! Tokenization and sentence splitting.
//!
//! The model only talks to the [`Tokenizer`] trait, so any implementation
//! can be plugged into a [`Model`](crate::model::markov_model::Model).
//! [`RegexTokenizer`] is the default one.

use std::fmt;

use regex::Regex;

use crate::error::ConfigError;
use crate::text::is_abbreviation;

/// Splits text into tokens and sentences.
pub trait Tokenizer: fmt::Debug + Send + Sync {
	/// Splits `text` into tokens.
	fn tokenize(&self, text: &str) -> Vec<String>;

	/// Splits `text` into sentences.
	fn split_sentences(&self, text: &str) -> Vec<String>;
}

/// Tokenizer whose tokens are the matches of a regular expression.
///
/// The default pattern keeps words together with their inner apostrophes
/// and hyphens (`don't`, `well-known`) and makes every other non-space
/// character a token of its own.
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
	pattern: Regex,
}

impl RegexTokenizer {
	pub const DEFAULT_PATTERN: &'static str = r"\w+(?:['\u{2019}-]\w+)*|[^\w\s]";

	/// Creates a tokenizer from a custom pattern.
	///
	/// # Errors
	/// Returns [`ConfigError::InvalidPattern`] if the pattern does not compile.
	pub fn new(pattern: &str) -> Result<Self, ConfigError> {
		Ok(Self { pattern: Regex::new(pattern)? })
	}

	pub fn pattern(&self) -> &str {
		self.pattern.as_str()
	}
}

impl Default for RegexTokenizer {
	fn default() -> Self {
		// The default pattern is a literal and always compiles
		Self { pattern: Regex::new(Self::DEFAULT_PATTERN).expect("default tokenizer pattern") }
	}
}

impl Tokenizer for RegexTokenizer {
	fn tokenize(&self, text: &str) -> Vec<String> {
		self.pattern
			.find_iter(text)
			.map(|m| m.as_str().to_owned())
			.collect()
	}

	fn split_sentences(&self, text: &str) -> Vec<String> {
		let words: Vec<&str> = text.split_whitespace().collect();
		let mut sentences = Vec::new();
		let mut current: Vec<&str> = Vec::new();

		for (i, word) in words.iter().enumerate() {
			current.push(word);
			let ends = match words.get(i + 1) {
				Some(next) => is_sentence_end(word, next),
				None => true,
			};
			if ends {
				sentences.push(current.join(" "));
				current.clear();
			}
		}
		sentences
	}
}

const OPENERS: &str = "`'\"([{<\u{201C}\u{2018}";
const CLOSERS: &str = "\"'}>)\u{201D}\u{2019}";

/// Decides whether `current` closes a sentence, given the word after it.
fn is_sentence_end(current: &str, next: &str) -> bool {
	if is_abbreviation(current) {
		return false;
	}
	let mut stripped = current.chars();
	if stripped.next().is_some_and(|c| OPENERS.contains(c)) && is_abbreviation(stripped.as_str()) {
		return false;
	}

	// The next word has to open a sentence: upper case, maybe after an opener
	let mut next_chars = next.chars();
	let starts_upper = match (next_chars.next(), next_chars.next()) {
		(Some(first), _) if first.is_uppercase() => true,
		(Some(first), Some(second)) => OPENERS.contains(first) && second.is_uppercase(),
		_ => false,
	};
	if !starts_upper {
		return false;
	}

	let chars: Vec<char> = current.chars().collect();
	let last = chars[chars.len() - 1];
	let before_last = chars.len().checked_sub(2).map(|i| chars[i]);

	if last == '?' || last == '!' {
		return true;
	}
	if before_last.is_some_and(|c| "?!.".contains(c)) && CLOSERS.contains(last) {
		return true;
	}
	if last != '.' {
		return false;
	}

	// Initials: "J." or "J.R."
	let is_initial = chars.len() == 2 && chars[0].is_uppercase();
	let is_double_initial = chars.len() == 4 && chars[1] == '.' && chars[0].is_uppercase() && chars[2].is_uppercase();
	!(is_initial || is_double_initial)
}
