use std::sync::Arc;

use log::{debug, info, warn};

use super::markov_model::Model;
use super::tree::Tree;
use crate::text::{clean_sentence, normalize_punctuation};

/// Training: turns token or sentence streams into sliding windows of
/// `n_factor` tokens and records every window in the tree.
impl Model {
	fn initial_count(&self) -> u32 {
		if self.config.use_smoothing { 2 } else { 1 }
	}

	/// Inserts one window from the root.
	///
	/// Every `(token, opens_sentence)` pair descends one level. A token that
	/// opens a sentence flags its node, and is recorded as a sentence start
	/// when it sits directly below the root. An empty token ends the window.
	fn add_window<'a, I>(&mut self, window: I)
	where
		I: IntoIterator<Item = (&'a str, bool)>,
	{
		let initial_count = self.initial_count();
		let mut node = Tree::ROOT;
		for (token, opens_sentence) in window {
			if token.is_empty() {
				break;
			}
			let parent = node;
			node = self.tree.add_child(parent, token, initial_count);
			if opens_sentence {
				self.tree.set_sentence_start(node);
				if parent == Tree::ROOT {
					let first_seen = self.tree.node(node).token().unwrap_or(token);
					self.sentence_starts.push(first_seen.to_owned());
				}
			}
		}
	}

	/// Loads a token array.
	///
	/// For each index `i`, the window `tokens[i..i + n_factor]` (shorter at
	/// the end of the array) is inserted `multiplier` times. A multiplier of
	/// 3 gives the same tree as loading the array three times.
	///
	/// `add_spaces` becomes the model's joining policy for generated tokens.
	pub fn load_tokens<S: AsRef<str>>(&mut self, tokens: &[S], multiplier: usize, add_spaces: bool) {
		self.config.add_spaces = add_spaces;
		self.word_count += tokens.len();

		let n = self.config.n_factor;
		for i in 0..tokens.len() {
			let window = &tokens[i..(i + n).min(tokens.len())];
			for _ in 0..multiplier {
				self.add_window(window.iter().map(|t| (t.as_ref(), false)));
			}
		}
		info!(
			"Loaded {} tokens (x{multiplier}), {} nodes in tree",
			tokens.len(),
			self.tree.len() - 1
		);
	}

	/// Loads an array of sentences.
	///
	/// # Behavior
	/// - Each sentence is cleaned (whitespace, optional quote removal) and
	///   tokenized with the model's tokenizer
	/// - With duplicates disallowed, the tokens are joined and normalized the
	///   way generated sentences are, and kept for the duplicate check
	/// - With sentence recognition on, a sentence whose first token does not
	///   match the sentence-start pattern is skipped
	/// - The first token of every kept sentence is marked as a sentence start
	/// - The kept sentences are flattened into one stream and windows are
	///   inserted as in [`Model::load_tokens`], so windows cross sentence
	///   boundaries
	pub fn load_sentences<S: AsRef<str>>(&mut self, sentences: &[S], multiplier: usize) {
		let tokenizer = Arc::clone(&self.tokenizer);
		let mut stream: Vec<(String, bool)> = Vec::new();
		let mut skipped = 0usize;

		for raw in sentences {
			let sentence = clean_sentence(raw.as_ref(), self.config.remove_quotations);
			let tokens = tokenizer.tokenize(&sentence);
			let Some(first) = tokens.first() else {
				debug!("Ignoring empty sentence {:?}", raw.as_ref());
				continue;
			};

			if self.config.recognize_sentences && !self.sentence_start.is_match(first) {
				skipped += 1;
				if self.config.log_skipped_sentences {
					warn!("Skipping sentence with a bad start: {sentence:?}");
				}
				continue;
			}

			if !self.config.allow_duplicates {
				let key = self.duplicate_key(&normalize_punctuation(&tokens.join(" ")));
				self.seen_sentences.insert(key);
			}
			self.word_count += tokens.len();
			stream.extend(tokens.into_iter().enumerate().map(|(i, t)| (t, i == 0)));
		}

		let n = self.config.n_factor;
		for i in 0..stream.len() {
			let window = &stream[i..(i + n).min(stream.len())];
			for _ in 0..multiplier {
				self.add_window(window.iter().map(|(t, opens)| (t.as_str(), *opens)));
			}
		}
		info!(
			"Loaded {} sentences ({skipped} skipped, x{multiplier}), {} sentence starts, {} nodes in tree",
			sentences.len() - skipped,
			self.sentence_starts.len(),
			self.tree.len() - 1
		);
	}

	/// Loads raw text.
	///
	/// With sentence recognition on, the text is split into sentences by the
	/// tokenizer and passed to [`Model::load_sentences`]; otherwise it is
	/// tokenized and passed to [`Model::load_tokens`].
	pub fn load_text(&mut self, text: &str, multiplier: usize) {
		if self.config.recognize_sentences {
			let sentences = self.tokenizer.split_sentences(text);
			self.load_sentences(&sentences, multiplier);
		} else {
			let tokens = self.tokenizer.tokenize(text);
			let add_spaces = self.config.add_spaces;
			self.load_tokens(&tokens, multiplier, add_spaces);
		}
	}
}
