use std::sync::LazyLock;

use regex::Regex;

/// Abbreviations that never end a sentence.
const ABBREVIATIONS: &[&str] = &[
	// titles
	"Adm.", "Capt.", "Cmdr.", "Col.", "Dr.", "Gen.", "Gov.", "Lt.", "Maj.", "Messrs.",
	"Mr.", "Mrs.", "Ms.", "Prof.", "Rep.", "Reps.", "Rev.", "Sen.", "Sens.", "Sgt.",
	"Sr.", "St.",
	// first names
	"Alex.", "Benj.", "Chas.",
	// months
	"Jan.", "Feb.", "Mar.", "Apr.", "Jun.", "Jul.", "Aug.", "Sept.", "Oct.", "Nov.", "Dec.",
	// other
	"a.k.a.", "c.f.", "i.e.", "e.g.", "vs.", "v.",
];

/// Returns true if `word` is a known abbreviation.
///
/// Matches the listed spelling or its all-lowercase form, nothing else.
pub fn is_abbreviation(word: &str) -> bool {
	ABBREVIATIONS
		.iter()
		.any(|abbr| *abbr == word || abbr.to_lowercase() == word)
}

static DOUBLE_QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new("[\"\u{201C}\u{201D}]").expect("static regex"));
static TRAILING_SINGLE_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new("['`\u{2018}\u{2019}] ").expect("static regex"));
static LEADING_SINGLE_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(" ['`\u{2018}\u{2019}]").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

// "dog ." -> "dog."
static SENTENCE_ENDING_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.+[a-z](\s+)[.?!]$").expect("static regex"));
// "dog , cat" -> "dog, cat"; a gap right after a dash is left alone
static PUNCTUATION_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^.*?[^-\s](\s+)["'?!.,:;`].+$"#).expect("static regex"));

/// Normalizes a raw training sentence.
///
/// - Optionally drops quotation marks (double quotes anywhere, single
///   quotes only when they touch a space)
/// - Collapses whitespace runs to one space and trims the ends
pub fn clean_sentence(sentence: &str, remove_quotations: bool) -> String {
	let mut s = sentence.to_owned();
	if remove_quotations {
		s = DOUBLE_QUOTES.replace_all(&s, "").into_owned();
		s = TRAILING_SINGLE_QUOTE.replace_all(&s, " ").into_owned();
		s = LEADING_SINGLE_QUOTE.replace_all(&s, " ").into_owned();
	}
	WHITESPACE.replace_all(&s, " ").trim().to_owned()
}

/// Upper-cases the first character, leaving the rest untouched.
pub fn upper_case_first(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// True if `word` starts with something other than a letter, digit or `_`.
pub fn starts_with_non_word(word: &str) -> bool {
	word.chars()
		.next()
		.is_some_and(|c| !(c.is_alphanumeric() || c == '_'))
}

/// Repeatedly deletes capture group 1 of `pattern` while the whole string matches.
fn remove_group(mut s: String, pattern: &Regex) -> String {
	while let Some(range) = pattern.captures(&s).and_then(|caps| caps.get(1)).map(|m| m.range()) {
		if range.is_empty() {
			break;
		}
		s.replace_range(range, "");
	}
	s
}

/// Turns space-joined tokens into a sentence: trims, capitalizes the first
/// letter and closes the gaps before punctuation.
pub fn normalize_punctuation(sentence: &str) -> String {
	let s = upper_case_first(sentence.trim());
	let s = remove_group(s, &SENTENCE_ENDING_GAP);
	remove_group(s, &PUNCTUATION_GAP)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn abbreviations_match_listed_and_lowercase_forms() {
		assert!(is_abbreviation("Mr."));
		assert!(is_abbreviation("mr."));
		assert!(is_abbreviation("e.g."));
		assert!(!is_abbreviation("MR."));
		assert!(!is_abbreviation("dog."));
	}

	#[test]
	fn clean_collapses_whitespace_and_quotes() {
		assert_eq!(clean_sentence("  The \"big\"\n dog  ", true), "The big dog");
		assert_eq!(clean_sentence("He said 'no' twice.", true), "He said no twice.");
		assert_eq!(clean_sentence("He said \"no\".", false), "He said \"no\".");
		assert_eq!(clean_sentence("don't  stop", true), "don't stop");
	}

	#[test]
	fn normalize_closes_gaps() {
		assert_eq!(normalize_punctuation("the dog ."), "The dog.");
		assert_eq!(normalize_punctuation("the dog , the cat and the bird !"), "The dog, the cat and the bird!");
		assert_eq!(normalize_punctuation("yes ; no : maybe ?"), "Yes; no: maybe?");
	}

	#[test]
	fn normalize_leaves_dashes() {
		assert_eq!(normalize_punctuation("well - ok ."), "Well - ok.");
		assert_eq!(normalize_punctuation("wait - , then"), "Wait - , then");
	}

	#[test]
	fn normalize_closes_gaps_after_hyphenated_words() {
		assert_eq!(
			normalize_punctuation("the well-known dog barked , then ran home ."),
			"The well-known dog barked, then ran home."
		);
		assert_eq!(normalize_punctuation("a , b ; c"), "A, b; c");
	}

	#[test]
	fn non_word_start() {
		assert!(starts_with_non_word(", and"));
		assert!(starts_with_non_word("'tis"));
		assert!(!starts_with_non_word("Then"));
		assert!(!starts_with_non_word(""));
	}

	#[test]
	fn upper_case_first_handles_unicode() {
		assert_eq!(upper_case_first("élan vital"), "Élan vital");
		assert_eq!(upper_case_first(""), "");
	}
}
