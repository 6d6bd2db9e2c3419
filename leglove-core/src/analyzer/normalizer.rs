use std::borrow::Cow;

use leglove_types::TokenSequence;

use crate::analyzer::rules::{rules, RuleSet, Segment};
use crate::analyzer::tokenizer::WordTokenizer;

/// Lowercases `input` into `out`, reusing its capacity.
///
/// ASCII input takes a byte-wise path; anything else goes through the full
/// Unicode mapping (including final sigma).
#[inline]
pub fn lowercase_into(input: &str, out: &mut String) {
    out.clear();
    if input.is_ascii() {
        out.push_str(input);
        out.make_ascii_lowercase();
    } else {
        out.push_str(&input.to_lowercase());
    }
}

/// Citation-aware text normalizer.
///
/// Performs the following operations, in order:
/// - Replaces citation, footnote and pagination sub-strings with placeholders,
///   one rule at a time in table order
/// - Converts the remaining text to lowercase (Unicode-aware)
/// - Splits it into word tokens; placeholders come out as single tokens
///
/// The rule table is borrowed and never mutated, so a `Normalizer` is `Copy`
/// and can be handed to as many threads as there are documents.
///
/// # Examples
///
/// ```
/// let normalizer = Normalizer::default();
/// assert_eq!(
///     normalizer.normalize("Roe v. Wade, 410 U.S. 113 (1973)."),
///     vec!["roe", "v.", "wade", ",", "judicial_opinion_citation", "."]
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'r> {
    rules: &'r RuleSet,
    tokenizer: WordTokenizer,
}

impl Default for Normalizer<'static> {
    fn default() -> Self {
        Self::new(rules())
    }
}

impl<'r> Normalizer<'r> {
    /// Creates a normalizer over `rules` with the default tokenizer.
    pub fn new(rules: &'r RuleSet) -> Self {
        Self {
            rules,
            tokenizer: WordTokenizer::default(),
        }
    }

    /// Replaces the tokenizer.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: WordTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// The rule table in use.
    #[inline]
    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    /// The tokenizer in use.
    #[inline]
    pub fn tokenizer(&self) -> WordTokenizer {
        self.tokenizer
    }

    /// Applies the rule table only: the text as it stands before lowercasing
    /// and tokenization.
    #[inline]
    pub fn substitute<'t>(&self, raw: &'t str) -> Cow<'t, str> {
        self.rules.substitute(raw)
    }

    /// Normalizes `raw` and emits each token.
    ///
    /// Tokens borrow from an internal buffer and are only valid for the
    /// duration of the callback.
    pub fn normalize_with<F>(&self, raw: &str, mut emit: F)
    where
        F: FnMut(&str),
    {
        let substitution = self.rules.segment(raw);
        let mut lowered = String::new();

        let mut segments = substitution.segments().peekable();
        while let Some(segment) = segments.next() {
            match segment {
                Segment::Placeholder(p) => emit(p.lowercase()),
                Segment::Text(text) => {
                    lowercase_into(text, &mut lowered);
                    let tokens = if segments.peek().is_some() {
                        self.tokenizer.iter_continued(&lowered)
                    } else {
                        self.tokenizer.iter(&lowered)
                    };
                    for token in tokens {
                        emit(token);
                    }
                }
            }
        }
    }

    /// Normalizes `raw` into `out`, replacing its contents.
    pub fn normalize_into(&self, raw: &str, out: &mut TokenSequence) {
        out.clear();
        self.normalize_with(raw, |token| out.push(token.to_owned()));
    }

    /// Normalizes `raw` into a new token sequence.
    ///
    /// Empty or whitespace-only input yields an empty sequence.
    pub fn normalize(&self, raw: &str) -> TokenSequence {
        let mut out = Vec::new();
        self.normalize_into(raw, &mut out);
        out
    }
}
