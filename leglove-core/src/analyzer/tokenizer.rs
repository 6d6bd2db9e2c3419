//! Word Tokenizer Module
//!
//! Splits lowercased, citation-normalized text into word tokens. It's the last
//! stage of the normalizer, turning text into the units a co-occurrence
//! window slides over.
//!
//! ## What It Does
//!
//! Given `"the court's holding in the u.s. wasn't \"final\"."`, it emits:
//!
//! ```text
//! the court 's holding in the u.s. was n't `` final '' .
//! ```
//!
//! ## Rules
//!
//! Treebank-style, tuned for opinions:
//!
//! - Whitespace separates tokens and is never emitted
//! - Letters, digits and `_` form words, so placeholders stay atomic
//! - `.` `-` `/` `'` stay inside a word when another word character follows
//!   (`u.s`, `f.3d`, `well-known`, `and/or`, `app'x`); `,` and `:` only between
//!   digits (`1,000`, `10:30`)
//! - Clitics are split off: `n't`, `'s`, `'re`, `'ve`, `'ll`, `'d`, `'m`
//! - A trailing `.` stays on a word that already contains a period or is a
//!   single letter (`u.s.`, `v.`, `n.`), except at the very end of the input
//!   (see [`WordTokenizer::iter_continued`] for text that is not the end)
//! - `...` and `--` are single tokens
//! - `"` becomes ``` `` ``` when it opens and `''` when it closes
//! - Any other character is a token on its own
//!
//! ## Zero Allocation
//!
//! Tokens are slices of the input. The only exceptions are the two quote
//! tokens, which are static strings.

use core::iter::FusedIterator;

const CLITICS: [&str; 6] = ["'s", "'re", "'ve", "'ll", "'d", "'m"];

#[inline(always)]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[inline(always)]
fn char_at(text: &str, at: usize) -> Option<char> {
    text.get(at..).and_then(|rest| rest.chars().next())
}

fn split_clitic(word: &str) -> Option<(&str, &str)> {
    let bytes = word.as_bytes();
    if bytes.len() > 3 && bytes[bytes.len() - 3..].eq_ignore_ascii_case(b"n't") {
        let k = word.len() - 3;
        return Some((&word[..k], &word[k..]));
    }

    let k = word.rfind('\'')?;
    if k == 0 {
        return None;
    }
    let tail = &word[k..];
    CLITICS
        .iter()
        .any(|c| tail.eq_ignore_ascii_case(c))
        .then(|| (&word[..k], tail))
}

/// Tokenizer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Emit tokens that contain no letter or digit (`,` `.` `(` ...).
    pub keep_punctuation: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            keep_punctuation: true,
        }
    }
}

/// Linguistic word tokenizer.
///
/// Stateless and `Copy`; one instance can be shared by any number of
/// normalizers and threads.
///
/// ## Example
///
/// ```
/// use leglove_core::analyzer::tokenizer::WordTokenizer;
///
/// let tokenizer = WordTokenizer::default();
/// let mut count = 0;
///
/// tokenizer.tokenize("see law_citation, supra.", |text, pos| {
///     count += 1;
/// });
///
/// assert_eq!(count, 5);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer {
    config: TokenizerConfig,
}

impl WordTokenizer {
    /// Creates a tokenizer with the given options.
    #[inline]
    pub const fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Returns the options in use.
    #[inline]
    pub const fn config(&self) -> TokenizerConfig {
        self.config
    }

    /// Lazily iterates the tokens of `text`.
    #[inline]
    pub fn iter<'n>(&self, text: &'n str) -> Tokens<'n> {
        Tokens {
            text,
            at: 0,
            pending: None,
            keep_punctuation: self.config.keep_punctuation,
            continued: false,
        }
    }

    /// Like [`iter`](Self::iter), for a chunk that more input follows. The
    /// end of `text` is not the end of the input, so a trailing period after
    /// an abbreviation stays attached.
    #[inline]
    pub fn iter_continued<'n>(&self, text: &'n str) -> Tokens<'n> {
        Tokens {
            continued: true,
            ..self.iter(text)
        }
    }

    /// Tokenizes `text` and emits `(token, position)`.
    ///
    /// Position is `u32`. After emitting a token at position `u32::MAX`,
    /// further emissions stop (overflow protection).
    #[inline]
    pub fn tokenize<'n, F>(&self, text: &'n str, mut emit: F)
    where
        F: FnMut(&'n str, u32),
    {
        for (pos, token) in self.iter(text).enumerate() {
            let Ok(pos) = u32::try_from(pos) else { return };
            emit(token, pos);
        }
    }

    /// Tokenizes `text` into owned strings.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.iter(text).map(str::to_owned).collect()
    }
}

/// Iterator over the tokens of one text. See [`WordTokenizer::iter`].
#[derive(Debug, Clone)]
pub struct Tokens<'n> {
    text: &'n str,
    at: usize,
    pending: Option<&'n str>,
    keep_punctuation: bool,
    continued: bool,
}

impl<'n> Tokens<'n> {
    fn scan(&mut self) -> Option<&'n str> {
        if let Some(clitic) = self.pending.take() {
            return Some(clitic);
        }

        let c = loop {
            let c = char_at(self.text, self.at)?;
            if !c.is_whitespace() {
                break c;
            }
            self.at += c.len_utf8();
        };

        let start = self.at;
        if is_word_char(c) {
            Some(self.word(start))
        } else {
            Some(self.punctuation(start, c))
        }
    }

    fn word(&mut self, start: usize) -> &'n str {
        let text = self.text;
        let mut end = start;
        let mut prev = '\0';
        let mut has_period = false;

        while let Some(c) = char_at(text, end) {
            if is_word_char(c) {
                end += c.len_utf8();
                prev = c;
                continue;
            }

            let after = char_at(text, end + c.len_utf8());
            let joins = match (c, after) {
                ('.' | '-' | '/' | '\'', Some(a)) => is_word_char(a),
                (',' | ':', Some(a)) => prev.is_ascii_digit() && a.is_ascii_digit(),
                _ => false,
            };
            if !joins {
                break;
            }

            has_period |= c == '.';
            end += c.len_utf8();
            prev = c;
        }

        let mut chars = text[start..end].chars();
        let single_letter = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic());
        if (has_period || single_letter)
            && char_at(text, end) == Some('.')
            && (self.continued || !text[end + 1..].trim_start().is_empty())
        {
            end += 1;
        }

        self.at = end;
        let word = &text[start..end];
        match split_clitic(word) {
            Some((head, clitic)) => {
                self.pending = Some(clitic);
                head
            }
            None => word,
        }
    }

    fn punctuation(&mut self, start: usize, c: char) -> &'n str {
        let text = self.text;
        let rest = &text[start..];

        for multi in ["...", "--"] {
            if rest.starts_with(multi) {
                self.at = start + multi.len();
                return &rest[..multi.len()];
            }
        }

        self.at = start + c.len_utf8();
        if c == '"' {
            let opening = text[..start]
                .chars()
                .next_back()
                .map_or(true, |p| p.is_whitespace() || matches!(p, '(' | '[' | '{' | '<'));
            return if opening { "``" } else { "''" };
        }

        &rest[..c.len_utf8()]
    }
}

impl<'n> Iterator for Tokens<'n> {
    type Item = &'n str;

    fn next(&mut self) -> Option<&'n str> {
        loop {
            let token = self.scan()?;
            if self.keep_punctuation || token.chars().any(char::is_alphanumeric) {
                return Some(token);
            }
        }
    }
}

impl FusedIterator for Tokens<'_> {}
