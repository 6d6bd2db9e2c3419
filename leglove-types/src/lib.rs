//! Core types for the LeGlove legal text pipeline.
//!
//! This crate provides the types shared between the normalizer, the corpus
//! streamer and whatever consumes the token stream. Keeping them separate
//! ensures:
//!
//! - **No dependencies**: types can be used by a trainer without pulling in regex
//! - **Cross-crate compatibility**: core and binaries share the same vocabulary
//! - **Clean boundaries**: configuration lives next to the types it configures

#![warn(missing_docs)]

use core::fmt;

/// Tokens of one normalized document, in reading order.
///
/// Every token is lowercase. Citation, footnote and pagination occurrences
/// appear as the lowercase form of a [`Placeholder`].
pub type TokenSequence = Vec<String>;

/// Fixed token substituted for a variable-length legal sub-string.
///
/// The discriminant order is the substitution order: earlier kinds are more
/// specific and are applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Placeholder {
    /// Volume, reporter and page, e.g. `410 U.S. 113, 164 (1973)`.
    JudicialOpinionCitation = 0,
    /// Footnote anchor element.
    Footnote = 1,
    /// Emphasized `Id.,` back-reference with a page.
    IdCitation = 2,
    /// Statute section reference, e.g. `§ 230(c)(1)`.
    LawCitation = 3,
    /// Star-pagination span marking a page break of the printed reporter.
    StarPagination = 4,
}

impl Placeholder {
    /// All placeholders in substitution order.
    pub const ALL: [Placeholder; 5] = [
        Placeholder::JudicialOpinionCitation,
        Placeholder::Footnote,
        Placeholder::IdCitation,
        Placeholder::LawCitation,
        Placeholder::StarPagination,
    ];

    /// Number of placeholder kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// The literal inserted into the text during substitution.
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Placeholder::JudicialOpinionCitation => "JUDICIAL_OPINION_CITATION",
            Placeholder::Footnote => "FOOTNOTE",
            Placeholder::IdCitation => "ID_CITATION",
            Placeholder::LawCitation => "LAW_CITATION",
            Placeholder::StarPagination => "STAR_PAGINATION",
        }
    }

    /// The form the placeholder takes in a [`TokenSequence`].
    #[must_use]
    #[inline]
    pub const fn lowercase(self) -> &'static str {
        match self {
            Placeholder::JudicialOpinionCitation => "judicial_opinion_citation",
            Placeholder::Footnote => "footnote",
            Placeholder::IdCitation => "id_citation",
            Placeholder::LawCitation => "law_citation",
            Placeholder::StarPagination => "star_pagination",
        }
    }

    /// Position of this placeholder in the substitution order.
    #[must_use]
    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks up a placeholder by its token, in either case.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind match counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderCounts([usize; Placeholder::COUNT]);

impl PlaceholderCounts {
    /// Records `n` matches of `kind`.
    #[inline]
    pub fn add(&mut self, kind: Placeholder, n: usize) {
        self.0[kind.index()] += n;
    }

    /// Number of matches recorded for `kind`.
    #[inline]
    pub fn get(&self, kind: Placeholder) -> usize {
        self.0[kind.index()]
    }

    /// Total matches across all kinds.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Iterates `(kind, count)` in substitution order.
    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, usize)> + '_ {
        Placeholder::ALL.into_iter().map(|p| (p, self.0[p.index()]))
    }
}

impl fmt::Display for PlaceholderCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (kind, n) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", kind.lowercase(), n)?;
            first = false;
        }
        Ok(())
    }
}

/// What the corpus streamer does when the loader fails on one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadErrorPolicy {
    /// Yield the error and end the stream.
    #[default]
    Abort,
    /// Log the failure, count it, and continue with the next document.
    Skip,
}

/// Corpus streaming options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// A progress signal is emitted every time this many documents have been processed.
    /// Default: 1000
    pub progress_interval: usize,
    /// Reaction to a document that cannot be loaded.
    pub on_load_error: LoadErrorPolicy,
    /// Ignore entries whose name begins with `.` at both directory levels.
    pub skip_hidden: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            progress_interval: 1000,
            on_load_error: LoadErrorPolicy::Abort,
            skip_hidden: true,
        }
    }
}

impl StreamConfig {
    /// Configuration that logs and skips unreadable documents.
    pub const fn resilient() -> Self {
        Self {
            progress_interval: 1000,
            on_load_error: LoadErrorPolicy::Skip,
            skip_hidden: true,
        }
    }
}

/// Parameters handed to the embedding trainer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Symmetric context window used for co-occurrence counting.
    /// Default: 10
    pub window: usize,
    /// Learning rate of the vector fit.
    /// Default: 0.05
    pub learning_rate: f32,
    /// Dimensionality of the output word vectors.
    /// Default: 100
    pub components: usize,
    /// Number of training epochs.
    pub epochs: usize,
    /// Number of worker threads used by the trainer.
    pub threads: usize,
    /// Base name of the saved model artifact.
    pub model_name: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            window: 10,
            learning_rate: 0.05,
            components: 100,
            epochs: 10,
            threads: 1,
            model_name: String::from("LeGlove"),
        }
    }
}

impl TrainerConfig {
    /// File name the trained model is saved under.
    pub fn model_file_name(&self) -> String {
        format!("{}.model", self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_size_is_1_byte() {
        assert_eq!(core::mem::size_of::<Placeholder>(), 1);
    }

    #[test]
    fn placeholder_order_matches_index() {
        for (i, p) in Placeholder::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn lowercase_matches_as_str() {
        for p in Placeholder::ALL {
            assert_eq!(p.lowercase(), p.as_str().to_lowercase());
        }
    }

    #[test]
    fn placeholders_are_single_words() {
        for p in Placeholder::ALL {
            assert!(p
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b == b'_'));
        }
    }

    #[test]
    fn from_token_any_case() {
        assert_eq!(
            Placeholder::from_token("law_citation"),
            Some(Placeholder::LawCitation)
        );
        assert_eq!(
            Placeholder::from_token("FOOTNOTE"),
            Some(Placeholder::Footnote)
        );
        assert_eq!(Placeholder::from_token("citation"), None);
    }

    #[test]
    fn counts_accumulate() {
        let mut counts = PlaceholderCounts::default();
        counts.add(Placeholder::Footnote, 2);
        counts.add(Placeholder::LawCitation, 1);
        counts.add(Placeholder::Footnote, 1);
        assert_eq!(counts.get(Placeholder::Footnote), 3);
        assert_eq!(counts.get(Placeholder::IdCitation), 0);
        assert_eq!(counts.total(), 4);
        assert!(format!("{counts}").contains("footnote=3"));
    }

    #[test]
    fn stream_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.progress_interval, 1000);
        assert_eq!(config.on_load_error, LoadErrorPolicy::Abort);
        assert!(config.skip_hidden);
        assert_eq!(StreamConfig::resilient().on_load_error, LoadErrorPolicy::Skip);
    }

    #[test]
    fn trainer_defaults() {
        let config = TrainerConfig::default();
        assert_eq!(config.window, 10);
        assert_eq!(config.learning_rate, 0.05);
        assert_eq!(config.components, 100);
        assert_eq!(config.model_file_name(), "LeGlove.model");
    }
}
