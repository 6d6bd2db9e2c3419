//! Word co-occurrence accumulation.
//!
//! [`Cooccurrence`] is the consumer of the corpus stream: it assigns every
//! token a dense id in first-seen order and sums distance-weighted counts of
//! token pairs inside a symmetric context window. Sequences are folded in one
//! at a time and never retained.

use core::fmt;

use leglove_types::TrainerConfig;
use rustc_hash::FxHashMap;

/// Dense token id.
pub type WordId = u32;

/// Sparse symmetric co-occurrence matrix with its dictionary.
///
/// Only the upper triangle (`row <= col`) is stored. A pair `d` positions
/// apart (`1 <= d <= window`) adds `1 / d`. Repeats of the same word inside
/// the window land on the diagonal.
#[derive(Debug, Clone)]
pub struct Cooccurrence {
    window: usize,
    dictionary: FxHashMap<String, WordId>,
    words: Vec<String>,
    counts: FxHashMap<(WordId, WordId), f32>,
    sequences: usize,
    tokens: usize,
    scratch: Vec<WordId>,
}

impl Cooccurrence {
    /// Creates an empty accumulator with the given context window.
    pub fn new(window: usize) -> Self {
        Self {
            window,
            dictionary: FxHashMap::default(),
            words: Vec::new(),
            counts: FxHashMap::default(),
            sequences: 0,
            tokens: 0,
            scratch: Vec::new(),
        }
    }

    /// Creates an empty accumulator using the trainer's window.
    pub fn for_trainer(config: &TrainerConfig) -> Self {
        Self::new(config.window)
    }

    /// Accumulates every sequence.
    pub fn fit<I, T, S>(sequences: I, window: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut matrix = Self::new(window);
        for sequence in sequences {
            matrix.add_sequence(sequence.as_ref());
        }
        matrix
    }

    /// Accumulates a fallible stream, stopping at the first error.
    pub fn try_fit<I, T, S, E>(sequences: I, window: usize) -> Result<Self, E>
    where
        I: IntoIterator<Item = Result<T, E>>,
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut matrix = Self::new(window);
        for sequence in sequences {
            matrix.add_sequence(sequence?.as_ref());
        }
        Ok(matrix)
    }

    /// Adds one token sequence. Pairs never span two sequences.
    pub fn add_sequence<S: AsRef<str>>(&mut self, tokens: &[S]) {
        let mut ids = core::mem::take(&mut self.scratch);
        ids.clear();
        ids.extend(tokens.iter().map(|t| self.intern(t.as_ref())));

        for (i, &outer) in ids.iter().enumerate() {
            let start = i.saturating_sub(self.window);
            for (j, &inner) in ids[start..i].iter().enumerate() {
                let distance = (i - (start + j)) as f32;
                let key = if inner <= outer { (inner, outer) } else { (outer, inner) };
                *self.counts.entry(key).or_insert(0.0) += 1.0 / distance;
            }
        }

        self.sequences += 1;
        self.tokens += ids.len();
        self.scratch = ids;
    }

    fn intern(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.dictionary.get(word) {
            return id;
        }
        let id = self.words.len() as WordId;
        self.dictionary.insert(word.to_owned(), id);
        self.words.push(word.to_owned());
        id
    }

    /// Token to id.
    #[inline]
    pub fn dictionary(&self) -> &FxHashMap<String, WordId> {
        &self.dictionary
    }

    /// Id of `word`, if it has been seen.
    pub fn id(&self, word: &str) -> Option<WordId> {
        self.dictionary.get(word).copied()
    }

    /// Word with the given id.
    pub fn word(&self, id: WordId) -> Option<&str> {
        self.words.get(id as usize).map(String::as_str)
    }

    /// Weighted count of `a` and `b` appearing together, in either order.
    pub fn get(&self, a: &str, b: &str) -> f32 {
        match (self.id(a), self.id(b)) {
            (Some(a), Some(b)) => self.get_ids(a, b),
            _ => 0.0,
        }
    }

    /// Weighted count by id.
    pub fn get_ids(&self, a: WordId, b: WordId) -> f32 {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.counts.get(&key).copied().unwrap_or(0.0)
    }

    /// Iterates stored `(row, col, weight)` entries with `row <= col`, in no
    /// particular order.
    pub fn iter(&self) -> impl Iterator<Item = (WordId, WordId, f32)> + '_ {
        self.counts.iter().map(|(&(r, c), &w)| (r, c, w))
    }

    /// Stored entries ordered by `(row, col)`.
    pub fn sorted_entries(&self) -> Vec<(WordId, WordId, f32)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|&(r, c, _)| (r, c));
        entries
    }

    /// Number of stored pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` if no pair has been counted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Context window the counts were taken with.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// Returns accumulator statistics.
    pub fn stats(&self) -> CooccurrenceStats {
        CooccurrenceStats {
            vocabulary: self.words.len(),
            pairs: self.counts.len(),
            sequences: self.sequences,
            tokens: self.tokens,
            window: self.window,
        }
    }
}

/// A snapshot of accumulator statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooccurrenceStats {
    /// Distinct tokens.
    pub vocabulary: usize,
    /// Non-zero upper-triangular entries.
    pub pairs: usize,
    /// Sequences folded in.
    pub sequences: usize,
    /// Tokens across all sequences.
    pub tokens: usize,
    /// Context window used.
    pub window: usize,
}

impl CooccurrenceStats {
    /// Returns approximate memory usage of the matrix in bytes, ignoring
    /// the dictionary's strings.
    pub fn memory_usage_bytes(&self) -> usize {
        let entry = std::mem::size_of::<((WordId, WordId), f32)>();
        self.pairs * entry + self.vocabulary * std::mem::size_of::<WordId>()
    }
}

impl fmt::Display for CooccurrenceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} words, {} pairs from {} sequences ({} tokens, window {})",
            self.vocabulary, self.pairs, self.sequences, self.tokens, self.window
        )
    }
}

/// Fits word vectors to a co-occurrence matrix.
///
/// No implementation ships with this crate; the trait fixes the hand-off
/// between corpus statistics and an external optimizer.
pub trait EmbeddingTrainer {
    /// Failure reported by the optimizer.
    type Error;

    /// Trains on `matrix` using the dictionary it carries.
    fn fit(&mut self, matrix: &Cooccurrence, config: &TrainerConfig) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn weights_by_inverse_distance() {
        let m = Cooccurrence::fit([seq("a b c")], 2);
        assert_eq!(m.get("a", "b"), 1.0);
        assert_eq!(m.get("b", "c"), 1.0);
        assert_eq!(m.get("a", "c"), 0.5);
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn window_limits_pairs() {
        let m = Cooccurrence::fit([seq("a b c d")], 1);
        assert_eq!(m.get("a", "c"), 0.0);
        assert_eq!(m.len(), 3);
        assert!(Cooccurrence::fit([seq("a b c")], 0).is_empty());
    }

    #[test]
    fn symmetric_lookup() {
        let m = Cooccurrence::fit([seq("court held statute")], 10);
        assert_eq!(m.get("statute", "court"), m.get("court", "statute"));
        assert_eq!(m.get("court", "missing"), 0.0);
        for (r, c, _) in m.iter() {
            assert!(r <= c);
        }
    }

    #[test]
    fn repeats_accumulate_on_the_diagonal() {
        let m = Cooccurrence::fit([seq("a a"), seq("a x a")], 10);
        assert_eq!(m.get("a", "a"), 1.5);
        assert_eq!(m.get("a", "x"), 2.0);
    }

    #[test]
    fn pairs_never_cross_sequences() {
        let m = Cooccurrence::fit([seq("a"), seq("b")], 10);
        assert_eq!(m.get("a", "b"), 0.0);
        assert!(m.is_empty());
        assert_eq!(m.dictionary().len(), 2);
    }

    #[test]
    fn dictionary_in_first_seen_order() {
        let m = Cooccurrence::fit([seq("the court"), seq("a court the")], 10);
        assert_eq!(m.id("the"), Some(0));
        assert_eq!(m.id("court"), Some(1));
        assert_eq!(m.id("a"), Some(2));
        assert_eq!(m.word(1), Some("court"));
        assert_eq!(m.word(9), None);
    }

    #[test]
    fn sorted_entries_are_ordered() {
        let m = Cooccurrence::fit([seq("c b a c")], 3);
        let entries = m.sorted_entries();
        assert_eq!(entries.len(), m.len());
        assert!(entries.windows(2).all(|w| (w[0].0, w[0].1) < (w[1].0, w[1].1)));
    }

    #[test]
    fn try_fit_stops_at_first_error() {
        let items: Vec<Result<Vec<String>, &str>> = vec![
            Ok(vec!["a".into(), "b".into()]),
            Err("boom"),
            Ok(vec!["c".into()]),
        ];
        assert_eq!(Cooccurrence::try_fit(items, 5).err(), Some("boom"));

        let ok: Vec<Result<Vec<String>, &str>> = vec![Ok(vec!["a".into(), "b".into()])];
        assert_eq!(Cooccurrence::try_fit(ok, 5).unwrap().len(), 1);
    }

    #[test]
    fn stats_snapshot() {
        let mut m = Cooccurrence::for_trainer(&TrainerConfig::default());
        m.add_sequence(&seq("roe v. wade")[..]);
        m.add_sequence(&["law_citation"][..]);
        let stats = m.stats();
        assert_eq!(stats.vocabulary, 4);
        assert_eq!(stats.pairs, 3);
        assert_eq!(stats.sequences, 2);
        assert_eq!(stats.tokens, 4);
        assert_eq!(stats.window, 10);
        assert!(stats.memory_usage_bytes() > 0);
        assert_eq!(
            stats.to_string(),
            "4 words, 3 pairs from 2 sequences (4 tokens, window 10)"
        );
    }

    #[test]
    fn trainer_receives_matrix() {
        struct Recording(usize, String);

        impl EmbeddingTrainer for Recording {
            type Error = std::convert::Infallible;

            fn fit(&mut self, matrix: &Cooccurrence, config: &TrainerConfig) -> Result<(), Self::Error> {
                self.0 = matrix.dictionary().len();
                self.1 = config.model_file_name();
                Ok(())
            }
        }

        let matrix = Cooccurrence::fit([seq("a b")], 10);
        let mut trainer = Recording(0, String::new());
        trainer.fit(&matrix, &TrainerConfig::default()).unwrap();
        assert_eq!(trainer.0, 2);
        assert_eq!(trainer.1, "LeGlove.model");
    }

    #[test]
    fn fits_a_streamed_corpus() {
        use crate::corpus::{CorpusStream, NoProgress, PlainTextLoader};
        use leglove_types::StreamConfig;

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("g")).unwrap();
        std::fs::write(dir.path().join("g/a.txt"), "Held in 410 U.S. 113").unwrap();
        std::fs::write(dir.path().join("g/b.txt"), "Held again").unwrap();

        let stream = CorpusStream::open(dir.path(), PlainTextLoader::new(), StreamConfig::default())
            .unwrap()
            .with_observer(NoProgress);
        let m = Cooccurrence::try_fit(stream, 10).unwrap();
        assert_eq!(m.get("held", "judicial_opinion_citation"), 0.5);
        assert_eq!(m.get("held", "again"), 1.0);
        assert_eq!(m.stats().sequences, 2);
    }
}
