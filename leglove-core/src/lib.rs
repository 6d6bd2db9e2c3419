//! Citation-aware normalization and corpus streaming for legal word vectors.
//!
//! The pipeline turns raw opinion text into lowercase token sequences where
//! every judicial citation, statute reference, `Id.` back-reference, footnote
//! anchor and star-pagination marker has been collapsed into one placeholder
//! token. [`corpus::CorpusStream`] walks a `root/<group>/<document>` tree and
//! yields one sequence per document; [`cooccur::Cooccurrence`] consumes them.

pub mod analyzer;
pub mod cooccur;
pub mod corpus;
pub mod error;

pub use analyzer::{Normalizer, RuleSet, WordTokenizer};
pub use error::{CorpusError, LoadError, Result};
pub use leglove_types::{
    LoadErrorPolicy, Placeholder, PlaceholderCounts, StreamConfig, TokenSequence, TrainerConfig,
};
