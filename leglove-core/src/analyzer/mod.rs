//! Text analysis pipeline.
//!
//! This module provides the text processing components:
//! - **Rules**: Ordered citation patterns and placeholder substitution
//! - **Tokenizer**: Splits lowercased text into word tokens
//! - **Normalizer**: Substitution, lowercasing and tokenization in one call

pub mod normalizer;
pub mod rules;
pub mod tokenizer;

pub use normalizer::Normalizer;
pub use rules::{rules, NormalizationRule, RuleMatch, RuleSet, Segment, Substitution};
pub use tokenizer::{TokenizerConfig, Tokens, WordTokenizer};
