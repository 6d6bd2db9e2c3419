//! Citation pipeline throughput.
//!
//! Runs each stage of the normalizer over one large text file (for example a
//! concatenation of opinion HTML) and reports MiB/s and tokens/s:
//!
//! - **substitute**: citation and markup rules only
//! - **tokenize**: word tokenization of the lowercased input
//! - **pipeline**: substitution, lowercasing and tokenization together
//!
//! ```bash
//! ./target/release/citation_bench /path/to/opinions.html [substitute|tokenize|pipeline]
//! ```
//!
//! Build in release mode and use an input of 100MB+ for stable numbers.

use std::env;
use std::fmt;
use std::fs;
use std::hint::black_box;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use leglove_core::analyzer::normalizer::lowercase_into;
use leglove_core::analyzer::{rules, Normalizer, WordTokenizer};

const RUNS: u32 = 5;

const STAGES: [&str; 3] = ["substitute", "tokenize", "pipeline"];

/// Timing of one stage, averaged over [`RUNS`] after a warmup run.
struct Report {
    stage: &'static str,
    bytes: usize,
    elapsed: Duration,
    /// Tokens or placeholders produced by one run.
    produced: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        let mib = self.bytes as f64 / (1024.0 * 1024.0);
        write!(
            f,
            "{:<11} {:>9.3} s {:>10.1} MiB/s {:>12} out {:>14.0} out/s",
            self.stage,
            secs,
            mib / secs,
            self.produced,
            self.produced as f64 / secs
        )
    }
}

fn time<F: FnMut() -> usize>(stage: &'static str, bytes: usize, mut run: F) -> Report {
    black_box(run());

    let mut produced = 0;
    let start = Instant::now();
    for _ in 0..RUNS {
        produced = black_box(run());
    }

    Report {
        stage,
        bytes,
        elapsed: start.elapsed() / RUNS,
        produced,
    }
}

fn run_stage(stage: &'static str, input: &str, lowered: &str) -> Report {
    let tokenizer = WordTokenizer::default();
    let normalizer = Normalizer::default();

    match stage {
        "substitute" => time(stage, input.len(), || {
            let substitution = rules().segment(input);
            black_box(substitution.to_text());
            substitution.replacements()
        }),
        "tokenize" => time(stage, input.len(), || tokenizer.iter(lowered).count()),
        _ => time(stage, input.len(), || {
            let mut n = 0;
            normalizer.normalize_with(input, |_| n += 1);
            n
        }),
    }
}

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: citation_bench <path> [substitute|tokenize|pipeline]");
    };
    let selected: Vec<&'static str> = match args.next() {
        None => STAGES.to_vec(),
        Some(name) => match STAGES.iter().find(|s| **s == name) {
            Some(stage) => vec![*stage],
            None => bail!("unknown stage {name:?}"),
        },
    };

    let input = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let mut lowered = String::with_capacity(input.len());
    lowercase_into(&input, &mut lowered);

    println!("{path}: {} bytes", input.len());
    println!("matches: {}", rules().count_matches(&input));

    for stage in selected {
        println!("{}", run_stage(stage, &input, &lowered));
    }
    Ok(())
}
