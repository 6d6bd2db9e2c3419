//! Command-line front end for the legal text pipeline.
//!
//! ```bash
//! # One line of tokens per document
//! leglove tokenize /data/opinions > corpus.txt
//!
//! # Inspect a single opinion
//! leglove normalize /data/opinions/scotus/1234.json --matches
//!
//! # Co-occurrence statistics over a corpus
//! leglove cooccur /data/opinions --window 10 --top 20
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level (default `info`).

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leglove_core::analyzer::{Normalizer, TokenizerConfig, WordTokenizer};
use leglove_core::cooccur::Cooccurrence;
use leglove_core::corpus::{CorpusStream, DocumentLoader, JsonOpinionLoader, PlainTextLoader};
use leglove_core::{LoadErrorPolicy, StreamConfig, TrainerConfig};

#[derive(Parser, Debug)]
#[command(name = "leglove", version, about = "Citation-aware tokenization of legal opinions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream a corpus and print one line of tokens per document.
    Tokenize {
        /// Corpus root containing one directory per group
        root: PathBuf,
        #[command(flatten)]
        opts: CorpusOpts,
    },

    /// Normalize a single document.
    Normalize {
        /// Document to read
        file: PathBuf,
        /// Document format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Print the text after substitution instead of tokens
        #[arg(long)]
        substitute: bool,
        /// Print every rule match with its capture groups
        #[arg(long)]
        matches: bool,
        /// Drop tokens without letters or digits
        #[arg(long)]
        drop_punctuation: bool,
    },

    /// Accumulate co-occurrence counts over a corpus and print statistics.
    Cooccur {
        /// Corpus root containing one directory per group
        root: PathBuf,
        #[command(flatten)]
        opts: CorpusOpts,
        /// Symmetric context window
        #[arg(long, default_value_t = TrainerConfig::default().window)]
        window: usize,
        /// Print the strongest pairs
        #[arg(long, default_value_t = 0)]
        top: usize,
    },
}

#[derive(Args, Debug)]
struct CorpusOpts {
    /// Document format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
    /// Log and skip documents that cannot be loaded
    #[arg(long)]
    skip_errors: bool,
    /// Documents between progress lines
    #[arg(long, default_value_t = StreamConfig::default().progress_interval)]
    progress_interval: usize,
    /// Include entries whose name starts with a dot
    #[arg(long)]
    include_hidden: bool,
    /// Drop tokens without letters or digits
    #[arg(long)]
    drop_punctuation: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    /// Opinion records as JSON objects
    Json,
    /// UTF-8 text files
    Txt,
}

impl Format {
    fn loader(self) -> Box<dyn DocumentLoader> {
        match self {
            Format::Json => Box::new(JsonOpinionLoader::new()),
            Format::Txt => Box::new(PlainTextLoader::new()),
        }
    }
}

impl CorpusOpts {
    fn config(&self) -> StreamConfig {
        StreamConfig {
            progress_interval: self.progress_interval,
            on_load_error: if self.skip_errors {
                LoadErrorPolicy::Skip
            } else {
                LoadErrorPolicy::Abort
            },
            skip_hidden: !self.include_hidden,
        }
    }
}

fn normalizer(drop_punctuation: bool) -> Normalizer<'static> {
    Normalizer::default().with_tokenizer(WordTokenizer::new(TokenizerConfig {
        keep_punctuation: !drop_punctuation,
    }))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tokenize { root, opts } => cmd_tokenize(&root, &opts),
        Commands::Normalize {
            file,
            format,
            substitute,
            matches,
            drop_punctuation,
        } => cmd_normalize(&file, format, substitute, matches, drop_punctuation),
        Commands::Cooccur {
            root,
            opts,
            window,
            top,
        } => cmd_cooccur(&root, &opts, window, top),
    }
}

fn cmd_tokenize(root: &Path, opts: &CorpusOpts) -> Result<()> {
    let loader = opts.format.loader();
    let corpus = CorpusStream::open(root, loader.as_ref(), opts.config())
        .with_context(|| format!("opening corpus {}", root.display()))?
        .with_normalizer(normalizer(opts.drop_punctuation));

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for tokens in corpus {
        let tokens = tokens?;
        writeln!(out, "{}", tokens.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_normalize(
    file: &Path,
    format: Format,
    substitute: bool,
    matches: bool,
    drop_punctuation: bool,
) -> Result<()> {
    let text = format
        .loader()
        .load_text(file)
        .with_context(|| format!("loading {}", file.display()))?;
    let normalizer = normalizer(drop_punctuation);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if matches {
        let found = normalizer.rules().find_matches(&text);
        for m in &found {
            write!(out, "{}\t{}..{}\t{}", m.placeholder, m.span.start, m.span.end, &text[m.span.clone()])?;
            for group in 1..=m.captures.len() {
                if let Some(capture) = m.capture(&text, group) {
                    write!(out, "\t${group}={capture}")?;
                }
            }
            writeln!(out)?;
        }
        info!(counts = %normalizer.rules().count_matches(&text), "{} matches", found.len());
    }

    if substitute {
        writeln!(out, "{}", normalizer.substitute(&text))?;
    } else if !matches {
        writeln!(out, "{}", normalizer.normalize(&text).join(" "))?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_cooccur(root: &Path, opts: &CorpusOpts, window: usize, top: usize) -> Result<()> {
    let loader = opts.format.loader();
    let corpus = CorpusStream::open(root, loader.as_ref(), opts.config())
        .with_context(|| format!("opening corpus {}", root.display()))?
        .with_normalizer(normalizer(opts.drop_punctuation));

    let matrix = Cooccurrence::try_fit(corpus, window)?;
    let stats = matrix.stats();
    println!("{stats}");
    println!("~{} bytes", stats.memory_usage_bytes());

    if top > 0 {
        let mut entries = matrix.sorted_entries();
        entries.sort_by(|a, b| b.2.total_cmp(&a.2));
        for (row, col, weight) in entries.into_iter().take(top) {
            let a = matrix.word(row).unwrap_or("?");
            let b = matrix.word(col).unwrap_or("?");
            println!("{weight:>12.3}  {a} {b}");
        }
    }
    Ok(())
}
