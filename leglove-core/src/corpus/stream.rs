//! Lazy traversal of a `root/<group>/<document>.<ext>` corpus.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::vec;

use leglove_types::{LoadErrorPolicy, StreamConfig, TokenSequence};
use tracing::{debug, warn};

use crate::analyzer::Normalizer;
use crate::corpus::loader::{DocumentLoader, JsonOpinionLoader};
use crate::corpus::progress::{CorpusProgress, LogProgress, ProgressObserver};
use crate::error::{CorpusError, Result};

/// Opens `root` with the JSON opinion loader and default settings.
pub fn stream(root: impl AsRef<Path>) -> Result<CorpusStream<JsonOpinionLoader>> {
    CorpusStream::open(root, JsonOpinionLoader::new(), StreamConfig::default())
}

/// Pull-based iterator yielding one normalized token sequence per document.
///
/// Only directory listings are held between calls to `next`; each document's
/// text lives for a single normalization. Entries are visited in file name
/// order, so opening the same root twice yields the same sequence. The
/// stream is fused: after it returns an error or `None`, every later call
/// returns `None`.
///
/// # Examples
///
/// ```no_run
/// let corpus = CorpusStream::open("opinions", JsonOpinionLoader::new(), StreamConfig::default())?;
/// for tokens in corpus {
///     let tokens = tokens?;
///     println!("{}", tokens.join(" "));
/// }
/// ```
pub struct CorpusStream<L, P = LogProgress> {
    loader: L,
    observer: P,
    normalizer: Normalizer<'static>,
    config: StreamConfig,
    groups: vec::IntoIter<PathBuf>,
    documents: vec::IntoIter<PathBuf>,
    progress: CorpusProgress,
    done: bool,
}

impl<L: DocumentLoader> CorpusStream<L, LogProgress> {
    /// Lists the groups under `root`.
    ///
    /// Fails if `root` cannot be listed. Nothing else is read until the
    /// first call to `next`.
    pub fn open(root: impl AsRef<Path>, loader: L, config: StreamConfig) -> Result<Self> {
        let root = root.as_ref();
        let groups = sorted_entries(root)
            .map_err(|source| CorpusError::UnreadableDirectory {
                path: root.to_path_buf(),
                source,
            })?
            .into_iter()
            .filter(|path| !(config.skip_hidden && is_hidden(path)) && path.is_dir())
            .collect::<Vec<_>>();

        Ok(Self {
            loader,
            observer: LogProgress,
            normalizer: Normalizer::default(),
            config,
            groups: groups.into_iter(),
            documents: Vec::new().into_iter(),
            progress: CorpusProgress::default(),
            done: false,
        })
    }
}

impl<L: DocumentLoader, P: ProgressObserver> CorpusStream<L, P> {
    /// Replaces the progress observer.
    pub fn with_observer<Q: ProgressObserver>(self, observer: Q) -> CorpusStream<L, Q> {
        CorpusStream {
            loader: self.loader,
            observer,
            normalizer: self.normalizer,
            config: self.config,
            groups: self.groups,
            documents: self.documents,
            progress: self.progress,
            done: self.done,
        }
    }

    /// Replaces the normalizer applied to every document.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer<'static>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Counters so far.
    #[inline]
    pub fn progress(&self) -> &CorpusProgress {
        &self.progress
    }

    /// Groups not yet entered.
    pub fn remaining_groups(&self) -> usize {
        self.groups.len()
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            self.observer.on_finish(&self.progress);
        }
    }

    fn fail(&mut self, err: CorpusError) -> Option<Result<TokenSequence>> {
        self.finish();
        Some(Err(err))
    }

    fn enter_group(&mut self, group: &Path) -> io::Result<()> {
        let skip_hidden = self.config.skip_hidden;
        let documents = sorted_entries(group)?
            .into_iter()
            .filter(|path| {
                !(skip_hidden && is_hidden(path)) && self.loader.accepts(path) && !path.is_dir()
            })
            .collect::<Vec<_>>();
        self.documents = documents.into_iter();
        Ok(())
    }

    fn count_document(&mut self) {
        self.progress.documents += 1;
        let interval = self.config.progress_interval;
        if interval > 0 && self.progress.documents % interval == 0 {
            self.observer.on_progress(&self.progress);
        }
    }
}

impl<L: DocumentLoader, P: ProgressObserver> Iterator for CorpusStream<L, P> {
    type Item = Result<TokenSequence>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(path) = self.documents.next() else {
                let Some(group) = self.groups.next() else {
                    self.finish();
                    break;
                };
                self.progress.groups += 1;
                self.observer.on_group(&group, &self.progress);
                if let Err(source) = self.enter_group(&group) {
                    return self.fail(CorpusError::UnreadableDirectory {
                        path: group,
                        source,
                    });
                }
                continue;
            };

            self.count_document();
            match self.loader.load_text(&path) {
                Ok(text) if text.is_empty() => {
                    debug!(path = %path.display(), "skipping empty document");
                    self.progress.empty += 1;
                }
                Ok(text) => {
                    self.progress.yielded += 1;
                    return Some(Ok(self.normalizer.normalize(&text)));
                }
                Err(source) => match self.config.on_load_error {
                    LoadErrorPolicy::Skip => {
                        warn!(path = %path.display(), error = %source, "skipping unreadable document");
                        self.progress.failed += 1;
                    }
                    LoadErrorPolicy::Abort => {
                        return self.fail(CorpusError::DocumentLoad { path, source });
                    }
                },
            }
        }
        None
    }
}

impl<L: DocumentLoader, P: ProgressObserver> core::iter::FusedIterator for CorpusStream<L, P> {}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    paths.sort_unstable();
    Ok(paths)
}

#[inline]
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().first() == Some(&b'.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{TokenizerConfig, WordTokenizer};
    use crate::corpus::loader::PlainTextLoader;
    use crate::corpus::progress::NoProgress;
    use tempfile::TempDir;

    fn file(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        file(root, "g1/a.txt", b"Roe v. Wade, 410 U.S. 113 (1973).");
        file(root, "g1/b.txt", b"");
        file(root, "g1/.c.txt", b"hidden document");
        file(root, "g1/d.json", b"{\"html\": \"wrong extension\"}");
        file(root, "g2/e.txt", b"See \xc2\xa7 1983 here");
        file(root, ".hidden/f.txt", b"hidden group");
        file(root, "top.txt", b"not in a group");
        fs::create_dir_all(root.join("g3/nested.txt")).unwrap();
        dir
    }

    fn open(root: &Path, config: StreamConfig) -> CorpusStream<PlainTextLoader, NoProgress> {
        CorpusStream::open(root, PlainTextLoader::new(), config)
            .unwrap()
            .with_observer(NoProgress)
    }

    #[derive(Default)]
    struct Recorder {
        groups: Vec<String>,
        ticks: Vec<usize>,
        finished: usize,
    }

    impl ProgressObserver for Recorder {
        fn on_group(&mut self, group: &Path, _progress: &CorpusProgress) {
            let name = group.file_name().unwrap().to_string_lossy().into_owned();
            self.groups.push(name);
        }

        fn on_progress(&mut self, progress: &CorpusProgress) {
            self.ticks.push(progress.documents);
        }

        fn on_finish(&mut self, _progress: &CorpusProgress) {
            self.finished += 1;
        }
    }

    #[test]
    fn yields_only_qualifying_documents() {
        let dir = corpus();
        let mut stream = open(dir.path(), StreamConfig::default());
        let docs = stream.by_ref().collect::<Result<Vec<_>>>().unwrap();

        assert_eq!(
            docs,
            vec![
                vec!["roe", "v.", "wade", ",", "judicial_opinion_citation", "."],
                vec!["see", "law_citation", "here"],
            ]
        );
        let progress = stream.progress();
        assert_eq!(progress.groups, 3);
        assert_eq!(progress.documents, 3);
        assert_eq!(progress.yielded, 2);
        assert_eq!(progress.empty, 1);
        assert_eq!(progress.failed, 0);
    }

    #[test]
    fn empty_documents_are_skipped_not_failed() {
        let dir = TempDir::new().unwrap();
        file(dir.path(), "g/a.txt", b"");
        file(dir.path(), "g/b.txt", b"");
        let mut stream = open(dir.path(), StreamConfig::default());
        assert!(stream.next().is_none());
        assert_eq!(stream.progress().empty, 2);
        assert_eq!(stream.progress().failed, 0);
    }

    #[test]
    fn whitespace_document_yields_empty_sequence() {
        let dir = TempDir::new().unwrap();
        file(dir.path(), "g/a.txt", b" \n\t ");
        let mut stream = open(dir.path(), StreamConfig::default());
        assert_eq!(stream.next().unwrap().unwrap(), Vec::<String>::new());
        assert!(stream.next().is_none());
        assert_eq!(stream.progress().empty, 0);
        assert_eq!(stream.progress().yielded, 1);
    }

    #[test]
    fn hidden_entries_kept_when_configured() {
        let dir = corpus();
        let config = StreamConfig {
            skip_hidden: false,
            ..StreamConfig::default()
        };
        let count = open(dir.path(), config).filter(|d| d.is_ok()).count();
        assert_eq!(count, 4);
    }

    #[test]
    fn unreadable_root_fails_on_open() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = CorpusStream::open(&missing, PlainTextLoader::new(), StreamConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, CorpusError::UnreadableDirectory { .. }));
        assert_eq!(err.path(), missing.as_path());
    }

    #[test]
    fn load_failure_aborts_by_default() {
        let dir = TempDir::new().unwrap();
        file(dir.path(), "g/a.txt", b"\xff\xfe not utf-8");
        file(dir.path(), "g/b.txt", b"fine");
        let mut stream = open(dir.path(), StreamConfig::default());

        match stream.next() {
            Some(Err(CorpusError::DocumentLoad { path, .. })) => {
                assert!(path.ends_with("g/a.txt"));
            }
            other => panic!("expected load error, got {other:?}"),
        }
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn load_failure_skipped_when_resilient() {
        let dir = TempDir::new().unwrap();
        file(dir.path(), "g/a.txt", b"\xff\xfe not utf-8");
        file(dir.path(), "g/b.txt", b"fine");
        let mut stream = open(dir.path(), StreamConfig::resilient());

        let docs = stream.by_ref().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(docs, vec![vec!["fine"]]);
        assert_eq!(stream.progress().failed, 1);
        assert_eq!(stream.progress().documents, 2);
    }

    #[test]
    fn vanished_group_is_a_terminal_error() {
        let dir = TempDir::new().unwrap();
        file(dir.path(), "a/x.txt", b"first");
        file(dir.path(), "b/y.txt", b"second");
        let mut stream = open(dir.path(), StreamConfig::default());
        fs::remove_dir_all(dir.path().join("b")).unwrap();

        assert_eq!(stream.next().unwrap().unwrap(), vec!["first"]);
        assert!(matches!(
            stream.next(),
            Some(Err(CorpusError::UnreadableDirectory { .. }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn progress_signals() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            file(dir.path(), &format!("g{}/d{i}.txt", i % 2), b"text");
        }
        let config = StreamConfig {
            progress_interval: 2,
            ..StreamConfig::default()
        };
        let mut recorder = Recorder::default();
        let count = CorpusStream::open(dir.path(), PlainTextLoader::new(), config)
            .unwrap()
            .with_observer(&mut recorder)
            .count();

        assert_eq!(count, 5);
        assert_eq!(recorder.groups, vec!["g0", "g1"]);
        assert_eq!(recorder.ticks, vec![2, 4]);
        assert_eq!(recorder.finished, 1);
    }

    #[test]
    fn restartable_by_reopening() {
        let dir = corpus();
        let first = open(dir.path(), StreamConfig::default())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let second = open(dir.path(), StreamConfig::default())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dropping_early_is_harmless() {
        let dir = corpus();
        let mut recorder = Recorder::default();
        {
            let mut stream = CorpusStream::open(dir.path(), PlainTextLoader::new(), StreamConfig::default())
                .unwrap()
                .with_observer(&mut recorder);
            assert!(stream.next().is_some());
        }
        assert_eq!(recorder.finished, 0);
        assert_eq!(recorder.groups, vec!["g1"]);
    }

    #[test]
    fn custom_normalizer() {
        let dir = corpus();
        let normalizer = Normalizer::default().with_tokenizer(WordTokenizer::new(TokenizerConfig {
            keep_punctuation: false,
        }));
        let first = open(dir.path(), StreamConfig::default())
            .with_normalizer(normalizer)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(first, vec!["roe", "v.", "wade", "judicial_opinion_citation"]);
    }

    #[test]
    fn json_corpus_via_stream() {
        let dir = TempDir::new().unwrap();
        file(
            dir.path(),
            "court/1.json",
            br#"{"html_with_citations": "<i>Id.,</i> at 5", "plain_text": "ignored"}"#,
        );
        file(dir.path(), "court/2.json", br#"{"plain_text": ""}"#);
        let mut corpus = stream(dir.path()).unwrap().with_observer(NoProgress);
        assert_eq!(corpus.next().unwrap().unwrap(), vec!["id_citation"]);
        assert!(corpus.next().is_none());
        assert_eq!(corpus.progress().empty, 1);
    }
}
