//! Citation rule table.
//!
//! Each [`NormalizationRule`] pairs a case-insensitive pattern with the
//! [`Placeholder`] that replaces its matches. The table is ordered: rules run
//! one after another, each pass scanning what the previous passes left, so an
//! earlier rule always wins over a later one on overlapping text.
//!
//! ```text
//! 410 U.S. 113, 164 (1973)                -> JUDICIAL_OPINION_CITATION
//! <a class="footnote" ...>3</a>           -> FOOTNOTE
//! <i>Id.,</i> at 12-14                    -> ID_CITATION
//! § 230(c)(1) and (2)                     -> LAW_CITATION
//! <span class="star-pagination">*5</span> -> STAR_PAGINATION
//! ```
//!
//! ## Segments
//!
//! Substitution does not rewrite a string pass by pass. It keeps the input as
//! a list of segments: slices of source text no rule has matched yet, and the
//! placeholders inserted so far. Each pass searches a view in which every
//! inserted placeholder is written out as its literal. A match may enclose a
//! placeholder (a footnote anchor whose label is a citation) but may never
//! start or end on one, so a placeholder is never extended or split. A match
//! enclosing placeholders collapses into the one inserted first. Words of the
//! input that already spell a placeholder follow the same rule, which keeps
//! normalized text stable under a second run.

use core::ops::Range;
use std::borrow::Cow;

use leglove_types::{Placeholder, PlaceholderCounts};
use memchr::memchr;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};
use smallvec::SmallVec;

/// Reporter abbreviations recognized inside a judicial opinion citation.
///
/// Alternation is leftmost-first, so a shorter entry listed before a longer
/// one wins whenever the rest of the citation still matches after it.
pub const FEDERAL_COURT_REPORTERS: [&str; 17] = [
    "U.S.",
    "S.Ct.",
    "L.E.",
    "L.E. 2d",
    "L.Ed.2d",
    "F.",
    "F.2d",
    "F.3d",
    "F. App'x",
    "Fed. Cl.",
    "F. Supp.",
    "F. Supp.2d",
    "F.R.D.",
    "B.R.",
    "T.C.",
    "Vet. App.",
    "M.J.",
];

const STAR_PAGINATION: &str = r#"<span class="star-pagination">\*\d+</span>"#;

const LAW_CITATION: &str =
    r"§{1,2} ?[\w.]+(?: ?\([a-z]+\)(?: ?\(\d+\)(?: (?:and|or) \(\d+\))?)?)?";

const ID_CITATION: &str = r"(<i>id\.,</i> at \d+(?:-\d+)?)";

const FOOTNOTE: &str = r#"<a class="footnote" href="([\w#?]+)" id="(\w+)">(\w+)</a>"#;

// Pin cite: `, 164`, `, 12-14`, `, 150 & n. 4`.
const PAGE_NUMBER: &str = r"(?:, ((?:\d+(?:-\d+)?)(?:(?: &)? n\. \d+)? ?))";
const YEAR: &str = r"(?: ?(?:, )?(\(\d\d\d\d\)))";
const PAGE_SUFFIX: &str = r"( ?n\. \d+)?";

fn judicial_opinion_citation() -> String {
    let reporters = FEDERAL_COURT_REPORTERS
        .iter()
        .map(|r| regex::escape(r))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(\d+) ({reporters}) (?:at )?(\d+){PAGE_NUMBER}?{YEAR}?{PAGE_SUFFIX}")
}

/// One ordered substitution: every match of `pattern` becomes `placeholder`.
#[derive(Debug, Clone)]
pub struct NormalizationRule {
    placeholder: Placeholder,
    pattern: Regex,
    required: Option<u8>,
}

impl NormalizationRule {
    /// Compiles a case-insensitive rule.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `pattern` does not compile.
    pub fn new(placeholder: Placeholder, pattern: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            placeholder,
            pattern,
            required: None,
        })
    }

    /// Declares a byte every match contains. Text without it is skipped
    /// without running the regex.
    #[must_use]
    pub fn with_required_byte(mut self, byte: u8) -> Self {
        self.required = Some(byte);
        self
    }

    /// Returns `false` when the rule cannot match anywhere in `text`.
    #[inline]
    fn may_match(&self, text: &str) -> bool {
        self.required
            .map_or(true, |b| memchr(b, text.as_bytes()).is_some())
    }

    /// The placeholder this rule inserts.
    #[inline]
    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    /// The replacement literal, i.e. `placeholder().as_str()`.
    #[inline]
    pub fn replacement_token(&self) -> &'static str {
        self.placeholder.as_str()
    }

    /// The compiled pattern.
    #[inline]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Replaces every match in `text` with the placeholder literal, in isolation
    /// from the rest of the table.
    #[inline]
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern
            .replace_all(text, NoExpand(self.placeholder.as_str()))
    }
}

/// One match of one rule, with the byte spans of its capture groups.
///
/// All spans are offsets into the text handed to [`RuleSet::find_matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Placeholder the match became. A match enclosing an earlier
    /// placeholder reports that placeholder rather than its own rule's.
    pub placeholder: Placeholder,
    /// Byte span of the whole match.
    pub span: Range<usize>,
    /// Spans of capture groups 1..n; `None` for a group that did not participate.
    pub captures: SmallVec<[Option<Range<usize>>; 6]>,
}

impl RuleMatch {
    /// Text of capture group `group` (1-based), if it participated.
    pub fn capture<'t>(&self, source: &'t str, group: usize) -> Option<&'t str> {
        let span = self.captures.get(group.checked_sub(1)?)?.clone()?;
        source.get(span)
    }
}

/// A piece of substituted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    /// Source text left as it was.
    Text(&'t str),
    /// A match replaced by its placeholder.
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, Copy)]
enum Piece {
    /// Source bytes `start..end` no rule has matched yet.
    Text { start: usize, end: usize },
    /// Source bytes `start..end` replaced by `kind` during pass `pass`.
    Replaced {
        kind: Placeholder,
        start: usize,
        end: usize,
        pass: usize,
    },
}

impl Piece {
    #[inline]
    fn source_range(&self) -> Range<usize> {
        match *self {
            Piece::Text { start, end } | Piece::Replaced { start, end, .. } => start..end,
        }
    }
}

/// Result of running a [`RuleSet`] over one text.
#[derive(Debug, Clone)]
pub struct Substitution<'t> {
    source: &'t str,
    pieces: Vec<Piece>,
}

impl<'t> Substitution<'t> {
    /// Segments in reading order.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'t>> + '_ {
        let source = self.source;
        self.pieces.iter().map(move |piece| match *piece {
            Piece::Text { start, end } => Segment::Text(&source[start..end]),
            Piece::Replaced { kind, .. } => Segment::Placeholder(kind),
        })
    }

    /// Number of placeholders inserted.
    pub fn replacements(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| matches!(p, Piece::Replaced { .. }))
            .count()
    }

    /// Placeholders inserted, per kind.
    pub fn counts(&self) -> PlaceholderCounts {
        let mut counts = PlaceholderCounts::default();
        for piece in &self.pieces {
            if let Piece::Replaced { kind, .. } = *piece {
                counts.add(kind, 1);
            }
        }
        counts
    }

    /// The substituted text. Borrows the input when nothing was replaced.
    pub fn to_text(&self) -> Cow<'t, str> {
        if self.replacements() == 0 {
            return Cow::Borrowed(self.source);
        }

        let mut out = String::with_capacity(self.source.len());
        for segment in self.segments() {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => out.push_str(p.as_str()),
            }
        }
        Cow::Owned(out)
    }
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte ranges of whole words in `text` that spell a placeholder literal.
fn placeholder_words(text: &str) -> Vec<Range<usize>> {
    let mut words = Vec::new();
    let mut run_start: Option<usize> = None;

    let ends = text
        .char_indices()
        .chain(core::iter::once((text.len(), ' ')));

    for (i, ch) in ends {
        if is_word_char(ch) {
            run_start.get_or_insert(i);
            continue;
        }
        let Some(rs) = run_start.take() else { continue };
        if Placeholder::from_token(&text[rs..i]).is_some() {
            words.push(rs..i);
        }
    }
    words
}

/// A stretch of the search view a match may enclose but never cut into.
#[derive(Debug, Clone)]
struct Mark {
    view: Range<usize>,
    /// Placeholder and pass of an inserted piece; `None` for a word of the
    /// input that spells a placeholder.
    inserted: Option<(Placeholder, usize)>,
}

/// The text one pass searches: unmatched source text with every inserted
/// placeholder written out as its literal.
struct View<'t> {
    text: Cow<'t, str>,
    /// View range of each piece, in order.
    spans: Vec<(Range<usize>, Piece)>,
    marks: Vec<Mark>,
}

impl<'t> View<'t> {
    fn build(source: &'t str, pieces: &[Piece], words: &[Range<usize>]) -> Self {
        let replaced = pieces.iter().any(|p| matches!(p, Piece::Replaced { .. }));
        let mut text = String::new();
        let mut spans = Vec::with_capacity(pieces.len());
        let mut marks = Vec::new();
        let mut word = words.iter().peekable();
        let mut at = 0usize;

        for piece in pieces {
            let len = match *piece {
                Piece::Text { start, end } => {
                    while let Some(w) = word.next_if(|w| w.start < end) {
                        if w.start >= start && w.end <= end {
                            let offset = at + (w.start - start);
                            marks.push(Mark {
                                view: offset..offset + w.len(),
                                inserted: None,
                            });
                        }
                    }
                    if replaced {
                        text.push_str(&source[start..end]);
                    }
                    end - start
                }
                Piece::Replaced { kind, pass, .. } => {
                    let literal = kind.as_str();
                    text.push_str(literal);
                    marks.push(Mark {
                        view: at..at + literal.len(),
                        inserted: Some((kind, pass)),
                    });
                    literal.len()
                }
            };
            spans.push((at..at + len, *piece));
            at += len;
        }

        // Without replacements the pieces tile the source unchanged.
        let text = if replaced {
            Cow::Owned(text)
        } else {
            Cow::Borrowed(source)
        };
        View { text, spans, marks }
    }

    /// Maps a view offset on a match or group boundary back to the source.
    fn to_source(&self, v: usize) -> usize {
        let i = self.spans.partition_point(|(r, _)| r.start <= v).saturating_sub(1);
        match self.spans.get(i) {
            Some((r, Piece::Text { start, end })) => (start + (v - r.start)).min(*end),
            Some((r, Piece::Replaced { start, end, .. })) => {
                if v >= r.end {
                    *end
                } else {
                    *start
                }
            }
            None => v,
        }
    }

    fn range_to_source(&self, r: Range<usize>) -> Range<usize> {
        self.to_source(r.start)..self.to_source(r.end)
    }
}

/// How a candidate match relates to the marks it overlaps.
enum Fit {
    /// Encloses no inserted placeholder.
    Free,
    /// Encloses inserted placeholders; takes the one from the earliest pass.
    Fold(Placeholder, usize),
    /// Starts or ends on a mark; searching resumes at the given view offset.
    Blocked(usize),
}

fn fit(span: &Range<usize>, marks: &[Mark]) -> Fit {
    let mut fold: Option<(Placeholder, usize)> = None;
    for mark in marks {
        if mark.view.start >= span.end {
            break;
        }
        if mark.view.end <= span.start {
            continue;
        }
        if mark.view.start <= span.start || mark.view.end >= span.end {
            return Fit::Blocked(mark.view.end);
        }
        if let Some((kind, pass)) = mark.inserted {
            if fold.map_or(true, |(_, p)| pass < p) {
                fold = Some((kind, pass));
            }
        }
    }
    match fold {
        Some((kind, pass)) => Fit::Fold(kind, pass),
        None => Fit::Free,
    }
}

/// Ordered, immutable rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<NormalizationRule>,
}

static STANDARD: Lazy<RuleSet> = Lazy::new(RuleSet::build_standard);

/// The process-wide standard rule table.
#[inline]
pub fn rules() -> &'static RuleSet {
    &STANDARD
}

impl RuleSet {
    /// Builds a table from rules in the order given.
    pub fn new(rules: Vec<NormalizationRule>) -> Self {
        Self { rules }
    }

    /// The shared standard table: judicial citation, footnote, Id. citation,
    /// law citation, star pagination.
    #[inline]
    pub fn standard() -> &'static RuleSet {
        rules()
    }

    #[allow(clippy::expect_used)]
    fn build_standard() -> RuleSet {
        let judicial = judicial_opinion_citation();
        // Every reporter contains a period; `§` encodes as C2 A7.
        let table = [
            (Placeholder::JudicialOpinionCitation, judicial.as_str(), b'.'),
            (Placeholder::Footnote, FOOTNOTE, b'<'),
            (Placeholder::IdCitation, ID_CITATION, b'<'),
            (Placeholder::LawCitation, LAW_CITATION, 0xA7),
            (Placeholder::StarPagination, STAR_PAGINATION, b'<'),
        ];

        let rules = table
            .into_iter()
            .map(|(placeholder, pattern, required)| {
                NormalizationRule::new(placeholder, pattern)
                    .expect("built-in citation pattern must compile")
                    .with_required_byte(required)
            })
            .collect();

        RuleSet { rules }
    }

    /// Rules in application order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, NormalizationRule> {
        self.rules.iter()
    }

    /// Number of rules.
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the table holds no rules.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule in order and returns the resulting segments.
    pub fn segment<'t>(&self, text: &'t str) -> Substitution<'t> {
        self.run(text, None)
    }

    /// Runs every rule in order and returns the substituted text.
    pub fn substitute<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.segment(text).to_text()
    }

    /// Reports every match of every rule, in application order.
    pub fn find_matches(&self, text: &str) -> Vec<RuleMatch> {
        let mut found = Vec::new();
        self.run(text, Some(&mut found));
        found
    }

    /// Counts matches per placeholder kind.
    pub fn count_matches(&self, text: &str) -> PlaceholderCounts {
        self.segment(text).counts()
    }

    fn run<'t>(&self, text: &'t str, mut record: Option<&mut Vec<RuleMatch>>) -> Substitution<'t> {
        let words = placeholder_words(text);
        let mut pieces = if text.is_empty() {
            Vec::new()
        } else {
            vec![Piece::Text {
                start: 0,
                end: text.len(),
            }]
        };

        for (pass, rule) in self.rules.iter().enumerate() {
            let view = View::build(text, &pieces, &words);
            let haystack: &str = &view.text;
            if !rule.may_match(haystack) {
                continue;
            }

            // (source span, placeholder, pass) of every accepted match.
            let mut accepted: Vec<(Range<usize>, Placeholder, usize)> = Vec::new();
            let mut first_mark = 0usize;
            let mut pos = 0usize;

            while pos <= haystack.len() {
                let caps = match record {
                    Some(_) => match rule.pattern.captures_at(haystack, pos) {
                        Some(caps) => Some(caps),
                        None => break,
                    },
                    None => None,
                };
                let span = match &caps {
                    Some(caps) => caps.get(0).map(|m| m.range()),
                    None => rule.pattern.find_at(haystack, pos).map(|m| m.range()),
                };
                let Some(span) = span else { break };

                if span.is_empty() {
                    pos = haystack[span.end..]
                        .chars()
                        .next()
                        .map_or(haystack.len() + 1, |c| span.end + c.len_utf8());
                    continue;
                }

                while view.marks.get(first_mark).is_some_and(|m| m.view.end <= span.start) {
                    first_mark += 1;
                }
                let (kind, kind_pass) = match fit(&span, &view.marks[first_mark..]) {
                    Fit::Blocked(resume) => {
                        pos = resume;
                        continue;
                    }
                    Fit::Free => (rule.placeholder, pass),
                    Fit::Fold(kind, p) => (kind, p),
                };

                let source_span = view.range_to_source(span.clone());
                if let (Some(found), Some(caps)) = (record.as_deref_mut(), &caps) {
                    found.push(RuleMatch {
                        placeholder: kind,
                        span: source_span.clone(),
                        captures: caps
                            .iter()
                            .skip(1)
                            .map(|g| g.map(|m| view.range_to_source(m.range())))
                            .collect(),
                    });
                }
                accepted.push((source_span, kind, kind_pass));
                pos = span.end;
            }

            if !accepted.is_empty() {
                pieces = splice(&pieces, &accepted);
            }
        }

        Substitution {
            source: text,
            pieces,
        }
    }
}

/// Rebuilds the piece list with every accepted match collapsed into one
/// placeholder. Placeholders a match encloses disappear into it.
fn splice(pieces: &[Piece], accepted: &[(Range<usize>, Placeholder, usize)]) -> Vec<Piece> {
    let mut out = Vec::with_capacity(pieces.len() + 2 * accepted.len());
    let mut next = accepted.iter().peekable();
    let mut covered = 0usize;

    for piece in pieces {
        let range = piece.source_range();
        if let Piece::Replaced { .. } = piece {
            if range.end > covered {
                out.push(*piece);
            }
            continue;
        }

        let mut cursor = range.start.max(covered);
        while let Some((span, kind, pass)) = next.next_if(|(span, _, _)| span.start < range.end) {
            if span.start > cursor {
                out.push(Piece::Text {
                    start: cursor,
                    end: span.start,
                });
            }
            out.push(Piece::Replaced {
                kind: *kind,
                start: span.start,
                end: span.end,
                pass: *pass,
            });
            covered = span.end;
            cursor = span.end;
        }
        if cursor < range.end {
            out.push(Piece::Text {
                start: cursor,
                end: range.end,
            });
        }
    }
    out
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a NormalizationRule;
    type IntoIter = core::slice::Iter<'a, NormalizationRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
