/* 📖 # Why a linear scan instead of an index?

The corpus is small and fixed (a few thousand verses), so a full scan per
query is fast enough and keeps results trivially consistent with the data.
Every search walks the book in chapter then verse order and never stops
early; that order is the result order, there is no relevance ranking.

A query is compiled once into a Matcher. Both sides of a comparison go
through the same preparation:

- with `normalize`, the text normalizer (which includes case folding)
- without it, whitespace collapsing plus lowercasing unless `case_sensitive`

Substring mode looks for the prepared query inside the prepared verse text.
Exact mode compares it against single prepared tokens after punctuation is
trimmed from both, so an exact query containing whitespace is rejected
rather than silently matching nothing. Primary-text matches also report which tokens took part
in the match so clients can highlight them.
*/

use std::collections::{BTreeMap, BTreeSet};

use mushaf_base::{MushafError, MushafResult};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::corpus::{Location, Verse};
use crate::library::Library;
use crate::normalize::{normalize, strip_punctuation};

/// Whether a query must equal a whole token or may occur anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    #[default]
    Substring,
}

impl MatchMode {
    pub fn parse(mode: &str) -> MushafResult<Self> {
        match mode {
            "exact" => Ok(MatchMode::Exact),
            "substring" => Ok(MatchMode::Substring),
            other => Err(Box::new(MushafError::invalid_argument(
                format!("Unknown match mode '{}'", other),
                vec!["exact".to_string(), "substring".to_string()],
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Substring => "substring",
        }
    }
}

/// Which text a search runs over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetField {
    #[default]
    Primary,
    Translation(String),
}

/// Options controlling a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub match_mode: MatchMode,
    /// Apply the text normalizer to query and candidates. Implies case folding.
    pub normalize: bool,
    /// Only consulted when `normalize` is off.
    pub case_sensitive: bool,
    pub target: TargetField,
    /// Attach the primary verse text to translation matches.
    pub attach_primary: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            normalize: true,
            case_sensitive: false,
            target: TargetField::default(),
            attach_primary: true,
        }
    }
}

impl SearchOptions {
    pub fn exact() -> Self {
        Self::default().with_match_mode(MatchMode::Exact)
    }

    pub fn substring() -> Self {
        Self::default().with_match_mode(MatchMode::Substring)
    }

    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_translation(mut self, key: impl Into<String>) -> Self {
        self.target = TargetField::Translation(key.into());
        self
    }

    pub fn with_attach_primary(mut self, attach_primary: bool) -> Self {
        self.attach_primary = attach_primary;
        self
    }
}

/// A token of a matched verse that satisfied the match predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMatch<'a> {
    pub position: u32,
    pub text: &'a str,
    pub location: Location,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord<'a> {
    pub location: Location,
    /// Text the match was found in: the primary verse or the translated verse.
    pub text: &'a str,
    /// Translation key, for matches found in translation text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<&'a str>,
    /// Primary verse text attached to a translation match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenMatch<'a>>,
}

/// A window over a complete result list.
///
/// The full list is always computed first, so `total` is exact and
/// `has_more` tells whether items exist past this window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPage<T> {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub items: Vec<T>,
}

impl<T> SearchPage<T> {
    pub fn new(matches: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = matches.len();
        let items: Vec<T> = matches.into_iter().skip(offset).take(limit).collect();
        let has_more = offset.saturating_add(items.len()) < total;
        Self {
            total,
            offset,
            limit,
            has_more,
            items,
        }
    }
}

/// Bring text into comparison form according to the options.
fn prepare_text(text: &str, normalize_text: bool, case_sensitive: bool) -> String {
    if normalize_text {
        return normalize(text);
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if case_sensitive {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

/// A compiled query.
#[derive(Debug, Clone)]
pub(crate) struct Matcher {
    needle: String,
    mode: MatchMode,
    normalize: bool,
    case_sensitive: bool,
}

impl Matcher {
    pub(crate) fn new(query: &str, options: &SearchOptions) -> MushafResult<Self> {
        if query.trim().is_empty() {
            return Err(Box::new(MushafError::invalid_argument(
                "Search query must not be empty",
                Vec::new(),
            )));
        }
        let prepared = prepare_text(query, options.normalize, options.case_sensitive);
        let needle = match options.match_mode {
            MatchMode::Exact => strip_punctuation(&prepared).into_owned(),
            MatchMode::Substring => prepared,
        };
        if needle.is_empty() {
            return Err(Box::new(MushafError::invalid_argument(
                format!("Search query '{}' contains no searchable text", query),
                Vec::new(),
            )));
        }
        if options.match_mode == MatchMode::Exact && needle.contains(' ') {
            return Err(Box::new(MushafError::invalid_argument(
                format!("Exact search matches single words, got '{}'", query),
                vec![MatchMode::Substring.as_str().to_string()],
            )));
        }
        Ok(Self {
            needle,
            mode: options.match_mode,
            normalize: options.normalize,
            case_sensitive: options.case_sensitive,
        })
    }

    /// Compile a batch of queries; an empty batch is rejected.
    pub(crate) fn compile_all<S: AsRef<str>>(
        queries: &[S],
        options: &SearchOptions,
    ) -> MushafResult<Vec<Self>> {
        if queries.is_empty() {
            return Err(Box::new(MushafError::invalid_argument(
                "At least one search query is required",
                Vec::new(),
            )));
        }
        queries
            .iter()
            .map(|query| Matcher::new(query.as_ref(), options))
            .collect()
    }

    fn prepare(&self, text: &str) -> String {
        prepare_text(text, self.normalize, self.case_sensitive)
    }

    /// Whether a whole untokenized text (e.g. a translated verse) matches.
    pub(crate) fn matches_text(&self, text: &str) -> bool {
        let prepared = self.prepare(text);
        match self.mode {
            MatchMode::Substring => prepared.contains(self.needle.as_str()),
            MatchMode::Exact => prepared
                .split(' ')
                .any(|token| strip_punctuation(token) == self.needle.as_str()),
        }
    }

    /// Add the positions of the verse tokens that satisfy this query.
    pub(crate) fn collect_positions(&self, verse: &Verse, positions: &mut BTreeSet<u32>) {
        let prepared: Vec<(u32, String)> = verse
            .tokens()
            .map(|token| (token.position(), self.prepare(token.text)))
            .filter(|(_, text)| !text.is_empty())
            .collect();

        match self.mode {
            MatchMode::Exact => {
                for (position, text) in &prepared {
                    if strip_punctuation(text) == self.needle.as_str() {
                        positions.insert(*position);
                    }
                }
            }
            MatchMode::Substring => {
                let mut joined = String::new();
                let mut spans = Vec::with_capacity(prepared.len());
                for (position, text) in &prepared {
                    if !joined.is_empty() {
                        joined.push(' ');
                    }
                    let start = joined.len();
                    joined.push_str(text);
                    spans.push((*position, start, joined.len()));
                }
                // Occurrences may overlap, so resume one char after each hit's start.
                let mut from = 0;
                while let Some(offset) = joined[from..].find(self.needle.as_str()) {
                    let start = from + offset;
                    let end = start + self.needle.len();
                    for (position, span_start, span_end) in &spans {
                        if *span_start < end && start < *span_end {
                            positions.insert(*position);
                        }
                    }
                    from = start + joined[start..].chars().next().map_or(1, char::len_utf8);
                }
            }
        }
    }
}

/// Full-text search over the primary text and, by delegation, translations.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    library: Library,
}

impl SearchEngine {
    pub fn new(library: Library) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Search for a single query.
    pub fn search(&self, query: &str, options: &SearchOptions) -> MushafResult<Vec<MatchRecord<'_>>> {
        self.search_batch(&[query], options)
    }

    /// Search for several queries at once.
    ///
    /// Each verse appears at most once, carrying the union of the tokens
    /// matched by any of the queries.
    #[instrument(skip_all, fields(queries = queries.len(), mode = options.match_mode.as_str(), target = ?options.target))]
    pub fn search_batch<S: AsRef<str>>(
        &self,
        queries: &[S],
        options: &SearchOptions,
    ) -> MushafResult<Vec<MatchRecord<'_>>> {
        let results = match &options.target {
            TargetField::Primary => self.search_primary(queries, options)?,
            TargetField::Translation(key) => self.library.translations().search_in_translation(
                self.library.book(),
                key,
                queries,
                options,
            )?,
        };
        debug!(matches = results.len(), "search complete");
        Ok(results)
    }

    fn search_primary<S: AsRef<str>>(
        &self,
        queries: &[S],
        options: &SearchOptions,
    ) -> MushafResult<Vec<MatchRecord<'_>>> {
        let matchers = Matcher::compile_all(queries, options)?;
        let mut results = Vec::new();
        for verse in self.library.book().verses() {
            let mut positions = BTreeSet::new();
            for matcher in &matchers {
                matcher.collect_positions(verse, &mut positions);
            }
            if positions.is_empty() {
                continue;
            }
            let tokens: BTreeMap<u32, &str> = verse
                .tokens()
                .filter(|token| positions.contains(&token.position()))
                .map(|token| (token.position(), token.text))
                .collect();
            results.push(MatchRecord {
                location: verse.location(),
                text: verse.text(),
                translation: None,
                primary: None,
                tokens: tokens
                    .into_iter()
                    .map(|(position, text)| TokenMatch {
                        position,
                        text,
                        location: Location::token(verse.chapter(), verse.number(), position),
                    })
                    .collect(),
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Book, Chapter};
    use crate::test_fixtures::sample_library;
    use crate::translation::TranslationStore;
    use std::sync::Arc;

    fn engine_for(verses: &[&str]) -> SearchEngine {
        let verses = verses
            .iter()
            .zip(1u32..)
            .map(|(text, number)| Verse::new(1, number, *text))
            .collect();
        let book = Book::new("test", vec![Chapter::new(1, "one", verses)]).unwrap();
        SearchEngine::new(Library::new(Arc::new(book), Arc::new(TranslationStore::default())))
    }

    fn locations(records: &[MatchRecord]) -> Vec<String> {
        records.iter().map(|r| r.location.to_string()).collect()
    }

    fn positions(record: &MatchRecord) -> Vec<u32> {
        record.tokens.iter().map(|t| t.position).collect()
    }

    #[test]
    fn test_raw_substring_reports_matching_token() {
        let engine = engine_for(&["test word", "another verse"]);
        let options = SearchOptions::substring().with_normalize(false);
        let results = engine.search("test", &options).unwrap();

        assert_eq!(locations(&results), vec!["1:1"]);
        assert_eq!(results[0].tokens.len(), 1);
        assert_eq!(results[0].tokens[0].text, "test");
        assert_eq!(results[0].tokens[0].location.to_string(), "1:1:1");
    }

    #[test]
    fn test_exact_is_case_insensitive_and_rejects_longer_words() {
        let engine = engine_for(&["a test here", "testing again"]);
        let raw = SearchOptions::exact().with_normalize(false);
        let results = engine.search("TEST", &raw).unwrap();
        assert_eq!(locations(&results), vec!["1:1"]);
        assert_eq!(positions(&results[0]), vec![2]);

        let results = engine.search("TEST", &SearchOptions::exact()).unwrap();
        assert_eq!(locations(&results), vec!["1:1"]);
    }

    #[test]
    fn test_case_sensitive_raw_search() {
        let engine = engine_for(&["a test here", "A Test Here"]);
        let options = SearchOptions::exact()
            .with_normalize(false)
            .with_case_sensitive(true);
        assert_eq!(locations(&engine.search("Test", &options).unwrap()), vec!["1:2"]);
        assert!(engine.search("TEST", &options).unwrap().is_empty());
    }

    #[test]
    fn test_exact_ignores_token_punctuation() {
        let engine = engine_for(&["first, (test). last", "contest"]);
        let results = engine.search("test", &SearchOptions::exact()).unwrap();
        assert_eq!(locations(&results), vec!["1:1"]);
        assert_eq!(results[0].tokens[0].text, "(test).");
    }

    #[test]
    fn test_normalized_search_ignores_diacritics() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("الرحمن", &SearchOptions::default()).unwrap();
        assert_eq!(locations(&results), vec!["1:1", "1:3"]);
        assert_eq!(positions(&results[0]), vec![3]);
        assert_eq!(positions(&results[1]), vec![1]);
        assert_eq!(results[0].tokens[0].text, "الرَّحْمَٰنِ");
    }

    #[test]
    fn test_raw_search_does_not_ignore_diacritics() {
        let engine = SearchEngine::new(sample_library());
        let options = SearchOptions::default().with_normalize(false);
        assert!(engine.search("الرحمن", &options).unwrap().is_empty());
    }

    #[test]
    fn test_alef_variants_match_bare_alef() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("اياك", &SearchOptions::substring()).unwrap();
        assert_eq!(locations(&results), vec!["1:5"]);
        assert_eq!(positions(&results[0]), vec![1, 3]);

        let results = engine.search("اياك", &SearchOptions::exact()).unwrap();
        assert_eq!(locations(&results), vec!["1:5"]);
        assert_eq!(positions(&results[0]), vec![1]);
    }

    #[test]
    fn test_alef_maqsura_matches_ya() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("هدى", &SearchOptions::exact()).unwrap();
        assert_eq!(locations(&results), vec!["2:2", "2:5"]);
    }

    #[test]
    fn test_multi_word_substring_highlights_every_overlapped_token() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("الرحمن الرحيم", &SearchOptions::default()).unwrap();
        assert_eq!(locations(&results), vec!["1:1", "1:3"]);
        assert_eq!(positions(&results[0]), vec![3, 4]);
        assert_eq!(positions(&results[1]), vec![1, 2]);
    }

    #[test]
    fn test_overlapping_phrase_occurrences_highlight_all_tokens() {
        let engine = engine_for(&["ab ab ab", "ab ab cd ab"]);
        let results = engine.search("ab ab", &SearchOptions::default()).unwrap();
        assert_eq!(locations(&results), vec!["1:1", "1:2"]);
        assert_eq!(positions(&results[0]), vec![1, 2, 3]);
        assert_eq!(positions(&results[1]), vec![1, 2]);
    }

    #[test]
    fn test_exact_rejects_multi_word_queries() {
        let engine = engine_for(&["test word"]);
        let err = engine.search("test word", &SearchOptions::exact()).unwrap_err();
        assert!(err.is_invalid_argument());
        expect_test::expect![[r#"Exact search matches single words, got 'test word' (valid: substring)"#]]
            .assert_eq(&err.to_string());
        assert_eq!(
            locations(&engine.search("test word", &SearchOptions::substring()).unwrap()),
            vec!["1:1"]
        );
        assert_eq!(
            locations(&engine.search("  test  ", &SearchOptions::exact()).unwrap()),
            vec!["1:1"]
        );
    }

    #[test]
    fn test_partial_word_substring() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("رحي", &SearchOptions::default()).unwrap();
        assert_eq!(locations(&results), vec!["1:1", "1:3"]);
        assert_eq!(positions(&results[0]), vec![4]);
    }

    #[test]
    fn test_pause_marks_do_not_break_phrases() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("ريب فيه", &SearchOptions::default()).unwrap();
        assert_eq!(locations(&results), vec!["2:2"]);
        assert_eq!(positions(&results[0]), vec![4, 6]);
    }

    #[test]
    fn test_substring_results_contain_exact_results() {
        let engine = SearchEngine::new(sample_library());
        for query in ["الرحمن", "اياك", "الذين", "هم", "الله", "عليهم"] {
            let exact = locations(&engine.search(query, &SearchOptions::exact()).unwrap());
            let substring = locations(&engine.search(query, &SearchOptions::substring()).unwrap());
            for location in &exact {
                assert!(substring.contains(location), "{} missing {}", query, location);
            }
        }
    }

    #[test]
    fn test_results_follow_corpus_order() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("ال", &SearchOptions::default()).unwrap();
        let mut sorted: Vec<Location> = results.iter().map(|r| r.location).collect();
        sorted.sort();
        assert_eq!(results.iter().map(|r| r.location).collect::<Vec<_>>(), sorted);
        assert!(results.len() > 5);
    }

    #[test]
    fn test_batch_search_reports_each_verse_once() {
        let engine = SearchEngine::new(sample_library());
        let results = engine
            .search_batch(&["الرحمن", "الرحيم", "الرحمن"], &SearchOptions::exact())
            .unwrap();
        assert_eq!(locations(&results), vec!["1:1", "1:3"]);
        assert_eq!(positions(&results[0]), vec![3, 4]);
        assert_eq!(positions(&results[1]), vec![1, 2]);

        let results = engine
            .search_batch(&["الذين", "يؤمنون"], &SearchOptions::substring())
            .unwrap();
        let all = locations(&results);
        let unique: BTreeSet<_> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn test_no_matches_is_empty_success() {
        let engine = SearchEngine::new(sample_library());
        assert!(engine.search("nonexistent", &SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_queries_are_rejected() {
        let engine = SearchEngine::new(sample_library());
        for query in ["", "   ", "\u{064B}"] {
            let err = engine.search(query, &SearchOptions::default()).unwrap_err();
            assert!(err.is_invalid_argument(), "{:?} accepted", query);
        }
        let err = engine.search("...", &SearchOptions::exact()).unwrap_err();
        assert!(err.is_invalid_argument());
        let no_queries: [&str; 0] = [];
        let err = engine.search_batch(&no_queries, &SearchOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "At least one search query is required");
    }

    #[test]
    fn test_translation_target() {
        let engine = SearchEngine::new(sample_library());
        let options = SearchOptions::exact().with_translation("en.sahih");
        let results = engine.search("merciful", &options).unwrap();
        assert_eq!(locations(&results), vec!["1:1", "1:3"]);
        assert_eq!(results[0].translation, Some("en.sahih"));
        assert_eq!(results[0].primary, Some("بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ"));
        assert!(results[0].tokens.is_empty());

        let options = options.with_attach_primary(false);
        let results = engine.search("merciful", &options).unwrap();
        assert!(results[0].primary.is_none());
    }

    #[test]
    fn test_unknown_translation_target_lists_valid_keys() {
        let engine = SearchEngine::new(sample_library());
        let options = SearchOptions::default().with_translation("fr");
        let err = engine.search("merciful", &options).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown translation 'fr' (valid: en.sahih, ms.basmeih)"
        );
    }

    #[test]
    fn test_match_mode_parse() {
        assert_eq!(MatchMode::parse("exact").unwrap(), MatchMode::Exact);
        assert_eq!(MatchMode::parse("substring").unwrap(), MatchMode::Substring);
        assert!(MatchMode::parse("fuzzy").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_search_page() {
        let page = SearchPage::new((1..=10).collect::<Vec<_>>(), 2, 3);
        assert_eq!(page.items, vec![3, 4, 5]);
        assert_eq!(page.total, 10);
        assert!(page.has_more);

        let page = SearchPage::new((1..=10).collect::<Vec<_>>(), 8, 5);
        assert_eq!(page.items, vec![9, 10]);
        assert!(!page.has_more);

        let page = SearchPage::new((1..=3).collect::<Vec<_>>(), 10, 5);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_more);
    }

    #[test]
    fn test_match_record_json() {
        let engine = SearchEngine::new(sample_library());
        let results = engine.search("مالك", &SearchOptions::exact()).unwrap();
        let json = serde_json::to_string_pretty(&results).unwrap();
        expect_test::expect![[r#"
            [
              {
                "location": "1:4",
                "text": "مَالِكِ يَوْمِ الدِّينِ",
                "tokens": [
                  {
                    "position": 1,
                    "text": "مَالِكِ",
                    "location": "1:4:1"
                  }
                ]
              }
            ]"#]]
        .assert_eq(&json);
    }
}
