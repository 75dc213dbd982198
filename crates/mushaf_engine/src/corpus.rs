/* 📖 # Why have a dedicated corpus model?

The primary text is a fixed tree: a book holds chapters, a chapter holds
verses, a verse is a space-delimited string. The tree is built once by the
loader, validated, and then only read. Lookups by (chapter, verse) index
straight into vectors because numbering is contiguous from 1, which the
constructor enforces.

Tokens are not stored. They are derived from the verse text on demand, since
only the search highlighter and the verse endpoint ever look at them.
*/

use std::fmt;
use std::str::FromStr;

use mushaf_base::{MushafError, MushafResult};
use serde::{Serialize, Serializer};

/// Universal address of a chapter/verse/token, formatted `c:v` or `c:v:t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub chapter: u32,
    pub verse: u32,
    pub token: Option<u32>,
}

impl Location {
    pub fn verse(chapter: u32, verse: u32) -> Self {
        Self {
            chapter,
            verse,
            token: None,
        }
    }

    pub fn token(chapter: u32, verse: u32, token: u32) -> Self {
        Self {
            chapter,
            verse,
            token: Some(token),
        }
    }

    /// The (chapter, verse) part of this location.
    pub fn verse_location(&self) -> Location {
        Location::verse(self.chapter, self.verse)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token {
            Some(token) => write!(f, "{}:{}:{}", self.chapter, self.verse, token),
            None => write!(f, "{}:{}", self.chapter, self.verse),
        }
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Location {
    type Err = Box<MushafError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            Box::new(MushafError::invalid_argument(
                format!("Invalid location '{}'", s),
                vec!["chapter:verse".to_string(), "chapter:verse:token".to_string()],
            ))
        };
        let parts = s
            .trim()
            .split(':')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match parts.as_slice() {
            [chapter, verse] => Ok(Location::verse(*chapter, *verse)),
            [chapter, verse, token] => Ok(Location::token(*chapter, *verse, *token)),
            _ => Err(invalid()),
        }
    }
}

/// A whitespace-delimited segment of a verse, derived on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub location: Location,
}

impl Token<'_> {
    /// 1-based position of the token within its verse.
    pub fn position(&self) -> u32 {
        self.location.token.unwrap_or_default()
    }
}

/// A single verse of the primary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    chapter: u32,
    number: u32,
    text: String,
    preamble: Option<String>,
}

impl Verse {
    pub fn new(chapter: u32, number: u32, text: impl Into<String>) -> Self {
        Self {
            chapter,
            number,
            text: text.into(),
            preamble: None,
        }
    }

    /// Attach the opening formula recited before this verse.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn preamble(&self) -> Option<&str> {
        self.preamble.as_deref()
    }

    pub fn location(&self) -> Location {
        Location::verse(self.chapter, self.number)
    }

    /// Tokens of the verse text in order, positions starting at 1.
    pub fn tokens(&self) -> impl Iterator<Item = Token<'_>> + '_ {
        let (chapter, verse) = (self.chapter, self.number);
        self.text
            .split_whitespace()
            .zip(1u32..)
            .map(move |(text, position)| Token {
                text,
                location: Location::token(chapter, verse, position),
            })
    }

    /// Token at a 1-based position.
    pub fn token(&self, position: u32) -> Option<Token<'_>> {
        let index = usize::try_from(position.checked_sub(1)?).ok()?;
        self.tokens().nth(index)
    }

    pub fn token_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A chapter of the primary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    number: u32,
    name: String,
    transliteration: Option<String>,
    translation: Option<String>,
    verses: Vec<Verse>,
}

impl Chapter {
    pub fn new(number: u32, name: impl Into<String>, verses: Vec<Verse>) -> Self {
        Self {
            number,
            name: name.into(),
            transliteration: None,
            translation: None,
            verses,
        }
    }

    pub fn with_transliteration(mut self, transliteration: impl Into<String>) -> Self {
        self.transliteration = Some(transliteration.into());
        self
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transliteration(&self) -> Option<&str> {
        self.transliteration.as_deref()
    }

    pub fn translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    /// Verse by 1-based number; `None` when out of range.
    pub fn verse(&self, number: u32) -> Option<&Verse> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.verses.get(index)
    }
}

/// Aggregate counts over the whole corpus, computed once at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub chapters: usize,
    pub verses: usize,
    pub tokens: usize,
}

/// The primary text: an immutable, validated tree of chapters and verses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    name: String,
    chapters: Vec<Chapter>,
    stats: CorpusStats,
}

impl Book {
    /// Build a book, checking that chapter numbers run 1..=n and that every
    /// chapter's verse numbers run 1..=m with matching chapter back-references.
    pub fn new(name: impl Into<String>, chapters: Vec<Chapter>) -> MushafResult<Self> {
        let name = name.into();
        for (index, chapter) in chapters.iter().enumerate() {
            let expected = index as u32 + 1;
            if chapter.number != expected {
                return Err(Box::new(MushafError::load_failure(
                    &name,
                    format!(
                        "chapter numbers must be contiguous from 1: expected {}, found {}",
                        expected, chapter.number
                    ),
                )));
            }
            for (index, verse) in chapter.verses.iter().enumerate() {
                let expected = index as u32 + 1;
                if verse.number != expected || verse.chapter != chapter.number {
                    return Err(Box::new(MushafError::load_failure(
                        &name,
                        format!(
                            "verse numbers of chapter {} must be contiguous from 1: expected {}:{}, found {}",
                            chapter.number,
                            chapter.number,
                            expected,
                            verse.location()
                        ),
                    )));
                }
            }
        }

        let stats = CorpusStats {
            chapters: chapters.len(),
            verses: chapters.iter().map(Chapter::verse_count).sum(),
            tokens: chapters
                .iter()
                .flat_map(|c| c.verses.iter())
                .map(Verse::token_count)
                .sum(),
        };

        Ok(Self {
            name,
            chapters,
            stats,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chapter by 1-based number; `None` for 0 or beyond the last chapter.
    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.chapters.get(index)
    }

    /// Verse by coordinate; `None` if either coordinate is out of range.
    pub fn verse(&self, chapter: u32, verse: u32) -> Option<&Verse> {
        self.chapter(chapter)?.verse(verse)
    }

    /// Verse addressed by a location (the token part is ignored).
    pub fn verse_at(&self, location: Location) -> Option<&Verse> {
        self.verse(location.chapter, location.verse)
    }

    /// All chapters in number order.
    pub fn chapters(&self) -> std::slice::Iter<'_, Chapter> {
        self.chapters.iter()
    }

    /// All verses in (chapter, verse) order.
    pub fn verses(&self) -> impl Iterator<Item = &Verse> + '_ {
        self.chapters.iter().flat_map(|chapter| chapter.verses.iter())
    }

    pub fn stats(&self) -> CorpusStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::sample_book;

    #[test]
    fn test_location_display_and_parse() {
        assert_eq!(Location::verse(2, 255).to_string(), "2:255");
        assert_eq!(Location::token(1, 7, 3).to_string(), "1:7:3");
        assert_eq!("2:255".parse::<Location>().unwrap(), Location::verse(2, 255));
        assert_eq!(" 1:7:3 ".parse::<Location>().unwrap(), Location::token(1, 7, 3));
        assert!("2".parse::<Location>().is_err());
        assert!("a:b".parse::<Location>().is_err());
        assert!("1:2:3:4".parse::<Location>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_location_serializes_as_string() {
        let json = serde_json::to_string(&[Location::verse(1, 1), Location::token(2, 2, 5)]).unwrap();
        assert_eq!(json, r#"["1:1","2:2:5"]"#);
    }

    #[test]
    fn test_standalone_pause_mark_counts_as_token() {
        let book = sample_book();
        let verse = book.verse(2, 2).unwrap();
        assert_eq!(verse.token_count(), 9);
        assert_eq!(verse.token(5).unwrap().text, "\u{06DB}");
    }

    #[test]
    fn test_chapter_lookup() {
        let book = sample_book();
        assert_eq!(book.chapter(1).unwrap().name(), "الفاتحة");
        assert!(book.chapter(0).is_none());
        assert!(book.chapter(3).is_none());
        assert!(book.chapter(u32::MAX).is_none());
    }

    #[test]
    fn test_verse_lookup() {
        let book = sample_book();
        let verse = book.verse(1, 1).unwrap();
        assert_eq!(verse.text(), "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ");
        assert_eq!(verse.location(), Location::verse(1, 1));
        assert!(book.verse(1, 999).is_none());
        assert!(book.verse(1, 0).is_none());
        assert!(book.verse(999, 1).is_none());
    }

    #[test]
    fn test_preamble() {
        let book = sample_book();
        assert!(book.verse(1, 1).unwrap().preamble().is_none());
        assert_eq!(
            book.verse(2, 1).unwrap().preamble(),
            Some("بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ")
        );
    }

    #[test]
    fn test_tokens_are_derived_with_positions() {
        let verse = Verse::new(3, 4, "  alpha   beta\tgamma ");
        let tokens: Vec<_> = verse.tokens().collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "alpha");
        assert_eq!(tokens[2].position(), 3);
        assert_eq!(tokens[2].location.to_string(), "3:4:3");
        assert_eq!(verse.token_count(), 3);
        assert_eq!(verse.token(2).unwrap().text, "beta");
        assert!(verse.token(0).is_none());
        assert!(verse.token(4).is_none());
    }

    #[test]
    fn test_traversal_round_trips_through_lookup() {
        let book = sample_book();
        for chapter in book.chapters() {
            for verse in chapter.verses() {
                assert_eq!(book.verse(chapter.number(), verse.number()), Some(verse));
            }
        }
        // Traversal is restartable
        assert_eq!(book.chapters().count(), book.chapters().count());
        assert_eq!(book.verses().count(), book.stats().verses);
    }

    #[test]
    fn test_stats_are_computed_at_construction() {
        let book = sample_book();
        let stats = book.stats();
        assert_eq!(stats.chapters, 2);
        assert_eq!(stats.verses, 12);
        assert_eq!(stats.tokens, 68);
        let tokens: usize = book.verses().map(Verse::token_count).sum();
        assert_eq!(stats.tokens, tokens);
    }

    #[test]
    fn test_non_contiguous_chapters_are_rejected() {
        let chapters = vec![
            Chapter::new(1, "one", vec![Verse::new(1, 1, "a")]),
            Chapter::new(3, "three", vec![Verse::new(3, 1, "b")]),
        ];
        let err = Book::new("broken", chapters).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to load broken: chapter numbers must be contiguous from 1: expected 2, found 3"
        );
    }

    #[test]
    fn test_non_contiguous_verses_are_rejected() {
        let chapters = vec![Chapter::new(
            1,
            "one",
            vec![Verse::new(1, 1, "a"), Verse::new(1, 1, "b")],
        )];
        let err = Book::new("broken", chapters).unwrap_err();
        assert!(err.to_string().contains("expected 1:2, found 1:1"));
    }

    #[test]
    fn test_mismatched_chapter_reference_is_rejected() {
        let chapters = vec![Chapter::new(1, "one", vec![Verse::new(2, 1, "a")])];
        assert!(Book::new("broken", chapters).is_err());
    }
}
