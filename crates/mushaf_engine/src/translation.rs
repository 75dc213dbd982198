/* 📖 # How do translations relate to the primary text?

A translation mirrors the chapter/verse structure of the book but holds a
single string per verse. Translations may be partial: chapters and verses can
be missing, as long as every coordinate that is present also exists in the
book. Chapter and verse numbers are strictly ascending, so lookups use binary
search rather than positional indexing.

Translated text is not tokenized for highlighting. Searching it uses the
same matcher as the primary text, so the punctuation rule for exact matches
is shared by both paths.
*/

use std::collections::BTreeMap;

use mushaf_base::{MushafError, MushafResult};
use serde::Serialize;

use crate::corpus::{Book, Location};
use crate::search::{MatchRecord, Matcher, SearchOptions};

/// A translated verse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedVerse {
    pub number: u32,
    pub text: String,
}

/// A translated chapter; verses may be a subset of the primary chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedChapter {
    pub number: u32,
    pub verses: Vec<TranslatedVerse>,
}

/// Descriptive fields of a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationInfo {
    pub key: String,
    pub name: String,
    pub translator: String,
    pub language: String,
    pub language_name: String,
}

/// One translation of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    info: TranslationInfo,
    chapters: Vec<TranslatedChapter>,
}

impl Translation {
    /// Build a translation, checking its numbering against the book.
    pub fn new(
        info: TranslationInfo,
        chapters: Vec<TranslatedChapter>,
        book: &Book,
    ) -> MushafResult<Self> {
        let fail = |message: String| Box::new(MushafError::load_failure(&info.key, message));
        let mut previous_chapter = 0;
        for chapter in &chapters {
            if chapter.number <= previous_chapter {
                return Err(fail(format!(
                    "chapter numbers must be strictly ascending: {} follows {}",
                    chapter.number, previous_chapter
                )));
            }
            previous_chapter = chapter.number;
            let mut previous_verse = 0;
            for verse in &chapter.verses {
                if verse.number <= previous_verse {
                    return Err(fail(format!(
                        "verse numbers of chapter {} must be strictly ascending: {} follows {}",
                        chapter.number, verse.number, previous_verse
                    )));
                }
                previous_verse = verse.number;
                if book.verse(chapter.number, verse.number).is_none() {
                    return Err(fail(format!(
                        "verse {} does not exist in {}",
                        Location::verse(chapter.number, verse.number),
                        book.name()
                    )));
                }
            }
        }
        Ok(Self { info, chapters })
    }

    pub fn info(&self) -> &TranslationInfo {
        &self.info
    }

    pub fn key(&self) -> &str {
        &self.info.key
    }

    pub fn chapters(&self) -> &[TranslatedChapter] {
        &self.chapters
    }

    /// Translated text at a coordinate, if this translation covers it.
    pub fn verse(&self, chapter: u32, verse: u32) -> Option<&str> {
        let chapter = self
            .chapters
            .binary_search_by_key(&chapter, |c| c.number)
            .ok()
            .map(|index| &self.chapters[index])?;
        chapter
            .verses
            .binary_search_by_key(&verse, |v| v.number)
            .ok()
            .map(|index| chapter.verses[index].text.as_str())
    }

    /// All translated verses in coordinate order.
    pub fn verses(&self) -> impl Iterator<Item = (Location, &str)> + '_ {
        self.chapters.iter().flat_map(|chapter| {
            chapter
                .verses
                .iter()
                .map(move |verse| (Location::verse(chapter.number, verse.number), verse.text.as_str()))
        })
    }

    pub fn verse_count(&self) -> usize {
        self.chapters.iter().map(|c| c.verses.len()).sum()
    }
}

/// The primary text of one verse side by side with every translation of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison<'a> {
    pub location: Location,
    pub primary: &'a str,
    pub translations: BTreeMap<&'a str, &'a str>,
}

/// All loaded translations, keyed by translation key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationStore {
    translations: BTreeMap<String, Translation>,
}

impl TranslationStore {
    /// Collect translations; two translations with the same key are a load failure.
    pub fn new(translations: Vec<Translation>) -> MushafResult<Self> {
        let mut map = BTreeMap::new();
        for translation in translations {
            let key = translation.key().to_string();
            if map.insert(key.clone(), translation).is_some() {
                return Err(Box::new(MushafError::load_failure(
                    &key,
                    "duplicate translation key",
                )));
            }
        }
        Ok(Self { translations: map })
    }

    pub fn get(&self, key: &str) -> Option<&Translation> {
        self.translations.get(key)
    }

    /// Like [`get`](Self::get), but an unknown key is an invalid argument
    /// listing the loaded keys.
    pub fn require(&self, key: &str) -> MushafResult<&Translation> {
        self.get(key).ok_or_else(|| {
            Box::new(MushafError::invalid_argument(
                format!("Unknown translation '{}'", key),
                self.keys().map(str::to_string).collect(),
            ))
        })
    }

    /// Translation keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.translations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Translation> + '_ {
        self.translations.values()
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    /// Search the text of one translation.
    ///
    /// Matching follows the primary search (mode, normalization, order and
    /// one record per verse) without token highlighting. With
    /// `attach_primary` each record carries the primary verse text.
    pub fn search_in_translation<'a, S: AsRef<str>>(
        &'a self,
        book: &'a Book,
        key: &str,
        queries: &[S],
        options: &SearchOptions,
    ) -> MushafResult<Vec<MatchRecord<'a>>> {
        let translation = self.require(key)?;
        let matchers = Matcher::compile_all(queries, options)?;
        let results = translation
            .verses()
            .filter(|(_, text)| matchers.iter().any(|matcher| matcher.matches_text(text)))
            .map(|(location, text)| MatchRecord {
                location,
                text,
                translation: Some(translation.key()),
                primary: if options.attach_primary {
                    book.verse_at(location).map(|verse| verse.text())
                } else {
                    None
                },
                tokens: Vec::new(),
            })
            .collect();
        Ok(results)
    }

    /// Fan a single coordinate out across the book and every translation.
    ///
    /// Returns `None` when the book has no such verse. Translations that do
    /// not cover the verse are left out of the map.
    pub fn compare<'a>(&'a self, book: &'a Book, chapter: u32, verse: u32) -> Option<Comparison<'a>> {
        let primary = book.verse(chapter, verse)?;
        let translations = self
            .translations
            .iter()
            .filter_map(|(key, translation)| {
                translation
                    .verse(chapter, verse)
                    .map(|text| (key.as_str(), text))
            })
            .collect();
        Some(Comparison {
            location: primary.location(),
            primary: primary.text(),
            translations,
        })
    }
}
