/* 📖 # Why is loading all-or-nothing?

The server has no way to reload or repair data at runtime, so serving a
partially loaded corpus would only hide the problem. Every file is parsed
into plain serde structs first and then handed to the model constructors,
which check the numbering invariants. Any failure aborts start-up.

Translation files are independent of each other, so all of them are tried
and every failure is reported together instead of stopping at the first.
*/

use std::sync::Arc;

use mushaf_base::error::ErrorKind;
use mushaf_base::{FilePath, MushafError, MushafResult, Pal, ResultExt};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::corpus::{Book, Chapter, Verse};
use crate::library::Library;
use crate::translation::{
    TranslatedChapter, TranslatedVerse, Translation, TranslationInfo, TranslationStore,
};

#[derive(Debug, Deserialize)]
struct RawBook {
    name: String,
    chapters: Vec<RawChapter>,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    number: u32,
    name: String,
    #[serde(default)]
    transliteration: Option<String>,
    #[serde(default)]
    translation: Option<String>,
    verses: Vec<RawVerse>,
}

#[derive(Debug, Deserialize)]
struct RawVerse {
    number: u32,
    text: String,
    #[serde(default)]
    preamble: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTranslation {
    key: String,
    name: String,
    translator: String,
    language: String,
    language_name: String,
    chapters: Vec<RawTranslatedChapter>,
}

#[derive(Debug, Deserialize)]
struct RawTranslatedChapter {
    number: u32,
    verses: Vec<RawTranslatedVerse>,
}

#[derive(Debug, Deserialize)]
struct RawTranslatedVerse {
    number: u32,
    text: String,
}

fn parse_json<'de, T: Deserialize<'de>>(source_name: &str, json: &'de str) -> MushafResult<T> {
    serde_json::from_str(json)
        .map_err(|e| Box::new(MushafError::load_failure(source_name, format!("malformed JSON: {}", e))))
}

/// Parse the primary corpus from JSON text.
pub fn parse_book(source_name: &str, json: &str) -> MushafResult<Book> {
    let raw: RawBook = parse_json(source_name, json)?;
    let chapters = raw
        .chapters
        .into_iter()
        .map(|chapter| {
            let number = chapter.number;
            let verses = chapter
                .verses
                .into_iter()
                .map(|verse| {
                    let parsed = Verse::new(number, verse.number, verse.text);
                    match verse.preamble {
                        Some(preamble) => parsed.with_preamble(preamble),
                        None => parsed,
                    }
                })
                .collect();
            let mut parsed = Chapter::new(number, chapter.name, verses);
            if let Some(transliteration) = chapter.transliteration {
                parsed = parsed.with_transliteration(transliteration);
            }
            if let Some(translation) = chapter.translation {
                parsed = parsed.with_translation(translation);
            }
            parsed
        })
        .collect();
    Book::new(raw.name, chapters)
}

/// Parse one translation from JSON text, validating it against the book.
pub fn parse_translation(source_name: &str, json: &str, book: &Book) -> MushafResult<Translation> {
    let raw: RawTranslation = parse_json(source_name, json)?;
    let info = TranslationInfo {
        key: raw.key,
        name: raw.name,
        translator: raw.translator,
        language: raw.language,
        language_name: raw.language_name,
    };
    let chapters = raw
        .chapters
        .into_iter()
        .map(|chapter| TranslatedChapter {
            number: chapter.number,
            verses: chapter
                .verses
                .into_iter()
                .map(|verse| TranslatedVerse {
                    number: verse.number,
                    text: verse.text,
                })
                .collect(),
        })
        .collect();
    Translation::new(info, chapters, book).with_context(|| format!("Invalid translation file {}", source_name))
}

/// Load the primary corpus file.
#[instrument(skip(pal), fields(path = %path))]
pub fn load_book(pal: &dyn Pal, path: &FilePath) -> MushafResult<Book> {
    let json = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path))?;
    let book = parse_book(&path.to_string(), &json)?;
    let stats = book.stats();
    info!(
        name = book.name(),
        chapters = stats.chapters,
        verses = stats.verses,
        tokens = stats.tokens,
        "corpus loaded"
    );
    Ok(book)
}

/// Load a single translation file.
#[instrument(skip(pal, book), fields(path = %path))]
pub fn load_translation(pal: &dyn Pal, path: &FilePath, book: &Book) -> MushafResult<Translation> {
    let json = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read translation {}", path))?;
    let translation = parse_translation(&path.to_string(), &json, book)?;
    debug!(key = translation.key(), verses = translation.verse_count(), "translation loaded");
    Ok(translation)
}

/// Load every `*.json` file in a directory as a translation.
///
/// All files are attempted; failures are combined into a single error.
#[instrument(skip(pal, book), fields(dir = %dir))]
pub fn load_translations(pal: &dyn Pal, dir: &FilePath, book: &Book) -> MushafResult<TranslationStore> {
    let mut translations = Vec::new();
    let mut errors = Vec::new();
    for path in pal.walk_directory(dir, &["*.json".to_string()])? {
        match path.and_then(|path| load_translation(pal, &path, book)) {
            Ok(translation) => translations.push(translation),
            Err(e) => {
                warn!(error = %e, "failed to load translation");
                errors.push(*e);
            }
        }
    }

    match errors.len() {
        0 => {}
        1 => return Err(Box::new(errors.remove(0))),
        count => return Err(Box::new(MushafError::new(ErrorKind::Multiple { errors, count }))),
    }

    let store = TranslationStore::new(translations)?;
    info!(count = store.len(), keys = ?store.keys().collect::<Vec<_>>(), "translations loaded");
    Ok(store)
}

/// Load the book and all translations named by the configuration.
pub fn load_library(pal: &dyn Pal, config: &Config) -> MushafResult<Library> {
    let book = load_book(pal, &FilePath::from(config.corpus.as_str()))?;
    let translations = match &config.translations_dir {
        Some(dir) => load_translations(pal, &FilePath::from(dir.as_str()), &book)?,
        None => TranslationStore::default(),
    };
    Ok(Library::new(Arc::new(book), Arc::new(translations)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::test_fixtures::{SAMPLE_CORPUS, SAMPLE_EN, SAMPLE_MS, sample_book};
    use mushaf_base::{MockPal, RealPal};

    fn sample_pal() -> MockPal {
        let pal = MockPal::new();
        pal.add_text_file("data/quran.json", SAMPLE_CORPUS);
        pal.add_text_file("data/translations/en.json", SAMPLE_EN);
        pal.add_text_file("data/translations/ms.json", SAMPLE_MS);
        pal
    }

    fn sample_config(translations_dir: Option<&str>) -> Config {
        let mut text = String::from("corpus = \"data/quran.json\"\n");
        if let Some(dir) = translations_dir {
            text.push_str(&format!("translations_dir = \"{}\"\n", dir));
        }
        parse_config(&text).unwrap()
    }

    #[test]
    fn test_parse_book() {
        let book = sample_book();
        assert_eq!(book.name(), "The Noble Quran (sample)");
        let chapter = book.chapter(2).unwrap();
        assert_eq!(chapter.name(), "البقرة");
        assert_eq!(chapter.transliteration(), Some("Al-Baqarah"));
        assert_eq!(chapter.translation(), Some("The Cow"));
        assert_eq!(chapter.verse_count(), 5);
    }

    #[test]
    fn test_parse_book_without_optional_fields() {
        let book = parse_book(
            "min.json",
            r#"{"name": "min", "chapters": [{"number": 1, "name": "one", "verses": [{"number": 1, "text": "a b"}]}]}"#,
        )
        .unwrap();
        let chapter = book.chapter(1).unwrap();
        assert!(chapter.transliteration().is_none());
        assert!(book.verse(1, 1).unwrap().preamble().is_none());
        assert_eq!(book.stats().tokens, 2);
    }

    #[test]
    fn test_malformed_json_is_a_load_failure() {
        let err = parse_book("broken.json", "{\"name\": ").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LoadFailure { .. }));
        assert!(err.to_string().starts_with("Failed to load broken.json: malformed JSON"));
    }

    #[test]
    fn test_numbering_violation_is_a_load_failure() {
        let err = parse_book(
            "gap.json",
            r#"{"name": "gap", "chapters": [{"number": 1, "name": "one", "verses": [{"number": 2, "text": "a"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::LoadFailure { .. }));
    }

    #[test]
    fn test_load_library() {
        let pal = sample_pal();
        let library = load_library(&pal, &sample_config(Some("data/translations"))).unwrap();
        assert_eq!(library.book().stats().verses, 12);
        assert_eq!(
            library.translations().keys().collect::<Vec<_>>(),
            vec!["en.sahih", "ms.basmeih"]
        );
    }

    #[test]
    fn test_load_library_without_translations() {
        let pal = sample_pal();
        let library = load_library(&pal, &sample_config(None)).unwrap();
        assert!(library.translations().is_empty());
    }

    #[test]
    fn test_missing_corpus_file() {
        let pal = MockPal::new();
        let err = load_library(&pal, &sample_config(None)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read corpus data/quran.json"));
    }

    #[test]
    fn test_translation_outside_book_fails() {
        let pal = sample_pal();
        pal.add_text_file(
            "data/translations/xx.json",
            r#"{"key": "xx", "name": "x", "translator": "x", "language": "xx", "language_name": "X",
                "chapters": [{"number": 3, "verses": [{"number": 1, "text": "nowhere"}]}]}"#,
        );
        let book = sample_book();
        let err = load_translations(&pal, &FilePath::from("data/translations"), &book).unwrap_err();
        expect_test::expect![[r#"Invalid translation file data/translations/xx.json: Failed to load xx: verse 3:1 does not exist in The Noble Quran (sample)"#]]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn test_multiple_translation_failures_are_aggregated() {
        let pal = sample_pal();
        pal.add_text_file("data/translations/bad1.json", "not json");
        pal.add_text_file("data/translations/bad2.json", "{}");
        let book = sample_book();
        let err = load_translations(&pal, &FilePath::from("data/translations"), &book).unwrap_err();
        match err.kind() {
            ErrorKind::Multiple { errors, count } => {
                assert_eq!(*count, 2);
                assert!(errors[0].to_string().contains("bad1.json"));
                assert!(errors[1].to_string().contains("bad2.json"));
            }
            other => panic!("unexpected error kind {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_translation_key_across_files() {
        let pal = sample_pal();
        pal.add_text_file("data/translations/en2.json", SAMPLE_EN);
        let book = sample_book();
        let err = load_translations(&pal, &FilePath::from("data/translations"), &book).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load en.sahih: duplicate translation key");
    }

    #[test]
    fn test_non_json_files_are_ignored() {
        let pal = sample_pal();
        pal.add_text_file("data/translations/README.md", "# translations");
        let book = sample_book();
        let store = load_translations(&pal, &FilePath::from("data/translations"), &book).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_load_sample_data_from_disk() {
        let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let pal = RealPal::new(root);
        let config = parse_config(
            "corpus = \"data/sample/quran.json\"\ntranslations_dir = \"data/sample/translations\"",
        )
        .unwrap();
        let library = load_library(&pal, &config).unwrap();
        assert_eq!(library.book().stats().chapters, 2);
        assert_eq!(library.translations().len(), 2);
    }
}
