//! Sample data shared by the unit tests of this crate.

use std::sync::Arc;

use crate::corpus::Book;
use crate::library::Library;
use crate::loader::{parse_book, parse_translation};
use crate::translation::TranslationStore;

pub(crate) const SAMPLE_CORPUS: &str = include_str!("../../../data/sample/quran.json");
pub(crate) const SAMPLE_EN: &str = include_str!("../../../data/sample/translations/en.json");
pub(crate) const SAMPLE_MS: &str = include_str!("../../../data/sample/translations/ms.json");

pub(crate) fn sample_book() -> Book {
    parse_book("quran.json", SAMPLE_CORPUS).unwrap()
}

pub(crate) fn sample_translations() -> TranslationStore {
    let book = sample_book();
    let en = parse_translation("en.json", SAMPLE_EN, &book).unwrap();
    let ms = parse_translation("ms.json", SAMPLE_MS, &book).unwrap();
    TranslationStore::new(vec![en, ms]).unwrap()
}

pub(crate) fn sample_library() -> Library {
    Library::new(Arc::new(sample_book()), Arc::new(sample_translations()))
}
