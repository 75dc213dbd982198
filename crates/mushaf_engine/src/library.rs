use std::sync::Arc;

use crate::corpus::Book;
use crate::translation::TranslationStore;

/// Shared, read-only handle to the loaded book and its translations.
///
/// Cloning only bumps reference counts, so the handle is passed by value
/// into the search engine and the API service.
#[derive(Debug, Clone)]
pub struct Library {
    book: Arc<Book>,
    translations: Arc<TranslationStore>,
}

impl Library {
    pub fn new(book: Arc<Book>, translations: Arc<TranslationStore>) -> Self {
        Self { book, translations }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn translations(&self) -> &TranslationStore {
        &self.translations
    }
}
