pub mod api;
pub mod config;
pub mod corpus;
pub mod library;
pub mod loader;
pub mod normalize;
pub mod search;
pub mod translation;

#[cfg(test)]
mod test_fixtures;

pub use api::{ApiService, SiteInfo};
pub use config::{Config, SearchConfig, ServerConfig, load_config, parse_config};
pub use corpus::{Book, Chapter, CorpusStats, Location, Token, Verse};
pub use library::Library;
pub use loader::{load_book, load_library, load_translation, load_translations, parse_book, parse_translation};
pub use normalize::{normalize, strip_punctuation};
pub use search::{MatchMode, MatchRecord, SearchEngine, SearchOptions, SearchPage, TargetField, TokenMatch};
pub use translation::{
    Comparison, TranslatedChapter, TranslatedVerse, Translation, TranslationInfo, TranslationStore,
};
