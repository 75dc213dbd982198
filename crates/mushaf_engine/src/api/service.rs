/* 📖 # Why a single API service?

One HttpService handles every endpoint. It owns a Library handle and a
SearchEngine over it, routes on the path segments and serializes response
structs with serde. Engine lookups return Option or typed errors; this is
the only place they turn into HTTP statuses:

- success: 200 with a JSON body
- NotFound: 404 with `{"error": ...}`
- InvalidArgument: 400 with `{"error": ..., "valid": [...]}`
- anything else is returned as an error, which the PAL answers with 599

Routes:
- `/api/info`, `/api/stats`
- `/api/chapters`, `/api/chapter/{c}`, `/api/verse/{c}/{v}`
- `/api/translations`, `/api/translation/{key}/{c}/{v}`
- `/api/search?q=...`, `/api/compare/{c}/{v}`
*/

use mushaf_base::error::ErrorKind;
use mushaf_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode};
use mushaf_base::{MushafError, MushafResult};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::{debug, error};

use super::query::QueryParams;
use crate::config::SearchConfig;
use crate::corpus::{Chapter, CorpusStats, Location, Verse};
use crate::library::Library;
use crate::search::{MatchMode, MatchRecord, SearchEngine, SearchOptions, SearchPage};
use crate::translation::TranslationInfo;

/// Site-level information reported by `/api/info`.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub title: String,
}

impl SiteInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[derive(Serialize)]
struct InfoResponse<'a> {
    title: &'a str,
    corpus: &'a str,
    stats: CorpusStats,
    translations: Vec<&'a str>,
}

#[derive(Serialize)]
struct ChapterSummaryResponse<'a> {
    number: u32,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transliteration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a str>,
    verse_count: usize,
}

#[derive(Serialize)]
struct ChapterResponse<'a> {
    #[serde(flatten)]
    summary: ChapterSummaryResponse<'a>,
    verses: Vec<VerseResponse<'a>>,
}

#[derive(Serialize)]
struct VerseResponse<'a> {
    location: Location,
    chapter: u32,
    number: u32,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    preamble: Option<&'a str>,
}

#[derive(Serialize)]
struct TokenResponse<'a> {
    position: u32,
    text: &'a str,
    location: Location,
}

#[derive(Serialize)]
struct VerseDetailResponse<'a> {
    #[serde(flatten)]
    verse: VerseResponse<'a>,
    tokens: Vec<TokenResponse<'a>>,
}

#[derive(Serialize)]
struct TranslationSummaryResponse<'a> {
    #[serde(flatten)]
    info: &'a TranslationInfo,
    verse_count: usize,
}

#[derive(Serialize)]
struct TranslationVerseResponse<'a> {
    key: &'a str,
    location: Location,
    text: &'a str,
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    queries: Vec<&'a str>,
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a str>,
    total: usize,
    offset: usize,
    limit: usize,
    has_more: bool,
    results: Vec<MatchRecord<'a>>,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<&'a [String]>,
}

impl<'a> ChapterSummaryResponse<'a> {
    fn from_chapter(chapter: &'a Chapter) -> Self {
        Self {
            number: chapter.number(),
            name: chapter.name(),
            transliteration: chapter.transliteration(),
            translation: chapter.translation(),
            verse_count: chapter.verse_count(),
        }
    }
}

impl<'a> VerseResponse<'a> {
    fn from_verse(verse: &'a Verse) -> Self {
        Self {
            location: verse.location(),
            chapter: verse.chapter(),
            number: verse.number(),
            text: verse.text(),
            preamble: verse.preamble(),
        }
    }
}

/// Parse a chapter or verse number from a path segment.
///
/// Anything that is not an integer is an invalid argument; integers outside
/// the 1-based range, however large, simply address nothing.
fn parse_number(what: &str, raw: &str) -> MushafResult<u32> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Box::new(MushafError::invalid_argument(
            format!("Invalid {} number '{}'", what, raw),
            Vec::new(),
        )));
    }
    raw.parse::<u32>()
        .ok()
        .filter(|number| *number > 0)
        .ok_or_else(|| Box::new(MushafError::not_found(format!("{} {}", capitalize(what), raw))))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn not_found(what: String) -> Box<MushafError> {
    Box::new(MushafError::not_found(what))
}

/// HTTP service exposing the corpus, translations and search as JSON.
#[derive(Debug)]
pub struct ApiService {
    library: Library,
    engine: SearchEngine,
    site_info: SiteInfo,
    search: SearchConfig,
}

impl ApiService {
    pub fn new(library: Library, site_info: SiteInfo) -> Self {
        Self {
            engine: SearchEngine::new(library.clone()),
            library,
            site_info,
            search: SearchConfig::default(),
        }
    }

    /// Use the configured default and maximum page sizes for `/api/search`.
    pub fn with_search_limits(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    fn serialize_json_response<T: Serialize>(value: &T) -> MushafResult<HttpResponse> {
        serde_json::to_string(value)
            .map(HttpResponse::json)
            .map_err(|e| Box::new(MushafError::message(format!("Failed to serialize response: {}", e))))
    }

    /// Render NotFound and InvalidArgument as 404/400; other errors pass through.
    fn failure_response(error: Box<MushafError>) -> MushafResult<HttpResponse> {
        let (status, body) = match error.kind() {
            ErrorKind::NotFound { .. } => (
                HttpStatusCode::NotFound,
                ErrorResponse {
                    error: error.to_string(),
                    valid: None,
                },
            ),
            ErrorKind::InvalidArgument { message, valid } => (
                HttpStatusCode::BadRequest,
                ErrorResponse {
                    error: message.clone(),
                    valid: Some(valid.as_slice()),
                },
            ),
            _ => {
                error!(error = %error, "API request failed");
                return Err(error);
            }
        };
        debug!(status = status.as_u16(), error = %body.error, "rejecting API request");
        Ok(Self::serialize_json_response(&body)?.with_status(status))
    }

    fn route(&self, path: &str, params: &QueryParams) -> MushafResult<HttpResponse> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["api", "info"] => self.handle_info(),
            ["api", "stats"] => Self::serialize_json_response(&self.library.book().stats()),
            ["api", "chapters"] => self.handle_chapters(),
            ["api", "chapter", chapter] => self.handle_chapter(chapter),
            ["api", "verse", chapter, verse] => self.handle_verse(chapter, verse),
            ["api", "translations"] => self.handle_translations(),
            ["api", "translation", key, chapter, verse] => {
                self.handle_translation_verse(key, chapter, verse)
            }
            ["api", "search"] => self.handle_search(params),
            ["api", "compare", chapter, verse] => self.handle_compare(chapter, verse),
            _ => Err(not_found(format!("Endpoint {}", path))),
        }
    }

    fn handle_info(&self) -> MushafResult<HttpResponse> {
        let book = self.library.book();
        Self::serialize_json_response(&InfoResponse {
            title: &self.site_info.title,
            corpus: book.name(),
            stats: book.stats(),
            translations: self.library.translations().keys().collect(),
        })
    }

    fn handle_chapters(&self) -> MushafResult<HttpResponse> {
        let chapters: Vec<_> = self
            .library
            .book()
            .chapters()
            .map(ChapterSummaryResponse::from_chapter)
            .collect();
        Self::serialize_json_response(&chapters)
    }

    fn handle_chapter(&self, chapter: &str) -> MushafResult<HttpResponse> {
        let number = parse_number("chapter", chapter)?;
        let chapter = self
            .library
            .book()
            .chapter(number)
            .ok_or_else(|| not_found(format!("Chapter {}", number)))?;
        Self::serialize_json_response(&ChapterResponse {
            summary: ChapterSummaryResponse::from_chapter(chapter),
            verses: chapter.verses().iter().map(VerseResponse::from_verse).collect(),
        })
    }

    fn handle_verse(&self, chapter: &str, verse: &str) -> MushafResult<HttpResponse> {
        let location = Location::verse(parse_number("chapter", chapter)?, parse_number("verse", verse)?);
        let verse = self
            .library
            .book()
            .verse_at(location)
            .ok_or_else(|| not_found(format!("Verse {}", location)))?;
        Self::serialize_json_response(&VerseDetailResponse {
            verse: VerseResponse::from_verse(verse),
            tokens: verse
                .tokens()
                .map(|token| TokenResponse {
                    position: token.position(),
                    text: token.text,
                    location: token.location,
                })
                .collect(),
        })
    }

    fn handle_translations(&self) -> MushafResult<HttpResponse> {
        let translations: Vec<_> = self
            .library
            .translations()
            .iter()
            .map(|translation| TranslationSummaryResponse {
                info: translation.info(),
                verse_count: translation.verse_count(),
            })
            .collect();
        Self::serialize_json_response(&translations)
    }

    fn handle_translation_verse(&self, key: &str, chapter: &str, verse: &str) -> MushafResult<HttpResponse> {
        let key = percent_decode_str(key).decode_utf8_lossy();
        let translation = self
            .library
            .translations()
            .get(&key)
            .ok_or_else(|| not_found(format!("Translation '{}'", key)))?;
        let location = Location::verse(parse_number("chapter", chapter)?, parse_number("verse", verse)?);
        let text = translation
            .verse(location.chapter, location.verse)
            .ok_or_else(|| not_found(format!("Verse {} in translation '{}'", location, key)))?;
        Self::serialize_json_response(&TranslationVerseResponse {
            key: translation.key(),
            location,
            text,
        })
    }

    fn handle_compare(&self, chapter: &str, verse: &str) -> MushafResult<HttpResponse> {
        let location = Location::verse(parse_number("chapter", chapter)?, parse_number("verse", verse)?);
        let comparison = self
            .library
            .translations()
            .compare(self.library.book(), location.chapter, location.verse)
            .ok_or_else(|| not_found(format!("Verse {}", location)))?;
        Self::serialize_json_response(&comparison)
    }

    fn handle_search(&self, params: &QueryParams) -> MushafResult<HttpResponse> {
        let queries: Vec<&str> = params
            .get_all("q")
            .into_iter()
            .filter(|query| !query.trim().is_empty())
            .collect();
        if queries.is_empty() {
            return Err(Box::new(MushafError::invalid_argument(
                "Missing required query parameter 'q'",
                Vec::new(),
            )));
        }

        let mode = params
            .get("mode")
            .map(MatchMode::parse)
            .transpose()?
            .unwrap_or_default();
        let mut options = SearchOptions::default()
            .with_match_mode(mode)
            .with_normalize(params.bool("normalize", true)?)
            .with_case_sensitive(params.bool("case_sensitive", false)?)
            .with_attach_primary(params.bool("primary", true)?);
        let translation = params.get("translation");
        if let Some(key) = translation {
            options = options.with_translation(key);
        }
        let offset = params.usize("offset")?.unwrap_or(0);
        let limit = self.search.effective_limit(params.usize("limit")?);

        let matches = self.engine.search_batch(&queries, &options)?;
        let page = SearchPage::new(matches, offset, limit);
        debug!(total = page.total, returned = page.items.len(), "search request served");
        Self::serialize_json_response(&SearchResponse {
            queries,
            mode: mode.as_str(),
            translation,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
            has_more: page.has_more,
            results: page.items,
        })
    }
}

impl HttpService for ApiService {
    fn handle_request(&self, request: HttpRequest) -> MushafResult<HttpResponse> {
        if request.method() != &HttpMethod::Get {
            return Err(Box::new(MushafError::message("Only GET requests are supported")));
        }

        let path = request.path().split('?').next().unwrap_or(request.path());
        let params = QueryParams::from_path(request.path());
        debug!(path, "handling API request");

        self.route(path, &params).or_else(Self::failure_response)
    }
}
