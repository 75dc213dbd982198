use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use parking_lot::Mutex;

use crate::MushafError;
use crate::MushafResult;
use crate::error::ErrorKind;

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::traits::{Pal, ReadSeek};

/* 📖 # Why use HashMap for MockPal storage?

Corpus and translation fixtures are small JSON strings; holding them in a
HashMap keeps loader tests fast and free of filesystem side effects. HTTP
services "started" on a MockPal are only registered, and tests drive them
through simulate_request() without opening a socket.
*/

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use mushaf_base::{pal::MockPal, Pal, FilePath};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("quran.json"), b"{}".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("quran.json")).unwrap();
/// assert_eq!(content, "{}");
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    http_servers: Arc<Mutex<HashMap<u16, HttpServerInfo>>>,
    next_port: Arc<AtomicU16>,
}

/// Information about a registered HTTP server.
#[derive(Debug)]
struct HttpServerInfo {
    service: Box<dyn HttpService>,
    _config: HttpServerConfig,
}

impl MockPal {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
        }
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.files.lock().insert(path, content);
    }

    /// Add a UTF-8 text file to the mock storage.
    pub fn add_text_file(&self, path: impl Into<FilePath>, content: &str) {
        self.add_file(path.into(), content.as_bytes().to_vec());
    }

    /// Simulate an HTTP request to a registered server.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> MushafResult<HttpResponse> {
        let servers = self.http_servers.lock();
        let server_info = servers.get(&port).ok_or_else(|| {
            Box::new(MushafError::message(format!(
                "No HTTP server registered on port {}",
                port
            )))
        })?;

        server_info.service.handle_request(request)
    }

    /// Get the number of registered HTTP servers.
    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().len()
    }

    fn build_glob_set(globs: &[String]) -> MushafResult<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let compiled = GlobBuilder::new(glob).build().map_err(|e| {
                Box::new(MushafError::message(format!(
                    "Invalid glob pattern '{}': {}",
                    glob, e
                )))
            })?;
            builder.add(compiled);
        }
        builder.build().map_err(|e| {
            Box::new(MushafError::message(format!(
                "Failed to build glob set: {}",
                e
            )))
        })
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn read_file(&self, path: &FilePath) -> MushafResult<Box<dyn ReadSeek + 'static>> {
        let files = self.files.lock();
        let content = files
            .get(path)
            .ok_or_else(|| {
                Box::new(MushafError::new(ErrorKind::FileError {
                    path: path.as_path().to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("File not found: {}", path),
                    ),
                }))
            })?
            .clone();
        Ok(Box::new(Cursor::new(content)))
    }

    fn walk_directory(
        &self,
        path: &FilePath,
        globs: &[String],
    ) -> MushafResult<Box<dyn Iterator<Item = MushafResult<FilePath>> + '_>> {
        let glob_set = Self::build_glob_set(globs)?;
        let prefix = path.as_relative().normalize();
        let mut matching: Vec<FilePath> = self
            .files
            .lock()
            .keys()
            .filter(|file| file.starts_with(path))
            .filter(|file| {
                let relative = file
                    .as_relative()
                    .normalize()
                    .strip_prefix(&prefix)
                    .map(|p| p.to_relative_path_buf())
                    .unwrap_or_else(|_| file.as_relative().to_relative_path_buf());
                glob_set.is_match(relative.as_str())
            })
            .cloned()
            .collect();
        if matching.is_empty() && !self.files.lock().keys().any(|f| f.starts_with(path)) {
            return Err(Box::new(MushafError::new(ErrorKind::FileError {
                path: path.as_path().to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            })));
        }
        matching.sort();
        Ok(Box::new(matching.into_iter().map(Ok)))
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> MushafResult<HttpServerHandle> {
        let port = match config.port {
            Some(p) => p,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };

        self.http_servers.lock().insert(
            port,
            HttpServerInfo {
                service,
                _config: config,
            },
        );

        Ok(HttpServerHandle::new(port))
    }
}
