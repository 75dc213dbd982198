use std::io::{Read, Seek};
use std::sync::Arc;

use crate::MushafResult;

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/// Trait combining Read + Seek for file operations.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/* 📖 # Why is Pal a trait instead of a struct?

The loader and the HTTP layer only ever talk to a Pal. RealPal reads data
files from disk and serves HTTP through tiny_http; MockPal keeps files in a
HashMap and lets tests call a service directly. Swapping the implementation
needs no change to engine code.
*/

/// Platform Abstraction Layer (PAL) trait providing file and HTTP operations.
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> MushafResult<Box<dyn ReadSeek + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> MushafResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(crate::MushafError::new(crate::ErrorKind::FileError {
                path: path.as_path().to_path_buf(),
                source: e,
            }))
        })?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Walk a directory tree, yielding paths matching any of the glob patterns.
    ///
    /// Patterns are matched against paths relative to `path`. Returned paths
    /// include `path` as prefix.
    fn walk_directory(
        &self,
        path: &FilePath,
        globs: &[String],
    ) -> MushafResult<Box<dyn Iterator<Item = MushafResult<FilePath>> + '_>>;

    /// Start an HTTP server with the given service.
    ///
    /// The server starts listening immediately. Dropping the returned handle
    /// (or calling `shutdown()`) stops it.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> MushafResult<HttpServerHandle>;
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// # Examples
///
/// ```no_run
/// use mushaf_base::{RealPal, PalHandle};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
