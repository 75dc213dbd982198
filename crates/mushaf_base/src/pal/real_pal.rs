use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use crate::{MushafError, MushafResult, error::ErrorKind};

use super::FilePath;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use super::traits::{Pal, ReadSeek};

/// How long a worker blocks on the listener before re-checking the shutdown flag.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Concrete PAL implementation using the real filesystem and tiny_http.
///
/// All file paths are resolved relative to a configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }

    fn file_error(path: PathBuf, source: std::io::Error) -> Box<MushafError> {
        Box::new(MushafError::new(ErrorKind::FileError { path, source }))
    }

    #[instrument(skip(self))]
    fn build_glob_set(&self, globs: &[String]) -> MushafResult<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for glob in globs {
            let compiled = GlobBuilder::new(glob).build().map_err(|e| {
                debug!(pattern = %glob, error = %e, "failed to compile glob pattern");
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

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> MushafResult<Box<dyn ReadSeek + 'static>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "opening file for reading");
        let file = fs::File::open(&resolved).map_err(|e| Self::file_error(resolved, e))?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path, globs = ?globs))]
    fn walk_directory(
        &self,
        path: &FilePath,
        globs: &[String],
    ) -> MushafResult<Box<dyn Iterator<Item = MushafResult<FilePath>> + '_>> {
        let resolved = self.resolve_path(path);

        if !resolved.is_dir() {
            debug!(resolved = %resolved.display(), "directory not found");
            return Err(Self::file_error(
                resolved,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }

        let glob_set = self.build_glob_set(globs)?;
        let base_path = path.clone();
        let iter = WalkDir::new(&resolved)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(e) => {
                    if !e.file_type().is_file() {
                        return None;
                    }
                    let relative = e.path().strip_prefix(&resolved).ok()?;
                    if glob_set.is_match(relative) {
                        let full_relative = base_path.as_path().join(relative);
                        Some(Ok(FilePath::from(full_relative.as_path())))
                    } else {
                        None
                    }
                }
                Err(e) => {
                    debug!(error = %e, "error walking directory");
                    let path = e
                        .path()
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| PathBuf::from("unknown"));
                    Some(Err(Self::file_error(path, std::io::Error::other(e.to_string()))))
                }
            });

        Ok(Box::new(iter))
    }

    #[instrument(skip(self, service), fields(address = %config.address(), workers = config.workers))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> MushafResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address()).map_err(|e| {
            Box::new(MushafError::message(format!(
                "Failed to bind HTTP server on {}: {}",
                config.address(),
                e
            )))
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("HTTP server is not listening on an IP address"))?;

        let server = Arc::new(server);
        let service: Arc<dyn HttpService> = Arc::from(service);
        let shutdown = Arc::new(AtomicBool::new(false));

        // Dropping the handle on a failed spawn stops the workers already running.
        let handle = HttpServerHandle::with_workers(port, Arc::clone(&shutdown), Vec::new());
        for worker_id in 0..config.workers.max(1) {
            let server = Arc::clone(&server);
            let service = Arc::clone(&service);
            let shutdown = Arc::clone(&shutdown);
            let server_name = config.server_name.clone();
            let worker = std::thread::Builder::new()
                .name(format!("http-worker-{}", worker_id))
                .spawn(move || serve_requests(&server, service.as_ref(), &shutdown, &server_name))
                .map_err(|e| crate::err!("Failed to spawn HTTP worker: {}", e))?;
            handle.add_worker(worker);
        }

        info!(port, "HTTP server started");
        Ok(handle)
    }
}

fn serve_requests(
    server: &tiny_http::Server,
    service: &dyn HttpService,
    shutdown: &AtomicBool,
    server_name: &str,
) {
    while !shutdown.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(RECV_POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "failed to receive HTTP request");
                continue;
            }
        };
        handle_request(request, service, server_name);
    }
    debug!("HTTP worker stopped");
}

fn handle_request(mut request: tiny_http::Request, service: &dyn HttpService, server_name: &str) {
    let url = request.url().to_string();
    let response = match HttpMethod::parse(request.method().as_str()) {
        Some(method) => {
            let mut body = Vec::new();
            if let Err(e) = request.as_reader().read_to_end(&mut body) {
                warn!(url = %url, error = %e, "failed to read request body");
            }
            let mut http_request = HttpRequest::new(method, url.clone()).with_body(body);
            for header in request.headers() {
                http_request = http_request.with_header(header.field.to_string(), header.value.to_string());
            }
            match service.handle_request(http_request) {
                Ok(response) => response,
                Err(e) => {
                    error!(url = %url, error = %e, "service failed to handle request");
                    HttpResponse::text(e.to_string())
                        .with_status(HttpStatusCode::NetworkConnectTimeoutError)
                }
            }
        }
        None => HttpResponse::text("Unsupported method").with_status(HttpStatusCode::MethodNotAllowed),
    };

    let status = response.status();
    debug!(url = %url, status = status.as_u16(), "responding");

    let mut tiny_response = tiny_http::Response::from_data(response.body().as_bytes().to_vec())
        .with_status_code(status.as_u16());
    let headers = response
        .headers()
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .chain(std::iter::once(("Server", server_name)));
    for (key, value) in headers {
        match tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()) {
            Ok(header) => tiny_response.add_header(header),
            Err(()) => warn!(header = key, "dropping invalid response header"),
        }
    }

    if let Err(e) = request.respond(tiny_response) {
        warn!(url = %url, error = %e, "failed to send HTTP response");
    }
}
