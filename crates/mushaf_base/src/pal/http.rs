/* 📖 # Why a dedicated HTTP module in the PAL?

The HTTP abstraction lets the corpus API be served by tiny_http in production
while tests push requests straight into the service through MockPal. The
types are plain data: no async runtime, no framework routing, and a service
is just "request in, response out".
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;

/// Request methods passed on to a service. The corpus API is read-only and
/// only answers GET; the others reach the service so it can reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Parse a request-line method, ignoring case. Unknown methods yield `None`.
    pub fn parse(method: &str) -> Option<Self> {
        [Self::Get, Self::Head, Self::Post, Self::Put, Self::Delete]
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(method))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP headers collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: HashMap<String, String>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.inner.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.inner.iter()
    }
}

/// Request or response body. All corpus responses are small JSON documents,
/// so the body is always a complete byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpBody(Vec<u8>);

impl HttpBody {
    pub fn empty() -> Self {
        Self(vec![])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get content as a string if valid UTF-8.
    pub fn as_string(&self) -> Option<String> {
        String::from_utf8(self.0.clone()).ok()
    }

}

impl From<Vec<u8>> for HttpBody {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<String> for HttpBody {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for HttpBody {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// HTTP request structure. `path` includes the raw (still percent-encoded)
/// query string, exactly as received on the request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    path: String,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }
}

/// HTTP status codes used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatusCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    /// Returned for service errors so they stand out from regular statuses.
    NetworkConnectTimeoutError = 599,
}

impl HttpStatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// HTTP response structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: HttpStatusCode,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpResponse {
    pub fn new(status: HttpStatusCode) -> Self {
        Self {
            status,
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatusCode::Ok)
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    pub fn with_status(mut self, status: HttpStatusCode) -> Self {
        self.status = status;
        self
    }

    /// Create a 200 JSON response.
    pub fn json(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("application/json")
            .with_body(body.into())
    }

    /// Create a plain text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("text/plain; charset=utf-8")
            .with_body(body.into())
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on. If None, the OS will assign an available port.
    pub port: Option<u16>,
    /// Number of worker threads pulling requests off the listener.
    pub workers: usize,
    /// Server name used in responses.
    pub server_name: String,
}

impl HttpServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Get the address string (host:port, port 0 meaning OS-assigned).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(0))
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            workers: 4,
            server_name: "mushaf-server".to_string(),
        }
    }
}

/* 📖 # Why a single HttpService trait?

The service receives raw HttpRequest objects and returns HttpResponse objects,
so the application owns all routing. Implementations must be Send + Sync
because RealPal shares one service instance across its worker threads.
*/

/// Trait for handling HTTP requests.
pub trait HttpService: std::fmt::Debug + Send + Sync + 'static {
    /// Handle an HTTP request and return a response.
    ///
    /// Errors are returned as `MushafResult::Err` and converted by the PAL
    /// implementation into HTTP 599 responses carrying the error message.
    fn handle_request(&self, request: HttpRequest) -> crate::MushafResult<HttpResponse>;
}

/// Handle to a running HTTP server.
///
/// Dropping the handle signals the server to shut down.
#[derive(Debug)]
pub struct HttpServerHandle {
    port: u16,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpServerHandle {
    pub fn new(port: u16) -> Self {
        Self::with_workers(port, Arc::new(AtomicBool::new(false)), vec![])
    }

    /// Create a handle owning the given worker threads and shutdown flag.
    pub fn with_workers(port: u16, shutdown: Arc<AtomicBool>, workers: Vec<JoinHandle<()>>) -> Self {
        Self {
            port,
            shutdown,
            workers: Mutex::new(workers),
        }
    }

    /// Hand a running worker thread to this handle.
    pub fn add_worker(&self, worker: JoinHandle<()>) {
        self.workers.lock().push(worker);
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn address(&self, host: &str) -> String {
        format!("{}:{}", host, self.port)
    }

    /// Signal the server to shut down. Workers finish their current request.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Block until all worker threads have exited.
    pub fn wait(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            let _ = worker.join();
        }
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("BREW"), None);
        assert_eq!(HttpMethod::parse(""), None);
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }

    #[test]
    fn test_http_body_utf8() {
        let body = HttpBody::from("بسم");
        assert_eq!(body.as_string(), Some("بسم".to_string()));
        assert_eq!(body.as_bytes().len(), 6);
        assert_eq!(HttpBody::from(vec![0xff]).as_string(), None);
    }

    #[test]
    fn test_http_response_json() {
        let json = HttpResponse::json("{\"chapters\": 114}");
        assert_eq!(json.status(), HttpStatusCode::Ok);
        assert_eq!(
            json.headers().get("Content-Type"),
            Some(&"application/json".to_string())
        );

        let rejected = HttpResponse::json("{}").with_status(HttpStatusCode::BadRequest);
        assert_eq!(rejected.status().as_u16(), 400);
    }

    #[test]
    fn test_http_server_config() {
        let config = HttpServerConfig::new("0.0.0.0")
            .with_port(8080)
            .with_workers(0);

        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.workers, 1);
        assert_eq!(config.server_name, "mushaf-server");
        assert_eq!(HttpServerConfig::default().address(), "127.0.0.1:0");
    }

    #[test]
    fn test_http_server_handle_shutdown() {
        let handle = HttpServerHandle::new(8080);
        assert_eq!(handle.address("127.0.0.1"), "127.0.0.1:8080");
        assert!(!handle.is_shutdown());
        handle.shutdown();
        assert!(handle.is_shutdown());
        handle.wait();
    }

    #[test]
    fn test_dropping_handle_stops_added_workers() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = HttpServerHandle::with_workers(0, Arc::clone(&shutdown), Vec::new());
        let worker = {
            let shutdown = Arc::clone(&shutdown);
            let stopped = Arc::clone(&stopped);
            std::thread::spawn(move || {
                while !shutdown.load(Ordering::SeqCst) {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
                stopped.store(true, Ordering::SeqCst);
            })
        };
        handle.add_worker(worker);
        drop(handle);

        assert!(shutdown.load(Ordering::SeqCst));
        for _ in 0..200 {
            if stopped.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(stopped.load(Ordering::SeqCst));
    }
}
