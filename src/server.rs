//! HTTP server for the browser gallery.
//!
//! A minimal HTTP/1.1 server on `std::net::TcpListener`: one thread per
//! connection, one request per connection (`Connection: close`). Every data
//! request re-walks the collection, so edits on disk show up on the next page
//! load without a restart.
//!
//! ## Routes
//!
//! | Route                | Response                                   |
//! |----------------------|--------------------------------------------|
//! | `/`                  | Index shell loading the renderer           |
//! | `/about`             | About page from `about.json`               |
//! | `/api/data`          | `{ entries, config }` from a fresh scan     |
//! | `/api/translations`  | The dictionary file                        |
//! | `/images/<path>`     | Original images                            |
//! | `/thumbnails/<path>` | Generated thumbnails                       |
//! | `/static/<path>`     | Renderer assets                            |
//!
//! Only `GET` and `HEAD` are accepted. File paths are percent-decoded and
//! must stay inside their root: any `..`, absolute or empty path is a 404.

use crate::config::ArchiveConfig;
use crate::metadata::get_json_data;
use crate::pages::{ABOUT_FILE, render_about, render_index};
use crate::scan::{ScanOptions, scan};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Upper bound on the request line plus headers.
const MAX_HEAD_BYTES: usize = 16 * 1024;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Everything a request handler needs. Read-only and shared across threads.
#[derive(Debug, Clone)]
pub struct AppState {
    pub scan: ScanOptions,
    pub static_root: PathBuf,
}

impl AppState {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            scan: ScanOptions::from_config(config),
            static_root: config.static_root(),
        }
    }
}

// ============================================================================
// Request / Response
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other,
}

/// The parts of a request the router looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Raw request target without the query string, still percent-encoded.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub allow: Option<&'static str>,
}

impl Response {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
            allow: None,
        }
    }

    pub fn html(markup: maud::Markup) -> Self {
        Self::ok("text/html; charset=utf-8", markup.into_string())
    }

    pub fn not_found() -> Self {
        Self::text(404, "Not Found")
    }

    pub fn internal_error() -> Self {
        Self::text(500, "Internal Server Error")
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
            allow: None,
        }
    }

    fn method_not_allowed() -> Self {
        Self {
            allow: Some("GET, HEAD"),
            ..Self::text(405, "Method Not Allowed")
        }
    }

    /// Serialize onto the wire. `HEAD` responses keep the headers of the
    /// equivalent `GET` but drop the body.
    pub fn write_to(&self, out: &mut impl Write, head_only: bool) -> io::Result<()> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            self.body.len()
        );
        if let Some(allow) = self.allow {
            let _ = write!(head, "Allow: {allow}\r\n");
        }
        head.push_str("Connection: close\r\n\r\n");

        out.write_all(head.as_bytes())?;
        if !head_only {
            out.write_all(&self.body)?;
        }
        out.flush()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "",
    }
}

/// Read the request line and headers. Headers are consumed and ignored.
///
/// At most [`MAX_HEAD_BYTES`] are read, request line included.
pub fn parse_request(reader: &mut impl BufRead) -> Result<Request, ServerError> {
    let mut head = reader.by_ref().take(MAX_HEAD_BYTES as u64);

    let mut request_line = String::new();
    if read_head_line(&mut head, &mut request_line)? == 0 {
        return Err(ServerError::BadRequest("empty request".into()));
    }

    loop {
        let mut line = String::new();
        let n = read_head_line(&mut head, &mut line)?;
        if n == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(ServerError::BadRequest(format!(
            "malformed request line {:?}",
            request_line.trim_end()
        )));
    };

    let method = match method {
        "GET" => Method::Get,
        "HEAD" => Method::Head,
        _ => Method::Other,
    };
    let path = target.split(['?', '#']).next().unwrap_or("/").to_string();
    Ok(Request { method, path })
}

/// Read one line of the head; running out of budget mid-line is an error.
fn read_head_line<R: BufRead>(
    head: &mut io::Take<R>,
    line: &mut String,
) -> Result<usize, ServerError> {
    let n = head.read_line(line)?;
    if head.limit() == 0 && !line.ends_with('\n') {
        return Err(ServerError::BadRequest("request head too large".into()));
    }
    Ok(n)
}

// ============================================================================
// Routing
// ============================================================================

/// Route a request to its response.
pub fn handle(state: &AppState, request: &Request) -> Response {
    if request.method == Method::Other {
        return Response::method_not_allowed();
    }

    let path = request.path.as_str();
    match path {
        "/" | "/index.html" => Response::html(render_index()),
        "/about" => {
            let about = get_json_data(&state.scan.images_root.join(ABOUT_FILE));
            Response::html(render_about(&about))
        }
        "/api/data" => collection_data(state),
        "/api/translations" => {
            let dictionary = get_json_data(&state.scan.dictionary_path);
            json_response(&dictionary)
        }
        _ => {
            if let Some(rel) = path.strip_prefix("/images/") {
                serve_file(&state.scan.images_root, rel)
            } else if let Some(rel) = path.strip_prefix("/thumbnails/") {
                serve_file(&state.scan.thumbnails_root, rel)
            } else if let Some(rel) = path.strip_prefix("/static/") {
                serve_file(&state.static_root, rel)
            } else {
                Response::not_found()
            }
        }
    }
}

fn collection_data(state: &AppState) -> Response {
    match scan(&state.scan) {
        Ok(collection) => json_response(&collection.payload()),
        Err(e) => {
            error!(error = %e, "collection scan failed");
            Response::internal_error()
        }
    }
}

fn json_response<T: serde::Serialize + ?Sized>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => Response::ok("application/json", body),
        Err(e) => {
            error!(error = %e, "failed to serialize response");
            Response::internal_error()
        }
    }
}

fn serve_file(root: &Path, encoded: &str) -> Response {
    let Some(path) = resolve_path(root, encoded) else {
        debug!(path = encoded, "rejected file path");
        return Response::not_found();
    };
    if !path.is_file() {
        return Response::not_found();
    }
    match fs::read(&path) {
        Ok(body) => Response::ok(content_type(&path), body),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read file");
            Response::not_found()
        }
    }
}

/// Map a percent-encoded relative URL path onto `root`.
///
/// Returns `None` for anything that could leave the root: `..`, `.`,
/// absolute paths, Windows prefixes, empty paths, invalid encodings.
pub fn resolve_path(root: &Path, encoded: &str) -> Option<PathBuf> {
    let decoded = percent_decode(encoded)?;
    if decoded.is_empty() || decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }

    let rel = Path::new(&decoded);
    let mut resolved = root.to_path_buf();
    for component in rel.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            _ => return None,
        }
    }
    if resolved == root {
        return None;
    }
    Some(resolved)
}

/// Decode `%XX` escapes. The result must be valid UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3)?;
                let hex = std::str::from_utf8(hex).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).ok()
}

/// Content type by file extension.
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "css" => "text/css",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Server
// ============================================================================

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Bind to `addr` (port 0 picks a free port).
    pub fn bind(addr: impl ToSocketAddrs, state: AppState) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            state: Arc::new(state),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one thread each.
    pub fn serve(self) -> Result<(), ServerError> {
        let addr = self.local_addr()?;
        info!(%addr, images = %self.state.scan.images_root.display(), "serving");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let state = Arc::clone(&self.state);
                    thread::spawn(move || handle_connection(stream, &state));
                }
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }
        Ok(())
    }

    /// Run [`Server::serve`] on a background thread.
    pub fn spawn(self) -> thread::JoinHandle<Result<(), ServerError>> {
        thread::spawn(move || self.serve())
    }
}

fn handle_connection(stream: TcpStream, state: &AppState) {
    let started = Instant::now();
    let _ = stream.set_read_timeout(Some(READ_TIMEOUT));

    let mut reader = BufReader::new(&stream);
    let request = match parse_request(&mut reader) {
        Ok(r) => r,
        Err(ServerError::BadRequest(msg)) => {
            debug!(reason = %msg, "bad request");
            let _ = Response::text(400, "Bad Request").write_to(&mut &stream, false);
            return;
        }
        Err(ServerError::Io(e)) => {
            debug!(error = %e, "connection dropped");
            return;
        }
    };

    let response = handle(state, &request);
    info!(
        method = ?request.method,
        path = %request.path,
        status = response.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    if let Err(e) = response.write_to(&mut &stream, request.method == Method::Head) {
        debug!(error = %e, "failed to write response");
    }
}

// ============================================================================
// Tests
// ============================================================================
