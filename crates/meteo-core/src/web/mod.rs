//! Minimal HTTP front end
//!
//! Socket-free: the caller feeds received bytes into a [`RequestScanner`]
//! until the blank line that ends the headers, picks a [`Route`] from the
//! request text and writes the [`Response`] head and body back.

pub mod pages;

use alloc::string::String;
use core::fmt;

use log::warn;

pub use pages::{render_dashboard, render_live};

/// Requests longer than this are truncated; only the request line matters.
pub const MAX_REQUEST_BYTES: usize = 1024;

/// Client read timeout used by the station's accept loop.
pub const CLIENT_TIMEOUT_MS: u64 = 5_000;

/// Accumulates one request and detects the end of its header block.
#[derive(Debug, Default)]
pub struct RequestScanner {
    request: heapless::Vec<u8, MAX_REQUEST_BYTES>,
    line_len: usize,
    complete: bool,
}

impl RequestScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns `true` once the header block is complete.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.complete {
            return true;
        }
        // Overflowing bytes are dropped, scanning continues
        let _ = self.request.push(byte);

        match byte {
            b'\n' if self.line_len == 0 => self.complete = true,
            b'\n' => self.line_len = 0,
            b'\r' => {}
            _ => self.line_len += 1,
        }
        self.complete
    }

    /// Feed a chunk, stopping at the end of the header block.
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        bytes.iter().any(|&b| self.push(b))
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Request received so far, cut at the last complete UTF-8 character.
    pub fn request(&self) -> &str {
        match core::str::from_utf8(&self.request) {
            Ok(text) => text,
            Err(e) => core::str::from_utf8(&self.request[..e.valid_up_to()]).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Live,
    Dashboard,
}

impl Route {
    /// Anything that is not a dashboard request gets the live page.
    pub fn from_request(request: &str) -> Self {
        if request.contains("GET /dashboard") {
            Self::Dashboard
        } else {
            Self::Live
        }
    }
}

pub const RESPONSE_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n";

/// A complete `200 OK` HTML response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub body: String,
}

impl Response {
    /// Render a page into a fresh response body.
    pub fn render<F>(page: &'static str, render: F) -> Self
    where
        F: FnOnce(&mut String) -> fmt::Result,
    {
        let mut body = String::new();
        if render(&mut body).is_err() {
            warn!("Rendering the {} page failed", page);
        }
        Self { body }
    }

    pub fn head(&self) -> &'static str {
        RESPONSE_HEAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_waits_for_blank_line() {
        let mut scanner = RequestScanner::new();
        assert!(!scanner.feed(b"GET /dashboard HTTP/1.1\r\n"));
        assert!(!scanner.feed(b"Host: station\r\n"));
        assert!(scanner.feed(b"\r\n"));
        assert!(scanner.is_complete());
        assert!(scanner.request().starts_with("GET /dashboard HTTP/1.1\r\n"));
    }

    #[test]
    fn test_scanner_accepts_bare_newlines() {
        let mut scanner = RequestScanner::new();
        assert!(scanner.feed(b"GET / HTTP/1.0\n\n"));
    }

    #[test]
    fn test_scanner_ignores_bytes_after_completion() {
        let mut scanner = RequestScanner::new();
        assert!(scanner.feed(b"GET / HTTP/1.1\r\n\r\nbody"));
        assert_eq!(scanner.request(), "GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn test_scanner_bounds_request() {
        let mut scanner = RequestScanner::new();
        scanner.feed(b"GET / HTTP/1.1\r\n");
        for _ in 0..100 {
            scanner.feed(b"X-Padding: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n");
        }
        assert!(scanner.feed(b"\r\n"));
        assert_eq!(scanner.request().len(), MAX_REQUEST_BYTES);
    }

    #[test]
    fn test_routes() {
        assert_eq!(
            Route::from_request("GET /dashboard HTTP/1.1\r\n\r\n"),
            Route::Dashboard
        );
        assert_eq!(Route::from_request("GET / HTTP/1.1\r\n\r\n"), Route::Live);
        assert_eq!(Route::from_request("GET /favicon.ico HTTP/1.1"), Route::Live);
        assert_eq!(Route::from_request("POST /dashboard HTTP/1.1"), Route::Live);
        assert_eq!(Route::from_request(""), Route::Live);
    }

    #[test]
    fn test_response_head() {
        let response = Response::render("test", |out| {
            out.push_str("<p>hi</p>");
            Ok(())
        });
        assert_eq!(
            response.head(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n"
        );
        assert_eq!(response.body, "<p>hi</p>");
    }
}
