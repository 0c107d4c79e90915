//! The canonical outbound response.

use std::collections::HashMap;

/// A response in the canonical `(status, headers, body)` shape.
///
/// During dispatch one of these lives on the request context as the
/// in-progress response; plain-text handler returns are written into it so
/// any status or headers the handler set beforehand survive.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a response with HTML content.
    pub fn html(body: impl Into<String>) -> Self {
        let body_str = body.into();
        Self {
            status: 200,
            headers: [(
                "Content-Type".to_string(),
                "text/html; charset=utf-8".to_string(),
            )]
            .into_iter()
            .collect(),
            body: body_str.into_bytes(),
        }
        .finish()
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        let body_str = body.into();
        Self {
            status: 200,
            headers: [(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )]
            .into_iter()
            .collect(),
            body: body_str.into_bytes(),
        }
        .finish()
    }

    /// Creates a response with JSON content.
    pub fn json<T: serde::Serialize>(data: &T) -> Self {
        match serde_json::to_vec(data) {
            Ok(body) => Self {
                status: 200,
                headers: [("Content-Type".to_string(), "application/json".to_string())]
                    .into_iter()
                    .collect(),
                body,
            }
            .finish(),
            Err(_) => Self::new(500),
        }
    }

    /// Creates a redirect response.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            status: 302,
            headers: [("Location".to_string(), url.into())].into_iter().collect(),
            body: Vec::new(),
        }
    }

    /// Creates the canonical not-found response: empty body, explicit zero
    /// content length.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404).header("Content-Length", "0")
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Seals the response for the transport by recording its content
    /// length. An explicitly set `Content-Length` is left untouched.
    #[must_use]
    pub fn finish(mut self) -> Self {
        if !self.headers.contains_key("Content-Length") {
            self.headers
                .insert("Content-Length".to_string(), self.body.len().to_string());
        }
        self
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns the status text for the current status code.
    #[must_use]
    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            409 => "Conflict",
            422 => "Unprocessable Entity",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}
