//! Handler return values and response coercion.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::DispatchError;
use crate::response::Response;

/// The value vocabulary a handler may produce.
///
/// `From` conversions cover the usual shapes, so handlers end with
/// `Ok("hello".into())`, `Ok(("created", 201).into())` or
/// `Ok(response.into())`.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Plain text, written into the request's in-progress response.
    Text(String),
    /// An already-canonical response, passed through unchanged.
    Response(Response),
    /// A dynamically shaped value: a string, a `[body, status]` pair or a
    /// `[status, headers, body]` triple. Anything else is rejected at
    /// coercion time.
    Value(Value),
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl<S: Into<String>> From<(S, u16)> for Reply {
    fn from((body, status): (S, u16)) -> Self {
        let body: String = body.into();
        Self::Value(json!([body, status]))
    }
}

impl From<(u16, HashMap<String, String>, Vec<String>)> for Reply {
    fn from((status, headers, body): (u16, HashMap<String, String>, Vec<String>)) -> Self {
        Self::Value(json!([status, headers, body]))
    }
}

/// Normalizes a handler's return value into the canonical response shape.
///
/// `base` is the request's in-progress response; plain text is written into
/// it so any status or headers the handler set beforehand survive. Shapes
/// outside the vocabulary fail with
/// [`DispatchError::InvalidResponse`](crate::DispatchError::InvalidResponse)
/// naming the offending value.
pub fn coerce(reply: Reply, base: Response) -> Result<Response, DispatchError> {
    match reply {
        Reply::Response(response) => Ok(response),
        Reply::Text(text) => Ok(write_text(base, text)),
        Reply::Value(value) => coerce_value(value, base),
    }
}

fn write_text(mut base: Response, text: String) -> Response {
    base.body = text.into_bytes();
    if !base.headers.contains_key("Content-Type") {
        base.headers.insert(
            "Content-Type".to_string(),
            "text/html; charset=utf-8".to_string(),
        );
    }
    base.finish()
}

fn coerce_value(value: Value, base: Response) -> Result<Response, DispatchError> {
    match value {
        Value::String(text) => Ok(write_text(base, text)),
        Value::Array(items) => match items.len() {
            2 => {
                let mut items = items.into_iter();
                let body = items.next().unwrap_or(Value::Null);
                let status = items.next().unwrap_or(Value::Null);
                let status = as_status(&status).ok_or_else(|| {
                    DispatchError::InvalidResponse("non-integer status in pair".to_string())
                })?;
                Ok(coerce_value(body, base)?.status(status))
            }
            3 => {
                let mut items = items.into_iter();
                let status = items.next().unwrap_or(Value::Null);
                let headers = items.next().unwrap_or(Value::Null);
                let body = items.next().unwrap_or(Value::Null);
                canonical_triple(&status, headers, body)
            }
            len => Err(DispatchError::InvalidResponse(format!(
                "array of length {len}"
            ))),
        },
        other => Err(DispatchError::InvalidResponse(shape_of(&other).to_string())),
    }
}

/// Builds a response directly from an already-canonical triple. No headers
/// are added; the triple is taken as-is.
fn canonical_triple(
    status: &Value,
    headers: Value,
    body: Value,
) -> Result<Response, DispatchError> {
    let status = as_status(status).ok_or_else(|| {
        DispatchError::InvalidResponse("non-integer status in triple".to_string())
    })?;

    let Value::Object(header_map) = headers else {
        return Err(DispatchError::InvalidResponse(
            "non-object headers in triple".to_string(),
        ));
    };

    let mut response = Response::new(status);
    for (name, value) in header_map {
        let Value::String(value) = value else {
            return Err(DispatchError::InvalidResponse(format!(
                "non-string value for header `{name}`"
            )));
        };
        response.headers.insert(name, value);
    }

    let Value::Array(chunks) = body else {
        return Err(DispatchError::InvalidResponse(
            "non-array body in triple".to_string(),
        ));
    };
    for chunk in chunks {
        let Value::String(chunk) = chunk else {
            return Err(DispatchError::InvalidResponse(
                "non-string body chunk in triple".to_string(),
            ));
        };
        response.body.extend_from_slice(chunk.as_bytes());
    }

    Ok(response)
}

fn as_status(value: &Value) -> Option<u16> {
    value.as_u64().and_then(|status| u16::try_from(status).ok())
}

fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_coerces_to_ok() {
        let response = coerce("hello".into(), Response::ok()).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_string(), Some("hello".to_string()));
        assert_eq!(
            response.headers.get("Content-Length"),
            Some(&"5".to_string())
        );
    }

    #[test]
    fn test_text_preserves_preset_status_and_headers() {
        let base = Response::new(418).header("X-Teapot", "yes");
        let response = coerce("short and stout".into(), base).unwrap();
        assert_eq!(response.status, 418);
        assert_eq!(response.headers.get("X-Teapot"), Some(&"yes".to_string()));
        assert_eq!(response.body_string(), Some("short and stout".to_string()));
    }

    #[test]
    fn test_text_does_not_override_content_type() {
        let base = Response::ok().header("Content-Type", "text/csv");
        let response = coerce("a,b".into(), base).unwrap();
        assert_eq!(
            response.headers.get("Content-Type"),
            Some(&"text/csv".to_string())
        );
    }

    #[test]
    fn test_pair_overrides_status() {
        let response = coerce(("hello", 201).into(), Response::ok()).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body_string(), Some("hello".to_string()));
    }

    #[test]
    fn test_triple_passes_through_unchanged() {
        let reply = Reply::from((200, HashMap::new(), vec!["x".to_string()]));
        let response = coerce(reply, Response::ok()).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.headers.is_empty());
        assert_eq!(response.body_string(), Some("x".to_string()));
    }

    #[test]
    fn test_triple_headers_are_kept() {
        let headers: HashMap<String, String> =
            [("X-Kind".to_string(), "triple".to_string())].into();
        let reply = Reply::from((204, headers, Vec::new()));
        let response = coerce(reply, Response::ok()).unwrap();
        assert_eq!(response.status, 204);
        assert_eq!(response.headers.get("X-Kind"), Some(&"triple".to_string()));
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_canonical_response_passes_through() {
        let canned = Response::new(302).header("Location", "/login");
        let response = coerce(canned.into(), Response::ok()).unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(response.headers.get("Location"), Some(&"/login".to_string()));
    }

    #[test]
    fn test_length_four_array_is_rejected() {
        let err = coerce(Reply::Value(json!([1, 2, 3, 4])), Response::ok()).unwrap_err();
        match err {
            DispatchError::InvalidResponse(shape) => {
                assert_eq!(shape, "array of length 4");
            }
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_number_is_rejected() {
        let err = coerce(Reply::Value(json!(42)), Response::ok()).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidResponse(shape) if shape == "number"));
    }

    #[test]
    fn test_pair_with_bad_status_is_rejected() {
        let err = coerce(Reply::Value(json!(["body", "nope"])), Response::ok()).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidResponse(_)));
    }

    #[test]
    fn test_nested_pair_body_recurses() {
        // A pair whose body is itself a triple: the triple is coerced
        // first, then the outer status wins.
        let reply = Reply::Value(json!([[204, {}, []], 200]));
        let response = coerce(reply, Response::ok()).unwrap();
        assert_eq!(response.status, 200);
    }
}
