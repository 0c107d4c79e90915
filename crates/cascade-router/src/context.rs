//! Per-request state.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{DispatchError, Result};
use crate::matcher::Captures;
use crate::request::Request;
use crate::response::Response;

/// An open key/value store scoped to a single request.
///
/// Keys come into existence on first write; nothing is pre-declared. Three
/// lookup forms are offered: strict [`get`](Self::get) (absence is an
/// error), [`get_opt`](Self::get_opt) (absence is `None`) and the presence
/// check [`has`](Self::has).
#[derive(Debug, Default)]
pub struct Attributes {
    values: HashMap<String, Value>,
}

impl Attributes {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute, creating the key if needed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Strict lookup; a key that was never set is an error.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.values
            .get(key)
            .ok_or_else(|| DispatchError::MissingAttribute(key.to_string()))
    }

    /// Optional lookup.
    #[must_use]
    pub fn get_opt(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns true if the key has been set.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Mutable state confined to one logical request.
///
/// A context is created by [`App::call`](crate::App::call), threaded by
/// mutable reference through dispatch and into handlers, and dropped when
/// the call completes — on success, not-found fallback and error alike —
/// so no per-request state survives into a later request. Concurrent
/// requests each own their context; the confinement, not a lock, is the
/// correctness mechanism.
#[derive(Debug)]
pub struct RequestContext {
    /// The request being dispatched. Its `path` and `mount_prefix` are
    /// rewritten during mounted dispatch and restored afterwards.
    pub request: Request,
    /// The in-progress response that plain-text replies are written into.
    pub response: Response,
    /// One capture frame per nesting level of cascading dispatch; the last
    /// entry belongs to the innermost invocation.
    pub captures: Vec<Captures>,
    /// Cross-handler attribute bag.
    pub attrs: Attributes,
}

impl RequestContext {
    /// Creates the context for one top-level dispatch.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::ok(),
            captures: Vec::new(),
            attrs: Attributes::new(),
        }
    }

    /// The innermost capture frame, if dispatch is inside an invocation.
    #[must_use]
    pub fn innermost(&self) -> Option<&Captures> {
        self.captures.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_lookup_forms() {
        let mut attrs = Attributes::new();
        assert!(!attrs.has("user"));
        assert!(attrs.get_opt("user").is_none());
        assert!(matches!(
            attrs.get("user"),
            Err(DispatchError::MissingAttribute(key)) if key == "user"
        ));

        attrs.set("user", json!({"id": 7}));
        assert!(attrs.has("user"));
        assert_eq!(
            attrs.get("user").unwrap().pointer("/id").and_then(Value::as_i64),
            Some(7)
        );
    }

    #[test]
    fn test_attributes_accept_plain_values() {
        let mut attrs = Attributes::new();
        attrs.set("count", 3);
        attrs.set("name", "zoe");
        assert_eq!(attrs.get_opt("count").and_then(Value::as_i64), Some(3));
        assert_eq!(attrs.get_opt("name").and_then(Value::as_str), Some("zoe"));
    }

    #[test]
    fn test_fresh_context_is_empty() {
        let ctx = RequestContext::new(Request::get("/"));
        assert!(ctx.captures.is_empty());
        assert!(ctx.innermost().is_none());
        assert_eq!(ctx.response.status, 200);
    }
}
