//! The rendering-collaborator contract.
//!
//! Template evaluation is external to this crate. Handlers reach the
//! installed engine through [`App::render`](crate::App::render) and treat
//! its output as ordinary response text.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::Result;

/// A template engine as seen by the dispatcher.
pub trait Renderer: Send + Sync {
    /// Renders the named template with the given locals.
    fn render(&self, name: &str, locals: &HashMap<String, Value>) -> Result<String>;
}
