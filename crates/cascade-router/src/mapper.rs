//! Route registration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::app::{App, Args, BoxFuture, HandlerFn, Rule, TargetId};
use crate::context::RequestContext;
use crate::error::PatternError;
use crate::matcher::{Matcher, Predicate};
use crate::path::PathPattern;
use crate::reply::Reply;
use crate::request::Method;

/// Configuration for one pushed rule.
#[derive(Debug, Clone)]
pub struct RuleOptions {
    defaults: HashMap<String, Value>,
    methods: HashSet<Method>,
    partial: bool,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            defaults: HashMap::new(),
            methods: [Method::Get].into_iter().collect(),
            partial: false,
        }
    }
}

impl RuleOptions {
    /// The default options: GET only, anchored, no injected values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the allowed method set.
    #[must_use]
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = methods.iter().copied().collect();
        self
    }

    /// Injects a default capture value whenever the rule matches. Values
    /// actually captured from the path win over these.
    #[must_use]
    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Allows the pattern to stop short of the end of the path, leaving a
    /// remainder for nested dispatch.
    #[must_use]
    pub fn partial(mut self) -> Self {
        self.partial = true;
        self
    }
}

/// Accumulates pending rules and binds them to handlers.
///
/// Declaration sites list one or more patterns immediately above the
/// handler that serves them; [`handle`](Self::handle) then binds everything
/// pushed since the last drain to that one handler, with no explicit
/// end-of-block marker. Because a mapper holds the [`App`] mutably, at most
/// one can be live at a time.
///
/// ```ignore
/// let mut routes = app.mapper(pages);
/// routes.push("/", RuleOptions::new().default_value("name", "index"))?;
/// routes.push("/pages/<name>", RuleOptions::new())?;
/// routes.handle("show", &["name"], show_page);
/// ```
pub struct Mapper<'app> {
    app: &'app mut App,
    target: TargetId,
    pending: Vec<(Matcher, String)>,
}

impl<'app> Mapper<'app> {
    pub(crate) fn new(app: &'app mut App, target: TargetId) -> Self {
        Self {
            app,
            target,
            pending: Vec::new(),
        }
    }

    /// Compiles a rule and stacks it pending until the next
    /// [`handle`](Self::handle).
    ///
    /// The rule's predicate chain runs defaults injection, then the method
    /// filter, then the path pattern.
    pub fn push(&mut self, pattern: &str, options: RuleOptions) -> Result<(), PatternError> {
        let path = PathPattern::compile(pattern, options.partial)?;
        let matcher = Matcher::new(vec![
            Predicate::Defaults(options.defaults),
            Predicate::MethodFilter(options.methods),
            Predicate::PathMatch(path),
        ]);
        self.pending.push((matcher, pattern.to_string()));
        Ok(())
    }

    /// [`push`](Self::push) with partial matching forced on; the usual way
    /// to declare a mount point.
    pub fn capture(&mut self, pattern: &str, options: RuleOptions) -> Result<(), PatternError> {
        self.push(pattern, options.partial())
    }

    /// Drains every pending rule onto one handler.
    ///
    /// All rules pushed since the last drain bind to this handler and join
    /// the route table in the order they were declared. Finalizing a
    /// handler with nothing pending registers zero rules; that is the
    /// declaration protocol working as intended, not an error.
    ///
    /// `params` lists the handler's parameter names; at invocation they
    /// are mapped position-by-position onto the same-named captures.
    pub fn handle<F>(&mut self, name: &str, params: &[&str], handler: F)
    where
        F: for<'a> Fn(&'a App, &'a mut RequestContext, Args) -> BoxFuture<'a, crate::error::Result<Reply>>
            + Send
            + Sync
            + 'static,
    {
        let handler: HandlerFn = Arc::new(handler);
        if self.pending.is_empty() {
            debug!(handler = name, "finalized with no pending rules");
        }
        for (matcher, pattern) in self.pending.drain(..) {
            debug!(handler = name, pattern = %pattern, "rule bound");
            self.app.rules.push(Rule {
                matcher,
                target: self.target,
                handler_name: name.to_string(),
                param_names: params.iter().map(|param| (*param).to_string()).collect(),
                handler: Arc::clone(&handler),
            });
        }
    }
}
