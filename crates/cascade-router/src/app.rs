//! The route table and cascading dispatcher.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::{DispatchError, Result};
use crate::mapper::Mapper;
use crate::matcher::{Captures, Matcher};
use crate::render::Renderer;
use crate::reply::{self, Reply};
use crate::request::Request;
use crate::response::Response;

/// A boxed future, as returned by handlers and nested dispatch.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered handler function.
///
/// Handlers receive the process-wide [`App`], the request's mutable
/// [`RequestContext`] and their bound [`Args`], and may recursively
/// [`pass`](App::pass) to delegate to other targets.
pub type HandlerFn = Arc<
    dyn for<'a> Fn(&'a App, &'a mut RequestContext, Args) -> BoxFuture<'a, Result<Reply>>
        + Send
        + Sync,
>;

/// Identity of a registered handler target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) usize);

/// Arguments bound for one handler invocation.
#[derive(Debug, Clone)]
pub struct Args {
    /// Capture values in declared-parameter order. A parameter with no
    /// corresponding capture is bound to `Value::Null`, never an error.
    pub values: Vec<Value>,
    /// The target the invoked rule is bound to; handlers use it as a
    /// `skip` value when delegating to everyone else.
    pub target: TargetId,
}

impl Args {
    /// The value bound at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The value bound at `index`, as a string.
    #[must_use]
    pub fn str(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Value::as_str)
    }

    /// The value bound at `index`, as an integer.
    #[must_use]
    pub fn int(&self, index: usize) -> Option<i64> {
        self.values.get(index).and_then(Value::as_i64)
    }
}

/// A matcher bound to a handler.
pub(crate) struct Rule {
    pub(crate) matcher: Matcher,
    pub(crate) target: TargetId,
    pub(crate) handler_name: String,
    pub(crate) param_names: Vec<String>,
    pub(crate) handler: HandlerFn,
}

impl Rule {
    /// Maps the declared parameter names, position by position, onto the
    /// accepted captures.
    fn bind_params(&self, captures: &Captures) -> Vec<Value> {
        self.param_names
            .iter()
            .map(|name| captures.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

pub(crate) struct Target {
    pub(crate) id: TargetId,
    pub(crate) name: String,
}

/// Options steering one [`pass`](App::pass).
#[derive(Debug, Clone, Copy, Default)]
pub struct PassOptions {
    to: Option<TargetId>,
    skip: Option<TargetId>,
}

impl PassOptions {
    /// Restricts dispatch to a single target.
    #[must_use]
    pub fn to(target: TargetId) -> Self {
        Self {
            to: Some(target),
            skip: None,
        }
    }

    /// Skips the given target by identity.
    #[must_use]
    pub fn skip(target: TargetId) -> Self {
        Self {
            to: None,
            skip: Some(target),
        }
    }
}

/// Outcome of a dispatch attempt, propagated by return value through every
/// nesting level in place of a non-local exit.
#[derive(Debug)]
pub enum Dispatch {
    /// A handler matched and produced this response; all outer iteration
    /// stops.
    Handled(Response),
    /// No rule matched.
    Unhandled,
}

/// The process-wide application: registered targets, the rule table and
/// the cascading dispatcher.
///
/// Registration happens during startup; the route table must not be
/// mutated once requests are being served (this is a precondition, not
/// guarded at runtime). After startup an `App` serves concurrent requests
/// without locking because each [`call`](Self::call) owns its context.
pub struct App {
    pub(crate) targets: Vec<Target>,
    pub(crate) rules: Vec<Rule>,
    renderer: Option<Arc<dyn Renderer>>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an empty application.
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            rules: Vec::new(),
            renderer: None,
        }
    }

    /// Registers a handler target. Targets are tried in registration
    /// order.
    pub fn add_target(&mut self, name: impl Into<String>) -> TargetId {
        let id = TargetId(self.targets.len());
        self.targets.push(Target {
            id,
            name: name.into(),
        });
        id
    }

    /// Looks up a registered target by name.
    #[must_use]
    pub fn target_id(&self, name: &str) -> Option<TargetId> {
        self.targets
            .iter()
            .find(|target| target.name == name)
            .map(|target| target.id)
    }

    /// Opens a route builder bound to `target`.
    ///
    /// The mutable borrow guarantees at most one builder is live at a
    /// time; rules pushed on it bind to the next finalized handler.
    pub fn mapper(&mut self, target: TargetId) -> Mapper<'_> {
        Mapper::new(self, target)
    }

    /// Installs the rendering collaborator.
    pub fn set_renderer(&mut self, renderer: Arc<dyn Renderer>) {
        self.renderer = Some(renderer);
    }

    /// Renders a template through the installed collaborator. The engine
    /// is external to this crate; its output is ordinary handler text.
    pub fn render(&self, name: &str, locals: &HashMap<String, Value>) -> Result<String> {
        match &self.renderer {
            Some(renderer) => renderer.render(name, locals),
            None => Err(DispatchError::Handler("no renderer installed".into())),
        }
    }

    /// Dispatches one request to completion.
    ///
    /// Tries every registered target in order and answers with the
    /// canonical empty 404 if no rule matches anywhere. Exactly one
    /// response is produced per call; errors from handler code propagate
    /// unmodified. The per-request context is owned by this call, so its
    /// teardown is guaranteed on every exit path.
    pub async fn call(&self, request: Request) -> Result<Response> {
        let mut ctx = RequestContext::new(request);
        match self.pass(&mut ctx, PassOptions::default()).await? {
            Dispatch::Handled(response) => Ok(response),
            Dispatch::Unhandled => {
                debug!(
                    method = %ctx.request.method,
                    path = %ctx.request.path,
                    "no rule matched, answering not found"
                );
                Ok(Response::not_found())
            }
        }
    }

    /// Cascades the current request across registered targets.
    ///
    /// When the innermost capture frame left a remainder, the request path
    /// is rewritten to `/` + remainder and the consumed prefix (trailing
    /// `/` stripped) becomes the mount prefix, so a nested target matches
    /// against the suffix as if it were a fresh path. The rewrite is
    /// undone before this call returns, on success and failure alike.
    pub fn pass<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        options: PassOptions,
    ) -> BoxFuture<'a, Result<Dispatch>> {
        Box::pin(async move {
            let saved_path = ctx.request.path.clone();
            let saved_prefix = ctx.request.mount_prefix.clone();

            if let Some(remaining) = ctx.innermost().and_then(|c| c.remaining.clone()) {
                let matched = ctx
                    .innermost()
                    .map(|c| c.matched.clone())
                    .unwrap_or_default();
                ctx.request.path = format!("/{remaining}");
                // The consumed prefix accumulates across nesting levels so
                // `full_path` always reconstructs the original.
                ctx.request
                    .mount_prefix
                    .push_str(matched.trim_end_matches('/'));
                debug!(
                    path = %ctx.request.path,
                    prefix = %ctx.request.mount_prefix,
                    "mount rewrite installed"
                );
            }

            let outcome = self.scan(ctx, options).await;

            ctx.request.path = saved_path;
            ctx.request.mount_prefix = saved_prefix;
            outcome
        })
    }

    /// Walks targets and their rules in registration order; the first rule
    /// whose predicate chain accepts the request is invoked, and its
    /// response short-circuits everything outer.
    fn scan<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        options: PassOptions,
    ) -> BoxFuture<'a, Result<Dispatch>> {
        Box::pin(async move {
            for target in &self.targets {
                if let Some(only) = options.to {
                    if target.id != only {
                        continue;
                    }
                }
                if options.skip == Some(target.id) {
                    continue;
                }

                for rule in self.rules.iter().filter(|rule| rule.target == target.id) {
                    let Some(captured) = rule.matcher.matches(&ctx.request) else {
                        continue;
                    };
                    debug!(
                        target_name = %target.name,
                        handler = %rule.handler_name,
                        path = %ctx.request.path,
                        "rule matched"
                    );

                    let args = Args {
                        values: rule.bind_params(&captured),
                        target: target.id,
                    };

                    // Push/pop pairs around the invocation attempt itself,
                    // so the frame is released on error as well.
                    ctx.captures.push(captured);
                    let invoked = (rule.handler)(self, &mut *ctx, args).await;
                    ctx.captures.pop();

                    let base = std::mem::take(&mut ctx.response);
                    return Ok(Dispatch::Handled(reply::coerce(invoked?, base)?));
                }
            }

            Ok(Dispatch::Unhandled)
        })
    }
}
