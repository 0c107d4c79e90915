//! # cascade-router
//!
//! A cascading URL routing and dispatch core.
//!
//! This crate provides:
//! - Path pattern compilation with typed captures
//! - Predicate-chain matching (defaults, method filter, path)
//! - A declaration-style route builder
//! - Cascading dispatch across handler targets with mount rewriting
//! - Per-request context with a capture stack and attribute bag
//! - Coercion of handler return values into canonical responses
//!
//! ## Quick Start
//!
//! ```ignore
//! use cascade_router::{App, Reply, Request, RuleOptions};
//!
//! fn show_user<'a>(
//!     _app: &'a cascade_router::App,
//!     _ctx: &'a mut cascade_router::RequestContext,
//!     args: cascade_router::Args,
//! ) -> cascade_router::BoxFuture<'a, cascade_router::Result<Reply>> {
//!     Box::pin(async move {
//!         let id = args.int(0).unwrap_or(0);
//!         Ok(format!("user {id}").into())
//!     })
//! }
//!
//! let mut app = App::new();
//! let users = app.add_target("users");
//! let mut routes = app.mapper(users);
//! routes.push("/users/<int:id>", RuleOptions::new())?;
//! routes.handle("show", &["id"], show_user);
//!
//! let response = app.call(Request::get("/users/42")).await?;
//! ```
//!
//! ## Path Patterns
//!
//! Patterns interleave literal text with `<name>` or `<kind:name>`
//! placeholders:
//!
//! - `int` matches one or more digits and captures an integer
//! - `string` (the default) matches lazily up to the next `/` or literal
//! - `path` matches lazily across separators
//!
//! A rule pushed with `partial` (or via `Mapper::capture`) may stop short
//! of the end of the path; the unconsumed suffix becomes the match's
//! `remaining`.
//!
//! ## Cascading and Mounts
//!
//! Targets are tried in registration order and, within a target, rules in
//! declaration order; the first rule whose predicate chain accepts the
//! request invokes its handler, and that handler's response completes the
//! request. A handler may itself `pass` to delegate: when the innermost
//! match left a `remaining` suffix, the dispatcher temporarily rewrites
//! the request path to that suffix so a sub-mounted target matches it as a
//! fresh path, and restores the original path when the nested dispatch
//! returns.
//!
//! ```ignore
//! fn admin<'a>(
//!     app: &'a App,
//!     ctx: &'a mut RequestContext,
//!     args: Args,
//! ) -> BoxFuture<'a, Result<Reply>> {
//!     Box::pin(async move {
//!         // Delegate the remaining path to every other target.
//!         match app.pass(ctx, PassOptions::skip(args.target)).await? {
//!             Dispatch::Handled(response) => Ok(response.into()),
//!             Dispatch::Unhandled => Ok(Response::not_found().into()),
//!         }
//!     })
//! }
//! ```
//!
//! ## Handler Return Values
//!
//! A handler returns a [`Reply`]: plain text (written into the in-progress
//! response), a canonical [`Response`], a `[body, status]` pair or a
//! `[status, headers, body]` triple. Unrecognized shapes fail dispatch
//! with [`DispatchError::InvalidResponse`].

mod app;
mod context;
mod error;
mod mapper;
mod matcher;
mod path;
mod render;
mod reply;
mod request;
mod response;

pub use app::{App, Args, BoxFuture, Dispatch, HandlerFn, PassOptions, TargetId};
pub use context::{Attributes, RequestContext};
pub use error::{DispatchError, PatternError, Result};
pub use mapper::{Mapper, RuleOptions};
pub use matcher::{Captures, Matcher, Predicate};
pub use path::{CaptureKind, PathPattern, Segment};
pub use render::Renderer;
pub use reply::{coerce, Reply};
pub use request::{Method, Request};
pub use response::Response;
