//! Predicate-chain matching.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::path::PathPattern;
use crate::request::{Method, Request};

/// Values extracted by a successful match.
#[derive(Debug, Clone, Default)]
pub struct Captures {
    /// The consumed portion of the request path.
    pub matched: String,
    /// Typed parameter values keyed by declared capture name.
    pub named: HashMap<String, Value>,
    /// Unconsumed path suffix; `Some` only for partial (mount) matches.
    pub remaining: Option<String>,
}

impl Captures {
    /// Creates empty captures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a named value. An undeclared name is absent, not an error.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }
}

/// One step of a matcher chain.
///
/// A predicate may mutate the captures as a side effect of succeeding;
/// the chain discards them wholesale if any later step fails.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Injects configured default values into `named`.
    Defaults(HashMap<String, Value>),
    /// Accepts only the configured request methods.
    MethodFilter(HashSet<Method>),
    /// Delegates to a compiled path pattern.
    PathMatch(PathPattern),
}

impl Predicate {
    fn apply(&self, request: &Request, captures: &mut Captures) -> bool {
        match self {
            Self::Defaults(defaults) => {
                for (name, value) in defaults {
                    captures.named.insert(name.clone(), value.clone());
                }
                true
            }
            Self::MethodFilter(methods) => methods.contains(&request.method),
            Self::PathMatch(pattern) => match pattern.match_path(&request.path) {
                Some(matched) => {
                    captures.matched = matched.matched;
                    captures.remaining = matched.remaining;
                    // Path captures win over same-named defaults.
                    captures.named.extend(matched.named);
                    true
                }
                None => false,
            },
        }
    }
}

/// An ordered predicate chain evaluated as a short-circuit AND.
#[derive(Debug, Clone)]
pub struct Matcher {
    predicates: Vec<Predicate>,
}

impl Matcher {
    /// Creates a matcher from a predicate chain.
    #[must_use]
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    /// Runs the chain against a request.
    ///
    /// A fresh zero-valued `Captures` accumulates side effects as the chain
    /// runs and is returned only if every predicate passes. Captures from a
    /// failed attempt are never observable by callers.
    #[must_use]
    pub fn matches(&self, request: &Request) -> Option<Captures> {
        let mut captures = Captures::new();
        for predicate in &self.predicates {
            if !predicate.apply(request, &mut captures) {
                return None;
            }
        }
        Some(captures)
    }
}
