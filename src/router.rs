//! Route registry.
//!
//! One ordered list of compiled routes per method. Lookup walks the list in
//! registration order and returns the first template that matches, so the
//! order of registration is the only priority signal: `/users/me` registered
//! after `/users/:id` is never reached.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::pattern::PathPattern;

struct CompiledRoute {
    pattern: PathPattern,
    handler: BoxedHandler,
}

/// The result of a successful [`RouteTable::lookup`].
pub struct RouteMatch {
    pub(crate) handler: BoxedHandler,
    pub template: String,
    pub params: HashMap<String, String>,
}

/// Routes keyed by lower-cased method, each list in registration order.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<String, Vec<CompiledRoute>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `template` and appends it under `method`, matched case-insensitively.
    pub fn register(&mut self, method: &str, template: &str, handler: impl Handler) -> Result<(), Error> {
        let pattern = PathPattern::compile(template)?;
        self.routes
            .entry(method.to_ascii_lowercase())
            .or_default()
            .push(CompiledRoute { pattern, handler: handler.into_boxed_handler() });
        Ok(())
    }

    /// Finds the first route under `method` whose template matches `path`.
    ///
    /// An unknown method is simply "no match".
    pub fn lookup(&self, method: &str, path: &str) -> Option<RouteMatch> {
        let routes = self.routes.get(&method.to_ascii_lowercase())?;
        routes.iter().find_map(|route| {
            let values = route.pattern.captures(path)?;
            let params = route.pattern.param_names().iter().cloned().zip(values).collect();
            Some(RouteMatch {
                handler: Arc::clone(&route.handler),
                template: route.pattern.template().to_owned(),
                params,
            })
        })
    }

    /// Total number of registered routes across all methods.
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
