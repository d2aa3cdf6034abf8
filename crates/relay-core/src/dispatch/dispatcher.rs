//! Registry-backed [`Dispatch`] implementation with a controller cache.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use serde_json::Value;
use tracing::{debug, trace};

use super::destination::Destination;
use super::errors::DispatchError;
use super::registry::Registry;
use super::{DISPATCH_TARGET, Dispatch};

/// Resolves destinations against a [`Registry`] and caches controllers.
///
/// A controller is constructed the first time one of its methods is
/// dispatched and reused for every later call for the lifetime of the
/// dispatcher.
pub struct Dispatcher<A> {
    app: A,
    registry: Registry<A>,
    controllers: HashMap<String, Box<dyn Any + Send>>,
}

impl<A> Dispatcher<A> {
    /// Creates a dispatcher around an application context and a registry.
    #[must_use]
    pub fn new(app: A, registry: Registry<A>) -> Self {
        Self {
            app,
            registry,
            controllers: HashMap::new(),
        }
    }

    /// Application context handed to controller factories and closures.
    #[must_use]
    pub const fn app(&self) -> &A {
        &self.app
    }

    /// Registry consulted for every dispatch.
    #[must_use]
    pub const fn registry(&self) -> &Registry<A> {
        &self.registry
    }

    /// Number of controller instances constructed so far.
    #[must_use]
    pub fn cached_controllers(&self) -> usize {
        self.controllers.len()
    }

    /// Whether the controller at `path` has been constructed.
    #[must_use]
    pub fn is_cached(&self, path: &str) -> bool {
        self.controllers.contains_key(path)
    }

    fn call_instance(
        &mut self,
        path: &str,
        method: &str,
        arguments: &[Value],
    ) -> Result<Value, DispatchError> {
        let spec = self
            .registry
            .controller_spec(path)
            .ok_or_else(|| DispatchError::path_not_found(path))?;
        let invoke = spec
            .methods
            .get(method)
            .ok_or_else(|| DispatchError::not_invokable(path, method))?;

        let instance = match self.controllers.entry(path.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(target: DISPATCH_TARGET, path, "constructing controller");
                entry.insert((spec.factory)(&self.app))
            }
        };
        invoke(instance.as_mut(), arguments)
    }

    fn call_static(
        &self,
        path: &str,
        function: &str,
        arguments: &[Value],
    ) -> Result<Value, DispatchError> {
        let functions = self
            .registry
            .functions_at(path)
            .ok_or_else(|| DispatchError::path_not_found(path))?;
        let invoke = functions
            .get(function)
            .ok_or_else(|| DispatchError::not_invokable(path, function))?;
        invoke(arguments)
    }

    fn call_sequence(
        &mut self,
        items: &[Destination<A>],
        arguments: &[Value],
    ) -> Result<Value, DispatchError> {
        let mut merged = Vec::with_capacity(items.len());
        for item in items {
            match self.dispatch(item, arguments)? {
                Value::Array(values) if matches!(item, Destination::Sequence(_)) => {
                    merged.extend(values);
                }
                value => merged.push(value),
            }
        }
        Ok(Value::Array(merged))
    }
}

impl<A> Dispatch for Dispatcher<A> {
    type Context = A;

    fn dispatch(
        &mut self,
        destination: &Destination<A>,
        arguments: &[Value],
    ) -> Result<Value, DispatchError> {
        trace!(
            target: DISPATCH_TARGET,
            destination = %destination,
            arguments = arguments.len(),
            "dispatching"
        );
        match destination {
            Destination::Instance { path, method } => self.call_instance(path, method, arguments),
            Destination::Static { path, function } => self.call_static(path, function, arguments),
            Destination::Closure(callback) => callback(&self.app, arguments),
            Destination::Sequence(items) => self.call_sequence(items, arguments),
            Destination::Wrapped { dest, data } => {
                let combined = append_data(arguments, data);
                self.dispatch(dest, &combined)
            }
        }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cached: Vec<_> = self.controllers.keys().collect();
        cached.sort();
        formatter
            .debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("cached", &cached)
            .finish_non_exhaustive()
    }
}

/// Appends wrapper data to the caller's arguments without replacing them.
fn append_data(arguments: &[Value], data: &Value) -> Vec<Value> {
    let mut combined = arguments.to_vec();
    match data {
        Value::Null => {}
        Value::Array(values) => combined.extend(values.iter().cloned()),
        other => combined.push(other.clone()),
    }
    combined
}
