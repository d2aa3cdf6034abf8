//! Explicit registry of dispatch targets.
//!
//! Controllers and static functions are registered by path at startup. The
//! registry stores type-erased constructors and method adapters; the
//! [`Dispatcher`](super::Dispatcher) owns the instances they produce.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use super::errors::DispatchError;

pub(crate) type Factory<A> = Box<dyn Fn(&A) -> Box<dyn Any + Send> + Send + Sync>;
pub(crate) type MethodFn =
    Box<dyn Fn(&mut (dyn Any + Send), &[Value]) -> Result<Value, DispatchError> + Send + Sync>;
pub(crate) type StaticFn = Box<dyn Fn(&[Value]) -> Result<Value, DispatchError> + Send + Sync>;

pub(crate) struct ControllerSpec<A> {
    pub(crate) factory: Factory<A>,
    pub(crate) methods: HashMap<String, MethodFn>,
}

/// Startup-time table of controllers and static functions.
pub struct Registry<A> {
    controllers: HashMap<String, ControllerSpec<A>>,
    functions: HashMap<String, HashMap<String, StaticFn>>,
}

impl<A> Registry<A> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            controllers: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// Registers a controller constructed from the application context.
    ///
    /// Registering the same path again replaces the constructor and drops
    /// the methods registered so far.
    pub fn controller<T, F>(
        &mut self,
        path: impl Into<String>,
        factory: F,
    ) -> ControllerRegistration<'_, A, T>
    where
        T: Any + Send,
        F: Fn(&A) -> T + Send + Sync + 'static,
    {
        let path = path.into();
        let factory: Factory<A> =
            Box::new(move |app: &A| -> Box<dyn Any + Send> { Box::new(factory(app)) });
        let spec = ControllerSpec {
            factory,
            methods: HashMap::new(),
        };
        self.controllers.insert(path.clone(), spec);
        ControllerRegistration {
            registry: self,
            path,
            controller: PhantomData,
        }
    }

    /// Registers a static function reachable as `path::name`.
    pub fn function<F>(
        &mut self,
        path: impl Into<String>,
        name: impl Into<String>,
        function: F,
    ) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        self.functions
            .entry(path.into())
            .or_default()
            .insert(name.into(), Box::new(function));
        self
    }

    /// Whether a controller is registered at `path`.
    #[must_use]
    pub fn has_controller(&self, path: &str) -> bool {
        self.controllers.contains_key(path)
    }

    /// Whether static functions are registered under `path`.
    #[must_use]
    pub fn has_functions(&self, path: &str) -> bool {
        self.functions.contains_key(path)
    }

    pub(crate) fn controller_spec(&self, path: &str) -> Option<&ControllerSpec<A>> {
        self.controllers.get(path)
    }

    pub(crate) fn functions_at(&self, path: &str) -> Option<&HashMap<String, StaticFn>> {
        self.functions.get(path)
    }
}

impl<A> Default for Registry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Registry<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut controllers: Vec<_> = self.controllers.keys().collect();
        controllers.sort();
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        formatter
            .debug_struct("Registry")
            .field("controllers", &controllers)
            .field("functions", &functions)
            .finish()
    }
}

/// Builder returned by [`Registry::controller`] for attaching methods.
pub struct ControllerRegistration<'r, A, T> {
    registry: &'r mut Registry<A>,
    path: String,
    controller: PhantomData<fn() -> T>,
}

impl<A, T> ControllerRegistration<'_, A, T>
where
    T: Any + Send,
{
    /// Exposes `name` as `path:name`, invoking `method` on the cached
    /// controller instance.
    pub fn method<F>(&mut self, name: impl Into<String>, method: F) -> &mut Self
    where
        F: Fn(&mut T, &[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        let path = self.path.clone();
        let adapter: MethodFn = Box::new(
            move |instance: &mut (dyn Any + Send), arguments: &[Value]| {
                let controller = instance.downcast_mut::<T>().ok_or_else(|| {
                    DispatchError::internal(format!(
                        "cached controller at '{path}' has an unexpected type"
                    ))
                })?;
                method(controller, arguments)
            },
        );
        if let Some(spec) = self.registry.controllers.get_mut(&self.path) {
            spec.methods.insert(name.into(), adapter);
        }
        self
    }
}
