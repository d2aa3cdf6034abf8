//! Destination descriptors and their textual grammar.
//!
//! A destination names something the dispatcher can invoke:
//!
//! - `Path:method` calls `method` on the controller registered at `Path`;
//! - `Path::function` calls a static function registered under `Path`;
//! - a closure, a sequence of destinations, or a destination wrapped with
//!   extra data.
//!
//! Hook files describe destinations as JSON, see [`Destination::from_value`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use super::errors::DispatchError;

/// Closure destination signature: application context plus arguments.
pub type ClosureFn<A> = dyn Fn(&A, &[Value]) -> Result<Value, DispatchError> + Send + Sync;

/// Something the dispatcher can invoke.
pub enum Destination<A> {
    /// Method on a cached controller instance (`Path:method`).
    Instance {
        /// Controller path.
        path: String,
        /// Method name.
        method: String,
    },
    /// Static function (`Path::function`).
    Static {
        /// Function namespace.
        path: String,
        /// Function name.
        function: String,
    },
    /// Closure invoked with the application context.
    Closure(Arc<ClosureFn<A>>),
    /// Destinations dispatched one after another.
    Sequence(Vec<Destination<A>>),
    /// Destination whose extra data is appended to the caller's arguments.
    Wrapped {
        /// Destination to invoke.
        dest: Box<Destination<A>>,
        /// Extra data; arrays are spread, `null` adds nothing.
        data: Value,
    },
}

impl<A> Destination<A> {
    /// Parses `Path:method` or `Path::function`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedDestination`] for any other colon
    /// layout or for empty segments.
    pub fn parse(text: &str) -> Result<Self, DispatchError> {
        let segments: Vec<&str> = text.split(':').collect();
        match segments.as_slice() {
            [path, method] => {
                ensure_segments(text, path, method)?;
                Ok(Self::instance(*path, *method))
            }
            [path, "", function] => {
                ensure_segments(text, path, function)?;
                Ok(Self::function(*path, *function))
            }
            [_] => Err(DispatchError::malformed(text, "missing ':' separator")),
            [_, _, _] => Err(DispatchError::malformed(
                text,
                "static destinations are written Path::function",
            )),
            _ => Err(DispatchError::malformed(text, "too many ':' separators")),
        }
    }

    /// Builds an instance-method destination.
    #[must_use]
    pub fn instance(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self::Instance {
            path: path.into(),
            method: method.into(),
        }
    }

    /// Builds a static-function destination.
    #[must_use]
    pub fn function(path: impl Into<String>, function: impl Into<String>) -> Self {
        Self::Static {
            path: path.into(),
            function: function.into(),
        }
    }

    /// Builds a closure destination.
    #[must_use]
    pub fn closure<F>(callback: F) -> Self
    where
        F: Fn(&A, &[Value]) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        Self::Closure(Arc::new(callback))
    }

    /// Wraps a destination with extra data.
    #[must_use]
    pub fn wrapped(dest: Self, data: Value) -> Self {
        Self::Wrapped {
            dest: Box::new(dest),
            data,
        }
    }

    /// Converts a JSON hook-file value into a destination.
    ///
    /// Strings are parsed with [`Destination::parse`], arrays become
    /// sequences and objects with a `dest` key become wrapped destinations
    /// (`data` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidDestination`] for numbers, booleans,
    /// `null` and objects without `dest`, and any parse error of nested
    /// strings.
    pub fn from_value(value: &Value) -> Result<Self, DispatchError> {
        match value {
            Value::String(text) => Self::parse(text),
            Value::Array(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Sequence),
            Value::Object(map) => {
                let dest = map.get("dest").ok_or_else(|| {
                    DispatchError::invalid_destination("object without a 'dest' key")
                })?;
                let data = map.get("data").cloned().unwrap_or(Value::Null);
                Ok(Self::wrapped(Self::from_value(dest)?, data))
            }
            Value::Null => Err(DispatchError::invalid_destination("null")),
            Value::Bool(flag) => Err(DispatchError::invalid_destination(format!(
                "boolean {flag}"
            ))),
            Value::Number(number) => Err(DispatchError::invalid_destination(format!(
                "number {number}"
            ))),
        }
    }
}

fn ensure_segments(text: &str, path: &str, member: &str) -> Result<(), DispatchError> {
    if path.trim().is_empty() {
        return Err(DispatchError::malformed(text, "path segment is empty"));
    }
    if member.trim().is_empty() {
        return Err(DispatchError::malformed(text, "member segment is empty"));
    }
    Ok(())
}

impl<A> FromStr for Destination<A> {
    type Err = DispatchError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl<A> Clone for Destination<A> {
    fn clone(&self) -> Self {
        match self {
            Self::Instance { path, method } => Self::instance(path.clone(), method.clone()),
            Self::Static { path, function } => Self::function(path.clone(), function.clone()),
            Self::Closure(callback) => Self::Closure(Arc::clone(callback)),
            Self::Sequence(items) => Self::Sequence(items.clone()),
            Self::Wrapped { dest, data } => Self::Wrapped {
                dest: dest.clone(),
                data: data.clone(),
            },
        }
    }
}

impl<A> fmt::Display for Destination<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance { path, method } => write!(formatter, "{path}:{method}"),
            Self::Static { path, function } => write!(formatter, "{path}::{function}"),
            Self::Closure(_) => formatter.write_str("<closure>"),
            Self::Sequence(items) => {
                formatter.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{item}")?;
                }
                formatter.write_str("]")
            }
            Self::Wrapped { dest, .. } => write!(formatter, "{dest} (with data)"),
        }
    }
}

impl<A> fmt::Debug for Destination<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance { path, method } => formatter
                .debug_struct("Instance")
                .field("path", path)
                .field("method", method)
                .finish(),
            Self::Static { path, function } => formatter
                .debug_struct("Static")
                .field("path", path)
                .field("function", function)
                .finish(),
            Self::Closure(_) => formatter.write_str("Closure(..)"),
            Self::Sequence(items) => formatter.debug_tuple("Sequence").field(items).finish(),
            Self::Wrapped { dest, data } => formatter
                .debug_struct("Wrapped")
                .field("dest", dest)
                .field("data", data)
                .finish(),
        }
    }
}
