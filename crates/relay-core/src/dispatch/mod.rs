//! Destination dispatch.
//!
//! Callbacks attached to commands and events are described by a
//! [`Destination`]. A [`Dispatch`] implementation turns a destination plus a
//! list of JSON arguments into a call:
//!
//! ```text
//! App\Deploy:build      -> Deploy controller, method "build"
//! App\Log::info         -> static function "info" in namespace App\Log
//! ```
//!
//! [`Dispatcher`] is the registry-backed implementation. Controllers are
//! constructed lazily from their registered factory and cached for the
//! lifetime of the dispatcher.

mod destination;
mod dispatcher;
mod errors;
mod registry;

use serde_json::Value;

pub use self::destination::{ClosureFn, Destination};
pub use self::dispatcher::Dispatcher;
pub use self::errors::DispatchError;
pub use self::registry::{ControllerRegistration, Registry};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Invokes destinations on behalf of the event manager.
pub trait Dispatch {
    /// Application context handed to closures and controller factories.
    type Context;

    /// Invokes `destination` with `arguments` and returns its result.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the destination cannot be resolved or
    /// the handler reports a failure.
    fn dispatch(
        &mut self,
        destination: &Destination<Self::Context>,
        arguments: &[Value],
    ) -> Result<Value, DispatchError>;
}
