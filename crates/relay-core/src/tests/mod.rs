//! Crate-level behaviour tests.

mod behaviour;
