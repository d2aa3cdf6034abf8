//! Gated event groups.
//!
//! An event group owns a list of callback destinations and, optionally, a set
//! of sub-requirements. Triggering a group marks one sub-requirement as met;
//! the callbacks run only once every sub-requirement of the group is met.
//! After firing, a group is either removed, re-armed or left as is,
//! depending on the flags it was created with.

mod group;
mod hooks;


use std::collections::{BTreeMap, HashMap};

use camino::Utf8Path;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::dispatch::{Destination, Dispatch, DispatchError};

pub use self::group::{EventGroup, MatchMode};
pub use self::hooks::{HookFile, HookFileError};

const EVENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::event");

/// Registry of event groups that fire through a [`Dispatch`] implementation.
pub struct EventManager<D: Dispatch> {
    dispatcher: D,
    groups: HashMap<String, EventGroup<D::Context>>,
    conditions: HashMap<String, BTreeMap<String, bool>>,
    match_mode: MatchMode,
}

impl<D: Dispatch> EventManager<D> {
    /// Creates an empty manager that dispatches through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            groups: HashMap::new(),
            conditions: HashMap::new(),
            match_mode: MatchMode::Exact,
        }
    }

    /// Sets the match mode, consuming and returning the manager.
    #[must_use]
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Sets how trigger names are matched against group names.
    pub const fn set_match_mode(&mut self, mode: MatchMode) {
        self.match_mode = mode;
    }

    /// Current match mode.
    #[must_use]
    pub const fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Dispatcher used to invoke callbacks.
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher.
    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    /// Registers `sub_id` as an unmet sub-requirement of `group`.
    ///
    /// Adding an id that is already registered marks it unmet again.
    pub fn add_group(&mut self, group: impl Into<String>, sub_id: impl Into<String>) {
        let group = group.into();
        let sub_id = sub_id.into();
        trace!(target: EVENT_TARGET, group = %group, sub_id = %sub_id, "adding sub-requirement");
        self.conditions.entry(group).or_default().insert(sub_id, false);
    }

    /// Appends `destination` to the callbacks of `group`.
    ///
    /// The first attach creates the group and fixes its `remove` and `reset`
    /// flags; later attaches keep them.
    pub fn attach(
        &mut self,
        group: impl Into<String>,
        destination: Destination<D::Context>,
        remove: bool,
        reset: bool,
    ) {
        let group = group.into();
        let entry = self.groups.entry(group.clone()).or_insert_with(|| {
            debug!(target: EVENT_TARGET, group = %group, remove, reset, "creating event group");
            EventGroup::new(remove, reset)
        });
        if entry.remove() != remove || entry.reset() != reset {
            debug!(
                target: EVENT_TARGET,
                group = %group,
                remove = entry.remove(),
                reset = entry.reset(),
                "keeping flags of existing group"
            );
        }
        entry.push(destination);
    }

    /// Removes the callbacks and sub-requirements of `group`.
    ///
    /// Returns whether anything was registered under that name.
    pub fn detach(&mut self, group: &str) -> bool {
        let had_callbacks = self.groups.remove(group).is_some();
        let had_conditions = self.conditions.remove(group).is_some();
        had_callbacks || had_conditions
    }

    /// Whether any sub-requirement of `group` is still unmet.
    #[must_use]
    pub fn has_outstanding(&self, group: &str) -> bool {
        self.conditions
            .get(group)
            .is_some_and(|flags| flags.values().any(|met| !met))
    }

    /// Whether callbacks are attached under `group`.
    #[must_use]
    pub fn contains(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Callbacks and flags registered under `group`.
    #[must_use]
    pub fn group(&self, group: &str) -> Option<&EventGroup<D::Context>> {
        self.groups.get(group)
    }

    /// Number of groups with callbacks attached.
    #[must_use]
    pub fn count(&self) -> usize {
        self.groups.len()
    }

    /// Attaches every callback described by the hook file at `path`.
    ///
    /// Returns the number of callbacks attached. Nothing is attached when any
    /// entry of the file is invalid.
    ///
    /// # Errors
    ///
    /// Returns a [`HookFileError`] when the file cannot be read or parsed, or
    /// when a callback entry is not a valid destination.
    pub fn import_file(&mut self, path: &Utf8Path) -> Result<usize, HookFileError> {
        let attachments = HookFile::read(path)?.into_attachments()?;
        let attached = attachments.len();
        for attachment in attachments {
            self.attach(
                attachment.group,
                attachment.destination,
                attachment.remove,
                attachment.reset,
            );
        }
        debug!(target: EVENT_TARGET, path = %path, attached, "imported hook file");
        Ok(attached)
    }

    /// Marks `sub_id` as met for the groups `group` resolves to and fires
    /// every group whose sub-requirements are all met.
    ///
    /// `data` becomes the callback arguments: `None` passes none, an array is
    /// spread, any other value is passed as the single argument. An empty
    /// `sub_id` marks nothing.
    ///
    /// Returns `Ok(true)` when at least one group fired.
    ///
    /// # Errors
    ///
    /// Propagates the first [`DispatchError`] raised by a callback; the
    /// remaining callbacks do not run.
    pub fn trigger(
        &mut self,
        group: &str,
        sub_id: &str,
        data: Option<Value>,
    ) -> Result<bool, DispatchError> {
        let arguments = into_arguments(data);
        let mut fired = false;
        for target in self.resolve(group) {
            fired |= self.fire(&target, sub_id, &arguments)?;
        }
        Ok(fired)
    }

    fn is_known(&self, group: &str) -> bool {
        self.groups.contains_key(group) || self.conditions.contains_key(group)
    }

    fn resolve(&self, group: &str) -> Vec<String> {
        if self.is_known(group) {
            return vec![group.to_owned()];
        }
        if self.match_mode == MatchMode::Exact {
            return Vec::new();
        }
        let mut names: Vec<&String> = self.groups.keys().chain(self.conditions.keys()).collect();
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .filter(|name| pattern_matches(name, group))
            .cloned()
            .collect()
    }

    fn fire(
        &mut self,
        group: &str,
        sub_id: &str,
        arguments: &[Value],
    ) -> Result<bool, DispatchError> {
        if !sub_id.is_empty()
            && let Some(met) = self
                .conditions
                .get_mut(group)
                .and_then(|flags| flags.get_mut(sub_id))
        {
            *met = true;
        }

        if self.has_outstanding(group) {
            trace!(target: EVENT_TARGET, group, sub_id, "sub-requirements outstanding");
            return Ok(false);
        }
        let Some(entry) = self.groups.get(group) else {
            return Ok(false);
        };
        if entry.callbacks().is_empty() {
            return Ok(false);
        }

        debug!(
            target: EVENT_TARGET,
            group,
            callbacks = entry.callbacks().len(),
            "firing event group"
        );
        for callback in entry.callbacks() {
            self.dispatcher.dispatch(callback, arguments)?;
        }

        let (remove, reset) = (entry.remove(), entry.reset());
        if remove {
            self.groups.remove(group);
            self.conditions.remove(group);
        } else if reset && let Some(flags) = self.conditions.get_mut(group) {
            flags.values_mut().for_each(|met| *met = false);
        }
        Ok(true)
    }
}

impl<D: Dispatch + std::fmt::Debug> std::fmt::Debug for EventManager<D> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut groups: Vec<_> = self.groups.keys().collect();
        groups.sort();
        formatter
            .debug_struct("EventManager")
            .field("dispatcher", &self.dispatcher)
            .field("groups", &groups)
            .field("match_mode", &self.match_mode)
            .finish_non_exhaustive()
    }
}

fn into_arguments(data: Option<Value>) -> Vec<Value> {
    match data {
        None => Vec::new(),
        Some(Value::Array(values)) => values,
        Some(value) => vec![value],
    }
}

fn pattern_matches(pattern: &str, group: &str) -> bool {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(regex) => regex.is_match(group),
        Err(error) => {
            warn!(target: EVENT_TARGET, pattern, %error, "skipping invalid group pattern");
            false
        }
    }
}
