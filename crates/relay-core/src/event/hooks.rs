//! JSON hook files.
//!
//! A hook file maps group names to callbacks and firing flags:
//!
//! ```json
//! {
//!   "deploy": {
//!     "callback": ["App\\Deploy:run", {"dest": "App\\Log::info", "data": "deployed"}],
//!     "remove": false,
//!     "reset": true
//!   }
//! }
//! ```
//!
//! Every callback entry is converted before anything is attached, so a file
//! with one bad destination leaves the event manager untouched.

use std::collections::BTreeMap;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::{Destination, DispatchError};

/// Errors raised while importing a hook file.
#[derive(Debug, Error)]
pub enum HookFileError {
    /// The file could not be read.
    #[error("failed to read hook file '{path}': {source}")]
    Read {
        /// Hook file location.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid hook document.
    #[error("failed to parse hook file '{path}': {source}")]
    Parse {
        /// Hook file location.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A callback entry is not a valid destination.
    #[error("invalid callback in group '{group}': {source}")]
    Destination {
        /// Group the callback belongs to.
        group: String,
        /// Conversion failure.
        #[source]
        source: DispatchError,
    },
}

#[derive(Debug, Deserialize)]
struct HookEntry {
    #[serde(default)]
    callback: Vec<Value>,
    #[serde(default)]
    remove: bool,
    #[serde(default)]
    reset: bool,
}

/// Parsed hook document, ordered by group name.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct HookFile {
    groups: BTreeMap<String, HookEntry>,
}

/// One callback ready to be attached.
pub(crate) struct Attachment<A> {
    pub(crate) group: String,
    pub(crate) destination: Destination<A>,
    pub(crate) remove: bool,
    pub(crate) reset: bool,
}

impl HookFile {
    /// Reads and parses the hook file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HookFileError::Read`] or [`HookFileError::Parse`].
    pub fn read(path: &Utf8Path) -> Result<Self, HookFileError> {
        let contents = fs::read_to_string(path).map_err(|source| HookFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| HookFileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of groups described by the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the file describes no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn into_attachments<A>(self) -> Result<Vec<Attachment<A>>, HookFileError> {
        let mut attachments = Vec::new();
        for (group, entry) in self.groups {
            for callback in &entry.callback {
                let destination =
                    Destination::from_value(callback).map_err(|source| {
                        HookFileError::Destination {
                            group: group.clone(),
                            source,
                        }
                    })?;
                attachments.push(Attachment {
                    group: group.clone(),
                    destination,
                    remove: entry.remove,
                    reset: entry.reset,
                });
            }
        }
        Ok(attachments)
    }
}
