//! How event group names are resolved when triggered.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Resolution strategy for event group names.
///
/// Set with `group_matching` in the configuration file,
/// `RELAY_GROUP_MATCHING` or `--group-matching`.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GroupMatching {
    /// Only the group registered under the exact name fires.
    #[default]
    Exact,
    /// Registered names are tried as anchored patterns when no group matches
    /// exactly.
    Pattern,
}

impl GroupMatching {
    /// Whether pattern resolution is enabled.
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Pattern)
    }
}

/// Error returned when a [`GroupMatching`] cannot be parsed from text.
pub type GroupMatchingParseError = strum::ParseError;
