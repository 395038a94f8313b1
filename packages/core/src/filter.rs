//! Filesystem type filtering.
//!
//! A type list is a comma-separated set of filesystem type names, either all
//! plain ("ext4,vfat": keep entries of those types) or all prefixed with
//! "no" ("noext4,novfat": keep everything else). Mixing the two forms in
//! one list is rejected rather than guessed at.

use crate::error::{MixedTypeListSnafu, Result};
use crate::mount::MountEntry;

/// Prefix marking a type token as an exclusion.
const EXCLUDE_MARKER: &str = "no";

/// A parsed type list, ready to match against entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    /// No list given; everything matches.
    Any,
    /// Match entries whose type equals one of these.
    Include(Vec<String>),
    /// Match entries whose type equals none of these.
    Exclude(Vec<String>),
}

impl TypeFilter {
    /// Parses a type list. `None` or an empty string yields [`TypeFilter::Any`].
    pub fn parse(spec: Option<&str>) -> Result<Self> {
        let Some(spec) = spec.filter(|s| !s.is_empty()) else {
            return Ok(Self::Any);
        };

        let tokens: Vec<&str> = spec.split(',').collect();

        if tokens[0].starts_with(EXCLUDE_MARKER) {
            let mut types = Vec::with_capacity(tokens.len());
            for token in &tokens {
                // If one token starts with "no", the rest must too.
                let Some(rest) = token.strip_prefix(EXCLUDE_MARKER) else {
                    return MixedTypeListSnafu { spec }.fail();
                };
                types.push(rest.to_string());
            }
            Ok(Self::Exclude(types))
        } else {
            let mut types = Vec::with_capacity(tokens.len());
            for token in &tokens {
                if token.starts_with(EXCLUDE_MARKER) {
                    return MixedTypeListSnafu { spec }.fail();
                }
                types.push((*token).to_string());
            }
            Ok(Self::Include(types))
        }
    }

    /// Whether a filesystem type name passes the filter. Comparison is
    /// exact, full-length equality, never a prefix match.
    pub fn matches(&self, fs_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Include(types) => types.iter().any(|t| t == fs_type),
            Self::Exclude(types) => !types.iter().any(|t| t == fs_type),
        }
    }

    /// Convenience wrapper matching a mount entry's type.
    pub fn matches_entry(&self, entry: &MountEntry) -> bool {
        self.matches(entry.fs_type())
    }
}
