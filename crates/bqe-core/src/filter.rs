//! Include/exclude filters on query names and client identities.
//!
//! A [`Filter`] holds one include set and one exclude set for a single
//! dimension. Both are applied: a value passes when the include set is empty
//! or contains it, AND the exclude set does not contain it. An exclusion
//! therefore wins over an inclusion of the same value.

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

/// How entries are normalized on load and on lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// DNS names compare case-insensitively.
    Lowercase,
    /// Client addresses and resolved client names compare exactly.
    Verbatim,
}

impl Normalization {
    fn apply(self, value: &str) -> String {
        match self {
            Normalization::Lowercase => value.to_lowercase(),
            Normalization::Verbatim => value.to_string(),
        }
    }
}

/// Read a line-delimited filter file into a set.
///
/// An empty `path` means the filter is disabled and yields an empty set.
/// Only the line terminator is stripped from each entry; empty lines are
/// skipped.
pub fn load_list(path: &str, normalization: Normalization) -> Result<HashSet<String>, ConfigError> {
    if path.is_empty() {
        return Ok(HashSet::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileUnreadable {
        path: Path::new(path).to_path_buf(),
        source,
    })?;

    let mut skipped = 0usize;
    let entries: HashSet<String> = contents
        .lines()
        .filter(|entry| {
            let blank = entry.is_empty();
            skipped += usize::from(blank);
            !blank
        })
        .inspect(|entry| tracing::debug!(file = path, entry, "filter entry"))
        .map(|entry| normalization.apply(entry))
        .collect();

    if skipped > 0 {
        tracing::debug!(file = path, skipped, "skipped empty lines in filter file");
    }
    tracing::info!(file = path, entries = entries.len(), "loaded filter file");
    Ok(entries)
}

/// Two-sided filter for one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl Filter {
    pub fn new<I, E, S>(include: I, exclude: E, normalization: Normalization) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            include: include.into_iter().map(|s| normalization.apply(s.as_ref())).collect(),
            exclude: exclude.into_iter().map(|s| normalization.apply(s.as_ref())).collect(),
        }
    }

    /// Load both sides from files; either path may be empty.
    pub fn load(include_path: &str, exclude_path: &str, normalization: Normalization) -> Result<Self, ConfigError> {
        Ok(Self {
            include: load_list(include_path, normalization)?,
            exclude: load_list(exclude_path, normalization)?,
        })
    }

    /// Whether `value` (already normalized) survives this filter.
    pub fn permits(&self, value: &str) -> bool {
        if !self.include.is_empty() && !self.include.contains(value) {
            return false;
        }
        if !self.exclude.is_empty() && self.exclude.contains(value) {
            return false;
        }
        true
    }

    /// True when neither side is configured.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Name and client filters applied by one line matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub names: Filter,
    pub clients: Filter,
}

impl FilterSet {
    pub fn new(names: Filter, clients: Filter) -> Self {
        Self { names, clients }
    }

    /// Load the four filter files. Names are lowercased, clients kept as-is.
    pub fn load(
        names_include: &str,
        names_exclude: &str,
        clients_include: &str,
        clients_exclude: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            names: Filter::load(names_include, names_exclude, Normalization::Lowercase)?,
            clients: Filter::load(clients_include, clients_exclude, Normalization::Verbatim)?,
        })
    }
}
