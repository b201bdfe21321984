//! Local filtering for list results.
//!
//! Many list APIs cannot filter by name pattern, by an explicit id set, or by
//! status. [`ItemFilter`] applies those filters to each item as it is
//! accumulated. Every configured filter must pass for an item to be kept.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::error::Error;
use crate::path;

/// Filters applied to `serde_json::Value` list items.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    ids: Option<(String, HashSet<String>)>,
    name: Option<(String, Regex)>,
    status: Option<(String, String)>,
}

impl ItemFilter {
    /// A filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only items whose `field` is one of `ids`.
    ///
    /// An empty id set disables id filtering.
    pub fn with_ids<I, S>(mut self, field: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: HashSet<String> = ids.into_iter().map(Into::into).collect();
        self.ids = if ids.is_empty() {
            None
        } else {
            Some((field.into(), ids))
        };
        self
    }

    /// Keep only items whose `field` matches `pattern` anywhere in the value.
    ///
    /// Matching is case-sensitive and unanchored.
    pub fn with_name_regex(mut self, field: impl Into<String>, pattern: &str) -> Result<Self, Error> {
        self.name = Some((field.into(), Regex::new(pattern)?));
        Ok(self)
    }

    /// Keep only items whose `field` equals `status` exactly.
    pub fn with_status(mut self, field: impl Into<String>, status: impl Into<String>) -> Self {
        self.status = Some((field.into(), status.into()));
        self
    }

    /// Whether no filters are configured.
    pub fn is_empty(&self) -> bool {
        self.ids.is_none() && self.name.is_none() && self.status.is_none()
    }

    /// Whether `item` passes every configured filter.
    ///
    /// An item missing a filtered field is dropped.
    pub fn matches(&self, item: &Value) -> bool {
        if let Some((field, ids)) = &self.ids {
            match path::get_string(item, field) {
                Some(id) if ids.contains(&id) => {}
                _ => return false,
            }
        }
        if let Some((field, pattern)) = &self.name {
            match path::get_string(item, field) {
                Some(name) if pattern.is_match(&name) => {}
                _ => return false,
            }
        }
        if let Some((field, status)) = &self.status {
            match path::get_string(item, field) {
                Some(value) if value == *status => {}
                _ => return false,
            }
        }
        true
    }
}
