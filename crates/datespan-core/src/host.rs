//! Capabilities the report host lends to a widget.
//!
//! Both are passed into the controller on every call; nothing here is
//! process-global, so two widgets only see each other through whatever
//! store the host hands them.

use std::collections::BTreeMap;

use tracing::debug;

use crate::filter::{
    FilterAction,
    IntervalFilter,
};

/// Durable key/value text visible to every widget instance.
pub trait SharedStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn write(&mut self, key: &str, text: &str) -> anyhow::Result<()>;
}

/// Receives interval filters.
pub trait FilterHost {
    fn apply_filter(
        &mut self,
        filter: &IntervalFilter,
        action: FilterAction,
    ) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedStore for MemoryStore {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, text: &str) -> anyhow::Result<()> {
        debug!(key, text, "memory store write");
        self.entries.insert(key.to_string(), text.to_string());
        Ok(())
    }
}

/// Keeps every filter it is handed, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    pub applied: Vec<(IntervalFilter, FilterAction)>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&(IntervalFilter, FilterAction)> {
        self.applied.last()
    }
}

impl FilterHost for RecordingHost {
    fn apply_filter(
        &mut self,
        filter: &IntervalFilter,
        action: FilterAction,
    ) -> anyhow::Result<()> {
        debug!(?action, target = ?filter.target, "recording filter");
        self.applied.push((filter.clone(), action));
        Ok(())
    }
}
