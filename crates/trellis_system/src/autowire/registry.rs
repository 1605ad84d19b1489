//! Per-pass extension registry.

use hashbrown::HashMap;

use super::AutowireError;
use crate::extension::{ExtensionEntry, ExtensionId};

/// Bookkeeping for one extension during an autowiring pass.
#[derive(Debug)]
pub struct DependencyRecord {
    entry: ExtensionEntry,
    /// Indices of the records this one depends on, in discovery order.
    parents: Vec<usize>,
}

impl DependencyRecord {
    /// Returns the wrapped extension entry.
    #[must_use]
    pub fn entry(&self) -> &ExtensionEntry {
        &self.entry
    }

    /// Returns the indices of the records this one depends on.
    #[must_use]
    pub fn parents(&self) -> &[usize] {
        &self.parents
    }
}

/// Maps extension types to their [`DependencyRecord`]s.
///
/// Records keep the registration order. A registry lives for exactly one
/// autowiring pass.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<DependencyRecord>,
    index: HashMap<ExtensionId, usize>,
}

impl Registry {
    /// Builds a registry with one record per entry.
    ///
    /// # Errors
    ///
    /// Returns [`AutowireError::DuplicateExtension`] if two entries share a
    /// type.
    pub fn build(entries: Vec<ExtensionEntry>) -> Result<Self, AutowireError> {
        let mut registry = Self {
            records: Vec::with_capacity(entries.len()),
            index: HashMap::with_capacity(entries.len()),
        };

        for entry in entries {
            let id = entry.id();
            if registry.index.contains_key(&id) {
                return Err(AutowireError::DuplicateExtension {
                    extension: id.type_name(),
                });
            }
            registry.index.insert(id, registry.records.len());
            registry.records.push(DependencyRecord {
                entry,
                parents: Vec::new(),
            });
        }

        Ok(registry)
    }

    /// Returns the record index for an extension type.
    #[must_use]
    pub fn lookup(&self, id: ExtensionId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Returns the record at `index`.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<&DependencyRecord> {
        self.records.get(index)
    }

    /// Returns all records in registration order.
    #[must_use]
    pub fn records(&self) -> &[DependencyRecord] {
        &self.records
    }

    /// Records that `child` depends on `parent`.
    ///
    /// Self-edges and repeated edges are ignored.
    pub(crate) fn add_parent(&mut self, child: usize, parent: usize) {
        if child == parent {
            return;
        }
        let parents = &mut self.records[child].parents;
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Returns the parent lists, indexed like [`records`](Self::records).
    #[must_use]
    pub fn parent_lists(&self) -> Vec<Vec<usize>> {
        self.records
            .iter()
            .map(|record| record.parents.clone())
            .collect()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the registry, returning the entries in registration order.
    #[must_use]
    pub fn into_entries(self) -> Vec<ExtensionEntry> {
        self.records.into_iter().map(|record| record.entry).collect()
    }
}
