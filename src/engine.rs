//! The field registry. The public facade for screens that manage many
//! editable cells: one session per field, indexed by field id.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{FieldId, FieldSnapshot, SessionOptions};
use crate::session::FieldHandle;

/// Arena of field sessions. Each session exclusively owns its own value,
/// timer, and coalescing slot; the registry only tracks handles.
pub struct SyncEngine<V> {
    fields: HashMap<FieldId, FieldHandle<V>>,
}

impl<V: Clone + PartialEq + Send + Sync + 'static> SyncEngine<V> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Mount a field, spawning its session. An existing session under the
    /// same id is removed and tears down once its last handle drops.
    pub fn mount(&mut self, id: FieldId, options: SessionOptions<V>) -> &FieldHandle<V> {
        let handle = FieldHandle::spawn(id.clone(), options);
        if self.fields.insert(id.clone(), handle).is_some() {
            debug!(field_id = %id, "field remounted");
        } else {
            debug!(field_id = %id, "field mounted");
        }
        &self.fields[&id]
    }

    /// Unmount a field. Returns false if the id was not mounted.
    pub fn unmount(&mut self, id: &FieldId) -> bool {
        let removed = self.fields.remove(id).is_some();
        if removed {
            debug!(field_id = %id, "field unmounted");
        }
        removed
    }

    pub fn get(&self, id: &FieldId) -> Option<&FieldHandle<V>> {
        self.fields.get(id)
    }

    /// Snapshot of one field, if mounted.
    pub fn snapshot(&self, id: &FieldId) -> Option<FieldSnapshot<V>> {
        self.fields.get(id).map(FieldHandle::snapshot)
    }

    pub fn contains(&self, id: &FieldId) -> bool {
        self.fields.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<V: Clone + PartialEq + Send + Sync + 'static> Default for SyncEngine<V> {
    fn default() -> Self {
        Self::new()
    }
}
