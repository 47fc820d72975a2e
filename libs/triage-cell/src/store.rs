// libs/triage-cell/src/store.rs
use shared_database::Collection;

use crate::models::EmergencyCase;

/// Persisted state for the triage cell. Per-case write serialization comes
/// from the optimistic version check on the collection, so no scope locks
/// are needed here.
pub struct TriageStore {
    pub cases: Collection<EmergencyCase>,
}

impl TriageStore {
    pub fn new() -> Self {
        Self {
            cases: Collection::new(),
        }
    }
}

impl Default for TriageStore {
    fn default() -> Self {
        Self::new()
    }
}
