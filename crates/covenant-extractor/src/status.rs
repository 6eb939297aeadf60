//! Pass status tracking
//!
//! The engine reports each pass's phase to an injected `StatusStore` so
//! callers (an upload API, the CLI) can poll progress without sharing
//! mutable state with the pass itself. Statuses are keyed by pass id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Phase of an extraction pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PassPhase {
    /// Accepted, not started
    Pending,
    /// Dispatching chunks
    Extracting {
        /// Percentage of chunks dispatched so far
        progress: u8,
        /// Human-readable step, e.g. "chunk 2 of 5"
        step: String,
    },
    /// Finished with a result
    Complete {
        /// Questions with a value
        answered: usize,
        /// Questions in the catalogue
        total: usize,
    },
    /// Stopped by a pass-level error
    Failed {
        /// Error message
        error: String,
    },
    /// Stopped on request; a partial result was produced
    Cancelled,
}

impl PassPhase {
    /// Whether the pass has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PassPhase::Complete { .. } | PassPhase::Failed { .. } | PassPhase::Cancelled
        )
    }
}

/// Status of one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStatus {
    /// Unique pass identifier (UUIDv7, time-ordered)
    pub pass_id: Uuid,
    /// Document the pass runs over
    pub document_id: String,
    /// Current phase
    #[serde(flatten)]
    pub phase: PassPhase,
}

/// Store of pass statuses
///
/// Each pass is tracked under its own `pass_id`, so passes over the same
/// document never overwrite each other.
pub trait StatusStore: Send + Sync {
    /// Record the latest status of a pass
    fn update(&self, status: PassStatus);

    /// Latest status of one pass
    fn get(&self, pass_id: Uuid) -> Option<PassStatus>;

    /// Status of the most recently started pass over a document
    fn latest(&self, document_id: &str) -> Option<PassStatus>;
}

#[derive(Debug, Default)]
struct Statuses {
    passes: HashMap<Uuid, PassStatus>,
    latest: HashMap<String, Uuid>,
}

/// `StatusStore` kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    statuses: RwLock<Statuses>,
}

impl InMemoryStatusStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget a pass
    pub fn remove(&self, pass_id: Uuid) -> Option<PassStatus> {
        let mut statuses = self.statuses.write().unwrap_or_else(|p| p.into_inner());
        let removed = statuses.passes.remove(&pass_id)?;
        if statuses.latest.get(&removed.document_id) == Some(&pass_id) {
            statuses.latest.remove(&removed.document_id);
        }
        Some(removed)
    }

    /// Number of passes tracked
    pub fn len(&self) -> usize {
        self.statuses
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .passes
            .len()
    }

    /// True if no passes are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatusStore for InMemoryStatusStore {
    fn update(&self, status: PassStatus) {
        let mut statuses = self.statuses.write().unwrap_or_else(|p| p.into_inner());
        if !statuses.passes.contains_key(&status.pass_id) {
            statuses
                .latest
                .insert(status.document_id.clone(), status.pass_id);
        }
        statuses.passes.insert(status.pass_id, status);
    }

    fn get(&self, pass_id: Uuid) -> Option<PassStatus> {
        self.statuses
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .passes
            .get(&pass_id)
            .cloned()
    }

    fn latest(&self, document_id: &str) -> Option<PassStatus> {
        let statuses = self.statuses.read().unwrap_or_else(|p| p.into_inner());
        statuses
            .latest
            .get(document_id)
            .and_then(|pass_id| statuses.passes.get(pass_id))
            .cloned()
    }
}
