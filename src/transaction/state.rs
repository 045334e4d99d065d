// ============================================================================
// Transaction State Management
// ============================================================================
//
// State Pattern for the write journal kept across one flush:
// Active -> Committed | Aborted
//
// Only the first change per object is journaled, since that is the one
// whose compensation restores the state seen before the flush.
//
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::Change;
use crate::core::{MapperError, Result};
use crate::metadata::MetadataProvider;
use crate::webservice::WebserviceClient;

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::Aborted
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => write!(f, "ACTIVE"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Journal of remote writes that can be compensated on failure.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    changes: Vec<Change>,
    start_time: Instant,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new(TransactionId::new())
    }
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            changes: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        if !self.state.is_active() {
            return Err(MapperError::Transaction(format!(
                "cannot {}: transaction {} is {}",
                action, self.id, self.state
            )));
        }
        Ok(())
    }

    /// Journals a change.
    ///
    /// An object already journaled keeps its first change, with two
    /// exceptions: deleting a created object cancels the entry, and
    /// deleting an updated one journals the deletion of its original.
    pub fn record_change(&mut self, change: Change) -> Result<()> {
        self.ensure_active("record change")?;

        let existing = self
            .changes
            .iter()
            .position(|recorded| recorded.object().ptr_eq(change.object()));

        match (existing, change) {
            (None, change) => self.changes.push(change),
            (Some(index), Change::Deleted { .. }) => match self.changes.remove(index) {
                Change::Created { .. } => {}
                Change::Updated { original, .. } => self.changes.push(Change::Deleted {
                    object: original.into(),
                }),
                deleted @ Change::Deleted { .. } => self.changes.insert(index, deleted),
            },
            (Some(_), _) => {}
        }
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active("commit")?;

        debug!(transaction = %self.id, changes = self.changes.len(), "transaction committed");
        self.changes.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Reverts every journaled change, newest first. Every compensation is
    /// attempted; the first failure is returned as `MapperError::Rollback`.
    pub fn rollback(
        &mut self,
        client: &dyn WebserviceClient,
        metadata: &dyn MetadataProvider,
    ) -> Result<()> {
        self.ensure_active("rollback")?;
        self.state = TransactionState::Aborted;

        let mut first_error = None;
        for change in self.changes.drain(..).rev() {
            debug!(transaction = %self.id, kind = change.kind(), transfer = %change.type_name(), "reverting change");
            if let Err(err) = change.revert(client, metadata) {
                warn!(transaction = %self.id, kind = change.kind(), error = %err, "compensation failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(MapperError::Rollback(Box::new(err))),
            None => Ok(()),
        }
    }
}
