// ============================================================================
// Transactional Flushes
// ============================================================================
//
// Best-effort compensation for partially applied flushes. The remote side
// has no transactions, so every accepted write is journaled and undone with
// an inverse call when the flush fails.
//
// Design Patterns Used:
// - State Pattern: Transaction lifecycle (Active, Committed, Aborted)
// - Command Pattern: Compensable writes for rollback
// - Observer: The journal is fed by persistence events
//
// ============================================================================

pub mod change;
pub mod listener;
pub mod state;

pub use change::Change;
pub use listener::TransactionEventListener;
pub use state::{Transaction, TransactionId, TransactionState};
