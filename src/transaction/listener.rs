use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::info;

use super::{Change, Transaction};
use crate::core::{MapperError, Result};
use crate::event::{EventListener, LifecycleEvent, PersistenceEvent};
use crate::metadata::MetadataProvider;
use crate::webservice::WebserviceClient;

/// Journals the writes of a flush and compensates them when the flush
/// fails.
///
/// Register it for [`TransactionEventListener::EVENTS`]. A successful flush
/// commits the journal and a new transaction starts for the next one.
pub struct TransactionEventListener {
    client: Rc<dyn WebserviceClient>,
    metadata: Arc<dyn MetadataProvider>,
    transaction: RefCell<Transaction>,
}

impl TransactionEventListener {
    pub const EVENTS: [PersistenceEvent; 5] = [
        PersistenceEvent::PostPersist,
        PersistenceEvent::PreUpdate,
        PersistenceEvent::PostRemove,
        PersistenceEvent::PostFlush,
        PersistenceEvent::OnException,
    ];

    pub fn new(client: Rc<dyn WebserviceClient>, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            client,
            metadata,
            transaction: RefCell::new(Transaction::default()),
        }
    }

    /// Changes journaled by the running transaction.
    pub fn pending_changes(&self) -> usize {
        self.transaction.borrow().change_count()
    }

    fn record(&self, change: Change) -> Result<()> {
        self.transaction.borrow_mut().record_change(change)
    }

    fn finish(&self, rollback: bool) -> Result<()> {
        let mut finished = self.transaction.replace(Transaction::default());
        if rollback {
            info!(transaction = %finished.id(), changes = finished.change_count(), "rolling back flush");
            finished.rollback(self.client.as_ref(), self.metadata.as_ref())
        } else {
            finished.commit()
        }
    }
}

impl EventListener for TransactionEventListener {
    fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<()> {
        match (event.event, event.object) {
            (PersistenceEvent::PostPersist, Some(object)) => self.record(Change::Created {
                object: object.clone(),
            }),
            (PersistenceEvent::PreUpdate, Some(object)) => {
                let original = event.original.cloned().ok_or_else(|| {
                    MapperError::Transaction(format!(
                        "update of '{}' carries no original state",
                        object.type_name()
                    ))
                })?;
                self.record(Change::Updated {
                    object: object.clone(),
                    original,
                })
            }
            (PersistenceEvent::PostRemove, Some(object)) => self.record(Change::Deleted {
                object: object.clone(),
            }),
            (PersistenceEvent::PostFlush, _) => self.finish(false),
            (PersistenceEvent::OnException, _) => self.finish(true),
            _ => Ok(()),
        }
    }
}
