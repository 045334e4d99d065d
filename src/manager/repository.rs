use tracing::warn;

use super::TransferManager;
use crate::core::{Result, Value};
use crate::event::{LifecycleEvent, PersistenceEvent};
use crate::proxy::ProxyFactory;
use crate::transfer::{Transfer, TransferCollection, TransferRef};
use crate::webservice::{Criteria, CriteriaResult, OperationType};

/// Read access to one transfer type.
///
/// Loaded transfers become proxies tracked by the manager's unit of work.
/// A transfer whose id is already managed resolves to the managed instance,
/// so one id maps to one object per manager. The `find_by*` family treats a
/// 404 answer as an empty result.
#[derive(Clone)]
pub struct TransferRepository {
    manager: TransferManager,
    type_name: String,
}

impl TransferRepository {
    pub(crate) fn new(manager: TransferManager, type_name: impl Into<String>) -> Self {
        Self {
            manager,
            type_name: type_name.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn find(&self, id: impl Into<Value>) -> Result<Option<TransferRef>> {
        let id = id.into();
        if let Some(managed) = self.manager.unit_of_work().fetch(&self.type_name, &id) {
            return Ok(Some(managed));
        }

        match self.manager.client().get(&self.type_name, &id)? {
            Some(transfer) => self.manage(transfer).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_all(&self) -> Result<TransferCollection> {
        let transfers = self.manager.client().c_get(&self.type_name, &[])?;
        self.manage_all(transfers)
    }

    pub fn find_by(&self, filters: &[(&str, Value)]) -> Result<TransferCollection> {
        match self.manager.client().c_get(&self.type_name, filters) {
            Ok(transfers) => self.manage_all(transfers),
            Err(err) if err.is_not_found() => {
                warn!(transfer = %self.type_name, "collection not found, returning empty result");
                Ok(TransferCollection::new())
            }
            Err(err) => Err(err),
        }
    }

    pub fn find_one_by(&self, filters: &[(&str, Value)]) -> Result<Option<TransferRef>> {
        match self.manager.client().c_get(&self.type_name, filters) {
            Ok(transfers) => match transfers.into_iter().next() {
                Some(transfer) => self.manage(transfer).map(Some),
                None => Ok(None),
            },
            Err(err) if err.is_not_found() => {
                warn!(transfer = %self.type_name, "item not found, returning none");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn find_by_criteria(&self, criteria: Criteria) -> Result<TransferCollection> {
        let criteria = criteria.with_operation_type(OperationType::Collection);
        match self.manager.client().get_by_criteria(&criteria, &self.type_name) {
            Ok(CriteriaResult::Collection(transfers)) => self.manage_all(transfers),
            Ok(CriteriaResult::Item(transfer)) => self.manage_all(transfer.into_iter().collect()),
            Err(err) if err.is_not_found() => {
                warn!(transfer = %self.type_name, "criteria matched nothing, returning empty result");
                Ok(TransferCollection::new())
            }
            Err(err) => Err(err),
        }
    }

    pub fn find_one_by_criteria(&self, criteria: Criteria) -> Result<Option<TransferRef>> {
        let criteria = criteria.with_operation_type(OperationType::Item);
        let transfer = match self.manager.client().get_by_criteria(&criteria, &self.type_name) {
            Ok(CriteriaResult::Item(transfer)) => transfer,
            Ok(CriteriaResult::Collection(transfers)) => transfers.into_iter().next(),
            Err(err) if err.is_not_found() => {
                warn!(transfer = %self.type_name, "criteria matched nothing, returning none");
                None
            }
            Err(err) => return Err(err),
        };

        transfer.map(|transfer| self.manage(transfer)).transpose()
    }

    fn manage_all(&self, transfers: Vec<Transfer>) -> Result<TransferCollection> {
        transfers
            .into_iter()
            .map(|transfer| self.manage(transfer))
            .collect()
    }

    /// Resolves a loaded transfer against the identity map, or proxies and
    /// tracks it. Transfers loaded without an id are proxied but not
    /// tracked.
    fn manage(&self, transfer: Transfer) -> Result<TransferRef> {
        let metadata = self.manager.metadata(transfer.type_name())?;
        let id = metadata.id_value(&transfer)?;

        if !id.is_empty() {
            if let Some(managed) = self.manager.unit_of_work().fetch(transfer.type_name(), &id) {
                return Ok(managed);
            }
        }

        let object = ProxyFactory::create_proxy(TransferRef::new(transfer), &self.manager)?;
        if !id.is_empty() {
            self.manager.unit_of_work_cell().borrow_mut().attach(&object)?;
        }
        self.manager
            .dispatch(&LifecycleEvent::for_object(PersistenceEvent::OnLoad, &object))?;
        Ok(object)
    }
}

impl std::fmt::Debug for TransferRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRepository")
            .field("type_name", &self.type_name)
            .finish()
    }
}
