// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Command Pattern for compensable webservice writes. Each Change records a
// write already accepted by the remote side and knows the call that undoes
// it.
//
// ============================================================================

use crate::core::Result;
use crate::metadata::MetadataProvider;
use crate::transfer::{Transfer, TransferRef};
use crate::webservice::WebserviceClient;

/// A single remote write recorded during a flush.
#[derive(Debug, Clone)]
pub enum Change {
    /// The object was POSTed.
    Created { object: TransferRef },

    /// The object was PUT. `original` is its clean state before the update.
    Updated {
        object: TransferRef,
        original: Transfer,
    },

    /// The object was DELETEd.
    Deleted { object: TransferRef },
}

impl Change {
    pub fn object(&self) -> &TransferRef {
        match self {
            Change::Created { object }
            | Change::Updated { object, .. }
            | Change::Deleted { object } => object,
        }
    }

    pub fn type_name(&self) -> String {
        self.object().type_name()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Change::Created { .. } => "created",
            Change::Updated { .. } => "updated",
            Change::Deleted { .. } => "deleted",
        }
    }

    /// Issues the compensating call on the remote side.
    pub fn revert(&self, client: &dyn WebserviceClient, metadata: &dyn MetadataProvider) -> Result<()> {
        match self {
            Change::Created { object } => {
                let id = {
                    let transfer = object.borrow();
                    metadata.metadata(transfer.type_name())?.id_value(&transfer)?
                };
                client.delete(&object.type_name(), &id)
            }
            Change::Updated { original, .. } => client.put(&TransferRef::new(original.clone())),
            Change::Deleted { object } => client.post(object),
        }
    }
}
