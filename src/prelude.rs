//! Recommended API entrypoints grouped by abstraction level.
//!
//! `dx` covers application code: declaring transfers, loading and saving
//! them. `advanced` exposes the machinery underneath for custom clients,
//! listeners and tests.

pub mod dx {
    //! Stable high-level surface.
    pub use crate::core::{FieldType, MapperError, Result, Value};
    pub use crate::manager::{TransferManager, TransferRepository};
    pub use crate::metadata::{MetadataRegistry, Resource, TransferMetadata};
    pub use crate::transfer::{Transfer, TransferCollection, TransferRef};
    pub use crate::webservice::{ClientConfig, Criteria, OperationType};
}

pub mod advanced {
    //! Escape hatch for the persistence internals.
    pub use crate::event::{EventDispatcher, EventListener, LifecycleEvent, PersistenceEvent};
    pub use crate::metadata::{ForeignKey, MetadataProvider, PropertyMetadata, Relationship};
    pub use crate::persister::TransferPersister;
    pub use crate::proxy::ProxyFactory;
    pub use crate::storage::ObjectStorage;
    pub use crate::transaction::{Change, Transaction, TransactionEventListener};
    pub use crate::transfer::{RelationLoader, RelationValue, SlotState};
    pub use crate::unit_of_work::{Snapshot, UnitOfWork};
    pub use crate::webservice::{
        ClientRegistry, HttpRequest, HttpResponse, HttpTransport, HttpWebserviceClient,
        WebserviceClient,
    };
}
