// ============================================================================
// Transfer Manager
// ============================================================================
//
// Entry point for application code. Owns the unit of work, the webservice
// client and the event dispatcher; hands out repositories and proxies and
// runs flushes through the persister.
//
// Cloning a manager yields another handle to the same state.
//
// ============================================================================

pub mod builder;
pub mod registry;
pub mod repository;

pub use builder::TransferManagerBuilder;
pub use registry::TransferManagerRegistry;
pub use repository::TransferRepository;

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{Result, Value};
use crate::event::{EventDispatcher, EventListener, LifecycleEvent, PersistenceEvent};
use crate::metadata::{MetadataProvider, TransferMetadata};
use crate::persister::TransferPersister;
use crate::proxy::ProxyFactory;
use crate::transfer::TransferRef;
use crate::unit_of_work::UnitOfWork;
use crate::webservice::WebserviceClient;

pub(crate) struct ManagerInner {
    metadata: Arc<dyn MetadataProvider>,
    client: Rc<dyn WebserviceClient>,
    unit_of_work: RefCell<UnitOfWork>,
    events: RefCell<EventDispatcher>,
}

#[derive(Clone)]
pub struct TransferManager {
    inner: Rc<ManagerInner>,
}

impl TransferManager {
    pub fn new(metadata: Arc<dyn MetadataProvider>, client: Rc<dyn WebserviceClient>) -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                unit_of_work: RefCell::new(UnitOfWork::new(metadata.clone())),
                metadata,
                client,
                events: RefCell::new(EventDispatcher::new()),
            }),
        }
    }

    pub fn builder() -> TransferManagerBuilder {
        TransferManagerBuilder::new()
    }

    pub(crate) fn downgrade(&self) -> Weak<ManagerInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<ManagerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Both handles point at the same manager.
    pub fn ptr_eq(&self, other: &TransferManager) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Schedules the object for creation, or starts tracking changes of an
    /// existing one.
    pub fn persist(&self, object: &TransferRef) -> Result<()> {
        self.inner.unit_of_work.borrow_mut().attach(object)
    }

    /// Schedules a tracked object for deletion on the next flush.
    pub fn remove(&self, object: &TransferRef) -> Result<()> {
        self.inner.unit_of_work.borrow_mut().remove(object)
    }

    pub fn detach(&self, object: &TransferRef) -> Result<()> {
        self.inner.unit_of_work.borrow_mut().detach(object)
    }

    pub fn contains(&self, object: &TransferRef) -> bool {
        self.inner.unit_of_work.borrow().contains(object)
    }

    /// Forgets every tracked object.
    pub fn clear(&self) {
        self.inner.unit_of_work.borrow_mut().clear();
    }

    /// Writes every pending change: new objects, then managed ones, then
    /// removals.
    ///
    /// A failure aborts the remaining writes and is reported to `OnException`
    /// listeners. An error raised by one of those listeners replaces the
    /// original failure.
    pub fn flush(&self) -> Result<()> {
        let events = self.events();
        events.dispatch(&LifecycleEvent::new(PersistenceEvent::PreFlush))?;

        let order = self.inner.unit_of_work.borrow().flush_order();
        let mut persister = TransferPersister::new(
            &self.inner.unit_of_work,
            self.inner.client.as_ref(),
            self.inner.metadata.as_ref(),
            &events,
        );

        let result = order.iter().try_for_each(|object| {
            if self.inner.unit_of_work.borrow().is_detached(object) {
                return Ok(());
            }
            persister.save(object, None)
        });

        match result {
            Ok(()) => {
                events.dispatch(&LifecycleEvent::new(PersistenceEvent::PostFlush))?;
                info!(transfers = order.len(), "flush completed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "flush failed");
                events.dispatch(&LifecycleEvent::exception(&err))?;
                Err(err)
            }
        }
    }

    /// Managed instance or a freshly loaded proxy, `None` when the
    /// webservice has nothing under that id.
    pub fn find(&self, type_name: &str, id: impl Into<Value>) -> Result<Option<TransferRef>> {
        self.repository(type_name)?.find(id)
    }

    pub fn repository(&self, type_name: &str) -> Result<TransferRepository> {
        self.metadata(type_name)?;
        Ok(TransferRepository::new(self.clone(), type_name))
    }

    /// Empty proxy of the given type, not yet tracked.
    pub fn create(&self, type_name: &str) -> Result<TransferRef> {
        ProxyFactory::create_proxy_for_type(type_name, self)
    }

    pub fn metadata(&self, type_name: &str) -> Result<Arc<TransferMetadata>> {
        self.inner.metadata.metadata(type_name)
    }

    pub fn metadata_provider(&self) -> Arc<dyn MetadataProvider> {
        self.inner.metadata.clone()
    }

    pub fn client(&self) -> Rc<dyn WebserviceClient> {
        self.inner.client.clone()
    }

    pub fn unit_of_work(&self) -> Ref<'_, UnitOfWork> {
        self.inner.unit_of_work.borrow()
    }

    pub fn add_listener(&self, event: PersistenceEvent, listener: Rc<dyn EventListener>) {
        self.inner.events.borrow_mut().add_listener(event, listener);
    }

    pub fn subscribe(&self, events: &[PersistenceEvent], listener: Rc<dyn EventListener>) {
        self.inner.events.borrow_mut().subscribe(events, listener);
    }

    // Listeners may register further listeners, so dispatch runs on a copy.
    fn events(&self) -> EventDispatcher {
        self.inner.events.borrow().clone()
    }

    pub(crate) fn dispatch(&self, event: &LifecycleEvent<'_>) -> Result<()> {
        self.events().dispatch(event)
    }

    pub(crate) fn unit_of_work_cell(&self) -> &RefCell<UnitOfWork> {
        &self.inner.unit_of_work
    }
}

impl std::fmt::Debug for TransferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit_of_work = self.inner.unit_of_work.try_borrow();
        f.debug_struct("TransferManager")
            .field(
                "tracked",
                &unit_of_work.map(|uow| uow.flush_order().len()).ok(),
            )
            .finish()
    }
}
