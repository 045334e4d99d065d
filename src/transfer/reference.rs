use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::{RelationValue, Transfer};
use crate::core::{Result, Value};

/// Identity of a live transfer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

/// Shared handle to a transfer. Clones point at the same instance.
#[derive(Clone)]
pub struct TransferRef(Rc<RefCell<Transfer>>);

impl TransferRef {
    pub fn new(transfer: Transfer) -> Self {
        Self(Rc::new(RefCell::new(transfer)))
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey(Rc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn ptr_eq(&self, other: &TransferRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, Transfer> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Transfer> {
        self.0.borrow_mut()
    }

    pub fn type_name(&self) -> String {
        self.borrow().type_name().to_string()
    }

    pub fn get(&self, field: &str) -> Value {
        self.borrow().get(field).clone()
    }

    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        self.borrow_mut().set(field, value);
    }

    pub fn is_proxy(&self) -> bool {
        self.borrow().is_proxy()
    }

    pub fn set_related(&self, name: impl Into<String>, related: Option<TransferRef>) {
        self.borrow_mut().set_one(name, related);
    }

    pub fn set_related_many(&self, name: impl Into<String>, related: Vec<TransferRef>) {
        self.borrow_mut().set_many(name, related);
    }

    /// Single related transfer. On a proxy the first read of an empty
    /// relation fetches it; later reads return the cached value.
    pub fn related(&self, name: &str) -> Result<Option<TransferRef>> {
        self.initialize(name)?;
        Ok(self.borrow().related_one(name))
    }

    /// Related collection, fetched on first read like `related`.
    pub fn related_many(&self, name: &str) -> Result<Vec<TransferRef>> {
        self.initialize(name)?;
        Ok(self.borrow().related_refs(name))
    }

    fn initialize(&self, name: &str) -> Result<()> {
        let loader = {
            let transfer = self.borrow();
            if !transfer.is_pending(name) {
                return Ok(());
            }
            transfer.loader()
        };

        if let Some(loader) = loader {
            if let Some(value) = loader.load(self, name)? {
                self.borrow_mut().resolve(name, value);
            }
        }
        Ok(())
    }
}

impl From<Transfer> for TransferRef {
    fn from(transfer: Transfer) -> Self {
        Self::new(transfer)
    }
}

impl fmt::Debug for TransferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(transfer) => transfer.fmt(f),
            Err(_) => write!(f, "TransferRef(<borrowed>)"),
        }
    }
}

/// Identity-based equality, matching how the unit of work tracks instances.
impl PartialEq for TransferRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TransferRef {}
