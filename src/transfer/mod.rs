// ============================================================================
// Transfers
// ============================================================================
//
// A transfer is a dynamic record mapped to a remote resource: scalar fields
// described by its metadata plus relation slots holding related transfers.
// Application code shares transfers through `TransferRef` handles; the unit
// of work and the object storage observe them by identity.
//
// ============================================================================

pub mod collection;
pub mod reference;
pub mod relation;

pub use collection::TransferCollection;
pub use reference::{ObjectKey, TransferRef};
pub use relation::{RelationLoader, RelationSlot, RelationValue, SlotState};

use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

use crate::core::Value;

#[derive(Clone)]
pub struct Transfer {
    type_name: String,
    fields: IndexMap<String, Value>,
    relations: IndexMap<String, RelationSlot>,
    loader: Option<Rc<dyn RelationLoader>>,
}

impl Transfer {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            relations: IndexMap::new(),
            loader: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field value, `Null` when the field was never set.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(Value::null_ref())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    // Relation slots. These accessors never trigger lazy loading; use
    // `TransferRef::related` for that.

    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name).map(RelationSlot::value)
    }

    pub fn relation_slot(&self, name: &str) -> Option<&RelationSlot> {
        self.relations.get(name)
    }

    pub fn related_one(&self, name: &str) -> Option<TransferRef> {
        match self.relation(name) {
            Some(RelationValue::One(related)) => related.clone(),
            _ => None,
        }
    }

    /// Every related transfer held in the slot, single or collection.
    pub fn related_refs(&self, name: &str) -> Vec<TransferRef> {
        self.relation(name)
            .map(RelationValue::refs)
            .unwrap_or_default()
    }

    pub fn set_one(&mut self, name: impl Into<String>, related: Option<TransferRef>) {
        self.relations
            .insert(name.into(), RelationSlot::initialized(RelationValue::One(related)));
    }

    pub fn set_many(&mut self, name: impl Into<String>, related: Vec<TransferRef>) {
        self.relations
            .insert(name.into(), RelationSlot::initialized(RelationValue::Many(related)));
    }

    pub fn push_many(&mut self, name: &str, related: TransferRef) {
        match self.relations.get_mut(name) {
            Some(slot) => slot.push(related),
            None => self.set_many(name, vec![related]),
        }
    }

    pub fn with_one(mut self, name: impl Into<String>, related: &TransferRef) -> Self {
        self.set_one(name, Some(related.clone()));
        self
    }

    pub fn with_many(mut self, name: impl Into<String>, related: Vec<TransferRef>) -> Self {
        self.set_many(name, related);
        self
    }

    pub fn is_proxy(&self) -> bool {
        self.loader.is_some()
    }

    pub(crate) fn install_loader(&mut self, loader: Rc<dyn RelationLoader>) {
        self.loader = Some(loader);
    }

    pub(crate) fn loader(&self) -> Option<Rc<dyn RelationLoader>> {
        self.loader.clone()
    }

    /// True while a proxy may still fetch this relation on access.
    pub(crate) fn is_pending(&self, name: &str) -> bool {
        self.loader.is_some()
            && self
                .relations
                .get(name)
                .is_none_or(|slot| slot.state() == SlotState::Uninitialized)
    }

    pub(crate) fn reset_slot(&mut self, name: &str, value: RelationValue) {
        self.relations
            .insert(name.to_string(), RelationSlot::uninitialized(value));
    }

    pub(crate) fn resolve(&mut self, name: &str, value: RelationValue) {
        self.relations
            .insert(name.to_string(), RelationSlot::initialized(value));
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relations: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        f.debug_struct("Transfer")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("relations", &relations)
            .field("proxy", &self.is_proxy())
            .finish()
    }
}
