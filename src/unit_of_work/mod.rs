// ============================================================================
// Unit of Work
// ============================================================================
//
// Tracks the lifecycle state of every transfer relative to a clean snapshot:
//
//   New ──attach with id──▶ Managed (clean / dirty) ──remove──▶ Removed
//    │                                                              │
//    └────────────────────────── detach ────────────────────────────┴──▶ Detached
//
// Flush visits new objects first, then managed ones, then removed ones.
//
// ============================================================================

pub mod snapshot;

pub use snapshot::Snapshot;

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::{MapperError, Result, Value};
use crate::metadata::{ForeignKey, MetadataProvider, Relationship};
use crate::storage::ObjectStorage;
use crate::transfer::{ObjectKey, Transfer, TransferRef};

pub struct UnitOfWork {
    metadata: Arc<dyn MetadataProvider>,
    new_objects: Vec<TransferRef>,
    managed: ObjectStorage,
    snapshots: HashMap<ObjectKey, Snapshot>,
    removed: Vec<TransferRef>,
}

fn position(list: &[TransferRef], object: &TransferRef) -> Option<usize> {
    list.iter().position(|item| item.ptr_eq(object))
}

impl UnitOfWork {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            managed: ObjectStorage::new(metadata.clone()),
            metadata,
            new_objects: Vec::new(),
            snapshots: HashMap::new(),
            removed: Vec::new(),
        }
    }

    fn id_value(&self, object: &TransferRef) -> Result<Value> {
        let transfer = object.borrow();
        self.metadata
            .metadata(transfer.type_name())?
            .id_value(&transfer)
    }

    /// Starts tracking the object. Without an id it is recorded as new;
    /// with one it becomes managed and gets a snapshot unless it already
    /// has one. Idempotent.
    pub fn attach(&mut self, object: &TransferRef) -> Result<()> {
        let id = self.id_value(object)?;

        if let Some(index) = position(&self.removed, object) {
            self.removed.remove(index);
        }

        if id.is_empty() {
            if position(&self.new_objects, object).is_none() {
                debug!(transfer = %object.type_name(), "tracking new transfer");
                self.new_objects.push(object.clone());
            }
            return Ok(());
        }

        if let Some(index) = position(&self.new_objects, object) {
            self.new_objects.remove(index);
        }

        if !self.managed.contains_instance(object) {
            let type_name = object.type_name();
            if let Some(previous) = self.managed.fetch_by_params(&type_name, &id) {
                self.snapshots.remove(&previous.key());
            }
            self.managed.attach(object)?;
            debug!(transfer = %type_name, id = %id, "tracking managed transfer");
        }

        self.snapshots
            .entry(object.key())
            .or_insert_with(|| Snapshot::capture(&object.borrow()));
        Ok(())
    }

    /// Stops tracking the object entirely. No-op when untracked.
    pub fn detach(&mut self, object: &TransferRef) -> Result<()> {
        if let Some(index) = position(&self.new_objects, object) {
            self.new_objects.remove(index);
        }
        if let Some(index) = position(&self.removed, object) {
            self.removed.remove(index);
        }
        if self.managed.contains_instance(object) {
            self.managed.detach(object)?;
        }
        self.snapshots.remove(&object.key());
        Ok(())
    }

    /// Schedules a tracked object for deletion.
    pub fn remove(&mut self, object: &TransferRef) -> Result<()> {
        if self.is_removed(object) {
            return Ok(());
        }
        if !self.contains(object) {
            return Err(MapperError::UnmanagedObject(object.type_name()));
        }

        if let Some(index) = position(&self.new_objects, object) {
            self.new_objects.remove(index);
        }
        if self.managed.contains_instance(object) {
            self.managed.detach(object)?;
        }
        self.snapshots.remove(&object.key());

        debug!(transfer = %object.type_name(), "scheduling transfer removal");
        self.removed.push(object.clone());
        Ok(())
    }

    /// Tracked as new or managed.
    pub fn contains(&self, object: &TransferRef) -> bool {
        position(&self.new_objects, object).is_some() || self.managed.contains_instance(object)
    }

    pub fn is_new(&self, object: &TransferRef) -> Result<bool> {
        Ok(self.id_value(object)?.is_empty() && !self.snapshots.contains_key(&object.key()))
    }

    pub fn is_dirty(&self, object: &TransferRef) -> Result<bool> {
        if !self.snapshots.contains_key(&object.key()) {
            return Ok(false);
        }
        Ok(!self.is_equals(object)?)
    }

    pub fn is_removed(&self, object: &TransferRef) -> bool {
        position(&self.removed, object).is_some()
    }

    pub fn is_detached(&self, object: &TransferRef) -> bool {
        !self.contains(object) && !self.is_removed(object)
    }

    /// Compares the object with its snapshot.
    ///
    /// `HasOne`/`HasMany` relations are derived data and never compared. A
    /// single `BelongsTo` compares the related object's id (or IRI for text
    /// foreign keys) with the snapshot's foreign key; a composite one
    /// compares the owner's foreign fields with the related object's.
    pub fn is_equals(&self, object: &TransferRef) -> Result<bool> {
        let Some(snapshot) = self.snapshots.get(&object.key()) else {
            return Ok(false);
        };

        let transfer = object.borrow();
        let metadata = self.metadata.metadata(transfer.type_name())?;

        for prop in &metadata.properties {
            let equal = match &prop.relationship {
                None => transfer.get(&prop.name).loose_eq(snapshot.get(&prop.name)),
                Some(Relationship::HasOne { .. } | Relationship::HasMany { .. }) => true,
                Some(Relationship::BelongsTo { target, foreign }) => {
                    match transfer.related_one(&prop.name) {
                        None => true,
                        Some(related) => {
                            self.belongs_to_matches(&transfer, &related, target, foreign, snapshot)?
                        }
                    }
                }
            };

            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn belongs_to_matches(
        &self,
        transfer: &Transfer,
        related: &TransferRef,
        target: &str,
        foreign: &ForeignKey,
        snapshot: &Snapshot,
    ) -> Result<bool> {
        let related = related.borrow();

        match foreign {
            ForeignKey::Composite(fields) => Ok(fields
                .iter()
                .all(|field| transfer.get(field).loose_eq(related.get(field)))),
            ForeignKey::Single(field) => {
                let metadata = self.metadata.metadata(transfer.type_name())?;
                let target_metadata = self.metadata.metadata(target)?;
                let related_id = target_metadata.id_value(&related)?;

                let is_text = metadata
                    .property(field)
                    .is_some_and(|prop| prop.field_type.is_text());
                let reference = if is_text && !related_id.is_empty() {
                    Value::Text(target_metadata.resource.iri(&related_id))
                } else {
                    related_id
                };

                Ok(reference.loose_eq(snapshot.get(field)))
            }
        }
    }

    /// The snapshot of a managed object as a detached transfer.
    pub fn original_object(&self, object: &TransferRef) -> Option<Transfer> {
        self.snapshots.get(&object.key()).map(Snapshot::to_transfer)
    }

    /// Managed instance with the given type and id.
    pub fn fetch(&self, type_name: &str, id: &Value) -> Option<TransferRef> {
        self.managed.fetch_by_params(type_name, id)
    }

    /// New, then managed, then removed objects.
    pub fn flush_order(&self) -> Vec<TransferRef> {
        self.new_objects
            .iter()
            .chain(self.managed.iter())
            .chain(self.removed.iter())
            .cloned()
            .collect()
    }

    pub fn new_objects(&self) -> &[TransferRef] {
        &self.new_objects
    }

    pub fn managed(&self) -> &ObjectStorage {
        &self.managed
    }

    pub fn removed_objects(&self) -> &[TransferRef] {
        &self.removed
    }

    pub fn clear(&mut self) {
        self.new_objects.clear();
        self.managed.clear();
        self.snapshots.clear();
        self.removed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blog_metadata;

    fn uow() -> UnitOfWork {
        UnitOfWork::new(blog_metadata())
    }

    fn post(id: i64) -> TransferRef {
        TransferRef::new(
            Transfer::new("Post")
                .with("id", id)
                .with("title", "first")
                .with("author_id", 1),
        )
    }

    #[test]
    fn test_attach_without_id_records_new() {
        let mut uow = uow();
        let fresh = TransferRef::new(Transfer::new("Post").with("title", "draft"));
        uow.attach(&fresh).unwrap();
        uow.attach(&fresh).unwrap();

        assert!(uow.is_new(&fresh).unwrap());
        assert!(!uow.is_dirty(&fresh).unwrap());
        assert_eq!(uow.new_objects().len(), 1);
        assert!(uow.contains(&fresh));
    }

    #[test]
    fn test_dirty_checking_round_trip() {
        let mut uow = uow();
        let post = post(1);
        uow.attach(&post).unwrap();
        assert!(!uow.is_dirty(&post).unwrap());
        assert!(!uow.is_new(&post).unwrap());

        post.set("title", "second");
        assert!(uow.is_dirty(&post).unwrap());

        post.set("title", "first");
        assert!(!uow.is_dirty(&post).unwrap());
    }

    #[test]
    fn test_attach_keeps_existing_snapshot() {
        let mut uow = uow();
        let post = post(1);
        uow.attach(&post).unwrap();
        post.set("title", "changed");
        uow.attach(&post).unwrap();
        assert!(uow.is_dirty(&post).unwrap());
    }

    #[test]
    fn test_has_many_is_never_compared() {
        let mut uow = uow();
        let post = post(1);
        uow.attach(&post).unwrap();

        let comment = TransferRef::new(Transfer::new("Comment").with("body", "hi"));
        post.set_related_many("comments", vec![comment]);
        assert!(!uow.is_dirty(&post).unwrap());
    }

    #[test]
    fn test_belongs_to_compares_related_id_with_snapshot() {
        let mut uow = uow();
        let post = post(1);
        uow.attach(&post).unwrap();

        let same = TransferRef::new(Transfer::new("User").with("id", 1));
        post.set_related("author", Some(same));
        assert!(!uow.is_dirty(&post).unwrap());

        let other = TransferRef::new(Transfer::new("User").with("id", 2));
        post.set_related("author", Some(other));
        assert!(uow.is_dirty(&post).unwrap());
    }

    #[test]
    fn test_composite_belongs_to_compares_with_related() {
        let mut uow = uow();
        let sheet = TransferRef::new(Transfer::new("Sheet").with("id", 3).with("x", 1).with("y", 2));
        uow.attach(&sheet).unwrap();

        let cell = TransferRef::new(Transfer::new("Cell").with("x", 1).with("y", 2));
        sheet.set_related("cell", Some(cell.clone()));
        assert!(!uow.is_dirty(&sheet).unwrap());

        cell.set("y", 5);
        assert!(uow.is_dirty(&sheet).unwrap());
    }

    #[test]
    fn test_remove_requires_tracking() {
        let mut uow = uow();
        let stranger = post(9);
        let err = uow.remove(&stranger).unwrap_err();
        assert!(matches!(err, MapperError::UnmanagedObject(name) if name == "Post"));
        assert!(uow.is_detached(&stranger));
    }

    #[test]
    fn test_remove_moves_to_removal_set() {
        let mut uow = uow();
        let post = post(1);
        uow.attach(&post).unwrap();
        uow.remove(&post).unwrap();

        assert!(uow.is_removed(&post));
        assert!(!uow.contains(&post));
        assert!(!uow.is_detached(&post));
        assert!(uow.managed().is_empty());

        uow.detach(&post).unwrap();
        assert!(uow.is_detached(&post));
    }

    #[test]
    fn test_flush_order() {
        let mut uow = uow();
        let managed = post(1);
        let doomed = post(2);
        let fresh = TransferRef::new(Transfer::new("Post"));

        uow.attach(&managed).unwrap();
        uow.attach(&doomed).unwrap();
        uow.attach(&fresh).unwrap();
        uow.remove(&doomed).unwrap();

        let order = uow.flush_order();
        assert_eq!(order.len(), 3);
        assert!(order[0].ptr_eq(&fresh));
        assert!(order[1].ptr_eq(&managed));
        assert!(order[2].ptr_eq(&doomed));
    }

    #[test]
    fn test_new_object_becomes_managed_after_id_assignment() {
        let mut uow = uow();
        let fresh = TransferRef::new(Transfer::new("Post").with("title", "x"));
        uow.attach(&fresh).unwrap();

        fresh.set("id", 10);
        uow.detach(&fresh).unwrap();
        uow.attach(&fresh).unwrap();

        assert!(!uow.is_new(&fresh).unwrap());
        assert!(uow.new_objects().is_empty());
        assert!(uow.fetch("Post", &Value::Integer(10)).unwrap().ptr_eq(&fresh));
    }

    #[test]
    fn test_original_object() {
        let mut uow = uow();
        let post = post(1);
        uow.attach(&post).unwrap();
        post.set("title", "changed");

        let original = uow.original_object(&post).unwrap();
        assert_eq!(original.get("title"), &Value::Text("first".into()));
        assert!(uow.original_object(&TransferRef::new(Transfer::new("Post"))).is_none());
    }
}
