// ============================================================================
// Transfer Persister
// ============================================================================
//
// Writes one transfer and the part of its relationship graph that changed:
//
//   prerequisites (BelongsTo, IRI HasMany)  ──▶ saved first, ids copied in
//   the transfer itself                     ──▶ POST / PUT / DELETE
//   dependents (HasOne, HasMany back-refs)  ──▶ owner id copied out, saved
//
// Unchanged related transfers cost no request. The stack of transfers being
// saved guards against relationship cycles.
//
// ============================================================================

use std::cell::RefCell;
use tracing::debug;

use crate::core::{MapperError, Result, Value};
use crate::event::{EventDispatcher, LifecycleEvent, PersistenceEvent};
use crate::metadata::{ForeignKey, MetadataProvider, Relationship, TransferMetadata};
use crate::transfer::{SlotState, TransferRef};
use crate::unit_of_work::UnitOfWork;
use crate::webservice::WebserviceClient;

pub struct TransferPersister<'a> {
    unit_of_work: &'a RefCell<UnitOfWork>,
    client: &'a dyn WebserviceClient,
    metadata: &'a dyn MetadataProvider,
    events: &'a EventDispatcher,
    in_progress: Vec<TransferRef>,
}

enum WriteKind {
    Create,
    Update,
    Delete,
    Skip,
}

impl<'a> TransferPersister<'a> {
    pub fn new(
        unit_of_work: &'a RefCell<UnitOfWork>,
        client: &'a dyn WebserviceClient,
        metadata: &'a dyn MetadataProvider,
        events: &'a EventDispatcher,
    ) -> Self {
        Self {
            unit_of_work,
            client,
            metadata,
            events,
            in_progress: Vec::new(),
        }
    }

    /// Saves the object. `owner` is the transfer whose save reached this
    /// one through a relationship, if any.
    pub fn save(&mut self, object: &TransferRef, owner: Option<&TransferRef>) -> Result<()> {
        if self.is_in_progress(object) {
            return Ok(());
        }

        self.in_progress.push(object.clone());
        let result = self.save_in_progress(object, owner);
        self.in_progress.pop();
        result
    }

    fn is_in_progress(&self, object: &TransferRef) -> bool {
        self.in_progress.iter().any(|item| item.ptr_eq(object))
    }

    fn save_in_progress(&mut self, object: &TransferRef, owner: Option<&TransferRef>) -> Result<()> {
        let metadata = self.metadata.metadata(&object.type_name())?;
        let removed = self.unit_of_work.borrow().is_removed(object);

        if !removed {
            self.save_prerequisites(object, &metadata)?;
        }
        self.persist_transfer(object, owner, &metadata)?;
        if !removed {
            self.save_dependents(object, &metadata)?;
        }
        Ok(())
    }

    fn save_prerequisites(&mut self, object: &TransferRef, metadata: &TransferMetadata) -> Result<()> {
        for (prop, relationship) in metadata.associations() {
            if !relationship.is_prerequisite() {
                continue;
            }
            let related = object.borrow().related_refs(&prop.name);
            for related in related {
                self.save_related(object, &prop.name, &related, true)?;
            }
        }
        Ok(())
    }

    fn save_dependents(&mut self, object: &TransferRef, metadata: &TransferMetadata) -> Result<()> {
        let owner_id = metadata.id_value(&object.borrow())?;
        if owner_id.is_empty() {
            return Ok(());
        }

        for (prop, relationship) in metadata.associations() {
            let Some(back_reference) = relationship.back_reference_field() else {
                continue;
            };
            let related = object.borrow().related_refs(&prop.name);
            if related.is_empty() {
                continue;
            }

            let reference = self.reference_for(metadata, &owner_id, relationship.target(), back_reference)?;
            for related in related {
                related.set(back_reference, reference.clone());
                self.save_related(object, &prop.name, &related, false)?;
            }
        }
        Ok(())
    }

    /// Re-attaches a detached related transfer and saves it when it is new
    /// or changed.
    fn save_related(
        &mut self,
        owner: &TransferRef,
        property: &str,
        related: &TransferRef,
        prerequisite: bool,
    ) -> Result<()> {
        if self.is_in_progress(related) {
            if prerequisite && self.id_value(related)?.is_empty() {
                return Err(MapperError::RelationshipCycle {
                    type_name: owner.type_name(),
                    property: property.to_string(),
                });
            }
            return Ok(());
        }

        let needs_write = {
            let mut unit_of_work = self.unit_of_work.borrow_mut();
            if unit_of_work.is_removed(related) {
                false
            } else {
                if unit_of_work.is_detached(related) {
                    unit_of_work.attach(related)?;
                }
                unit_of_work.is_new(related)? || unit_of_work.is_dirty(related)?
            }
        };

        if needs_write {
            self.save(related, Some(owner))?;
        }
        Ok(())
    }

    fn write_kind(&self, object: &TransferRef) -> Result<WriteKind> {
        let unit_of_work = self.unit_of_work.borrow();
        Ok(if unit_of_work.is_removed(object) {
            WriteKind::Delete
        } else if unit_of_work.is_new(object)? {
            WriteKind::Create
        } else if unit_of_work.is_dirty(object)? {
            WriteKind::Update
        } else {
            WriteKind::Skip
        })
    }

    fn persist_transfer(
        &mut self,
        object: &TransferRef,
        owner: Option<&TransferRef>,
        metadata: &TransferMetadata,
    ) -> Result<()> {
        match self.write_kind(object)? {
            WriteKind::Delete => {
                let id = metadata.id_value(&object.borrow())?;
                if !id.is_empty() {
                    self.dispatch(PersistenceEvent::PreRemove, object)?;
                    debug!(transfer = %metadata.name, id = %id, "deleting transfer");
                    self.client.delete(&metadata.name, &id)?;
                    self.unit_of_work.borrow_mut().detach(object)?;
                    self.dispatch(PersistenceEvent::PostRemove, object)?;
                } else {
                    self.unit_of_work.borrow_mut().detach(object)?;
                }
            }
            WriteKind::Create => {
                self.prepare_write(object, owner)?;
                self.dispatch(PersistenceEvent::PrePersist, object)?;
                debug!(transfer = %metadata.name, "creating transfer");
                self.client.post(object)?;
                self.renew(object)?;
                self.dispatch(PersistenceEvent::PostPersist, object)?;
            }
            WriteKind::Update => {
                self.prepare_write(object, owner)?;
                let original = self.unit_of_work.borrow().original_object(object);
                self.events.dispatch(
                    &LifecycleEvent::for_object(PersistenceEvent::PreUpdate, object)
                        .with_original(original.as_ref()),
                )?;
                debug!(transfer = %metadata.name, "updating transfer");
                self.client.put(object)?;
                self.renew(object)?;
                self.dispatch(PersistenceEvent::PostUpdate, object)?;
            }
            WriteKind::Skip => {}
        }
        Ok(())
    }

    fn prepare_write(&self, object: &TransferRef, owner: Option<&TransferRef>) -> Result<()> {
        if let Some(owner) = owner {
            self.update_relationship_ids(owner)?;
        }
        self.update_relationship_ids(object)
    }

    /// Refreshes the clean snapshot after a successful write.
    fn renew(&self, object: &TransferRef) -> Result<()> {
        let mut unit_of_work = self.unit_of_work.borrow_mut();
        unit_of_work.detach(object)?;
        unit_of_work.attach(object)
    }

    fn dispatch(&self, event: PersistenceEvent, object: &TransferRef) -> Result<()> {
        self.events.dispatch(&LifecycleEvent::for_object(event, object))
    }

    fn id_value(&self, object: &TransferRef) -> Result<Value> {
        let transfer = object.borrow();
        self.metadata
            .metadata(transfer.type_name())?
            .id_value(&transfer)
    }

    /// Value stored in `field` of `holder_type` to point at the transfer
    /// with `id`: the id itself, or its IRI when the field is text.
    fn reference_for(
        &self,
        referenced: &TransferMetadata,
        id: &Value,
        holder_type: &str,
        field: &str,
    ) -> Result<Value> {
        let holder = self.metadata.metadata(holder_type)?;
        let is_text = holder
            .property(field)
            .is_some_and(|prop| prop.field_type.is_text());

        Ok(if is_text && !id.is_empty() {
            Value::Text(referenced.resource.iri(id))
        } else {
            id.clone()
        })
    }

    /// Copies related ids into the foreign fields they belong to.
    ///
    /// `BelongsTo` ids flow into the object, the object's own id flows into
    /// the back-reference of `HasOne`/`HasMany` transfers, and IRI
    /// collection fields are rebuilt from the related transfers that have
    /// an id. Empty ids are never propagated.
    pub fn update_relationship_ids(&self, object: &TransferRef) -> Result<()> {
        let metadata = self.metadata.metadata(&object.type_name())?;

        for (prop, relationship) in metadata.associations() {
            match relationship {
                Relationship::BelongsTo { target, foreign } => {
                    let Some(related) = object.borrow().related_one(&prop.name) else {
                        continue;
                    };
                    match foreign {
                        ForeignKey::Composite(fields) => sync_composite(object, &related, fields),
                        ForeignKey::Single(field) => {
                            let target_metadata = self.metadata.metadata(target)?;
                            let related_id = target_metadata.id_value(&related.borrow())?;
                            if related_id.is_empty() {
                                continue;
                            }
                            let reference =
                                self.reference_for(&target_metadata, &related_id, &metadata.name, field)?;
                            object.set(field.clone(), reference);
                        }
                    }
                }
                Relationship::HasOne { .. } | Relationship::HasMany { .. } => {
                    if let Some(foreign_field) = relationship.back_reference_field() {
                        self.set_back_references(object, &metadata, &prop.name, relationship.target(), foreign_field)?;
                    }
                    if let Some(field) = relationship.iri_collection_field() {
                        self.rebuild_iri_collection(object, &prop.name, relationship.target(), field)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn set_back_references(
        &self,
        object: &TransferRef,
        metadata: &TransferMetadata,
        property: &str,
        target: &str,
        foreign_field: &str,
    ) -> Result<()> {
        let owner_id = metadata.id_value(&object.borrow())?;
        if owner_id.is_empty() {
            return Ok(());
        }
        let reference = self.reference_for(metadata, &owner_id, target, foreign_field)?;
        let related = object.borrow().related_refs(property);
        for related in related {
            related.set(foreign_field, reference.clone());
        }
        Ok(())
    }

    fn rebuild_iri_collection(
        &self,
        object: &TransferRef,
        property: &str,
        target: &str,
        field: &str,
    ) -> Result<()> {
        // An unloaded proxy collection says nothing about the field.
        let related = match object.borrow().relation_slot(property) {
            Some(slot) if slot.state() == SlotState::Initialized => slot.value().refs(),
            _ => return Ok(()),
        };

        let target_metadata = self.metadata.metadata(target)?;
        let mut iris = Vec::with_capacity(related.len());
        for related in &related {
            let id = target_metadata.id_value(&related.borrow())?;
            if !id.is_empty() {
                iris.push(Value::Text(target_metadata.resource.iri(&id)));
            }
        }
        object.set(field, Value::List(iris));
        Ok(())
    }
}

/// Multi-field `BelongsTo` sync. A fully identified related transfer wins;
/// otherwise the owner's values fill the related transfer's empty parts.
fn sync_composite(owner: &TransferRef, related: &TransferRef, fields: &[String]) {
    let related_assigned = fields.iter().all(|field| !related.get(field).is_empty());

    if related_assigned {
        for field in fields {
            let value = related.get(field);
            owner.set(field.clone(), value);
        }
        return;
    }

    let mut copied = false;
    for field in fields {
        let value = owner.get(field);
        if !value.is_empty() && related.get(field).is_empty() {
            related.set(field.clone(), value);
            copied = true;
        }
    }
    if !copied {
        debug!(
            owner = %owner.type_name(),
            related = %related.type_name(),
            "composite relation has no id on either side"
        );
    }
}
