// ============================================================================
// Proxy Factory
// ============================================================================
//
// Turns transfers into lazy proxies. A proxy carries one uninitialized slot
// per declared relation plus a loader bound to its transfer manager; the
// first read of a slot fetches it and later reads hit the cached value.
// Creating a proxy never talks to the webservice.
//
// ============================================================================

use std::rc::{Rc, Weak};
use tracing::debug;

use crate::core::{MapperError, Result, Value};
use crate::manager::{ManagerInner, TransferManager};
use crate::metadata::{ForeignKey, Relationship};
use crate::transfer::{RelationLoader, RelationValue, Transfer, TransferRef};

pub struct ProxyFactory;

impl ProxyFactory {
    /// Makes `object` a proxy in place and returns it. Relations already
    /// holding values stay as they are.
    pub fn create_proxy(object: TransferRef, manager: &TransferManager) -> Result<TransferRef> {
        let metadata = manager.metadata(&object.type_name())?;

        {
            let mut transfer = object.borrow_mut();
            for (prop, relationship) in metadata.associations() {
                if transfer.relation(&prop.name).is_some_and(|value| !value.is_empty()) {
                    continue;
                }
                let empty = if relationship.is_collection() {
                    RelationValue::Many(Vec::new())
                } else {
                    RelationValue::One(None)
                };
                transfer.reset_slot(&prop.name, empty);
            }
            transfer.install_loader(Rc::new(ManagerLoader {
                manager: manager.downgrade(),
            }));
        }
        Ok(object)
    }

    /// Empty proxy of the given type.
    pub fn create_proxy_for_type(type_name: &str, manager: &TransferManager) -> Result<TransferRef> {
        Self::create_proxy(TransferRef::new(Transfer::new(type_name)), manager)
    }
}

/// Resolves relations through the manager that created the proxy.
struct ManagerLoader {
    manager: Weak<ManagerInner>,
}

impl ManagerLoader {
    fn manager(&self) -> Result<TransferManager> {
        TransferManager::upgrade(&self.manager).ok_or(MapperError::ManagerUnavailable)
    }
}

impl RelationLoader for ManagerLoader {
    fn load(&self, owner: &TransferRef, relation: &str) -> Result<Option<RelationValue>> {
        let manager = self.manager()?;
        let metadata = manager.metadata(&owner.type_name())?;
        let Some(relationship) = metadata.association(relation) else {
            return Ok(None);
        };
        let target = manager.metadata(relationship.target())?;

        debug!(transfer = %metadata.name, relation, "loading relation");

        match relationship {
            Relationship::BelongsTo {
                foreign: ForeignKey::Single(field),
                ..
            } => {
                let value = owner.get(field);
                if value.is_empty() {
                    return Ok(None);
                }
                let is_text = metadata
                    .property(field)
                    .is_some_and(|prop| prop.field_type.is_text());
                let id = match &value {
                    Value::Text(iri) if is_text => target.resource.id_from_iri(iri),
                    _ => value.clone(),
                };
                Ok(Some(RelationValue::One(manager.find(&target.name, id)?)))
            }
            Relationship::BelongsTo {
                foreign: ForeignKey::Composite(fields),
                ..
            } => {
                let mut parts = Vec::with_capacity(fields.len());
                for field in fields {
                    let value = owner.get(field);
                    if value.is_empty() {
                        return Ok(None);
                    }
                    parts.push(format!("{}={}", field, value));
                }
                let id = Value::Text(parts.join(";"));
                Ok(Some(RelationValue::One(manager.repository(&target.name)?.find(id)?)))
            }
            // With both a back-reference and an IRI list declared, the
            // server-side filter on the back-reference is authoritative.
            Relationship::HasOne { foreign_field, .. }
            | Relationship::HasMany {
                foreign_field: Some(foreign_field),
                ..
            } => {
                let own_id = metadata.id_value(&owner.borrow())?;
                if own_id.is_empty() {
                    return Ok(None);
                }
                let is_text = target
                    .property(foreign_field)
                    .is_some_and(|prop| prop.field_type.is_text());
                let reference = if is_text {
                    Value::Text(metadata.resource.iri(&own_id))
                } else {
                    own_id
                };

                let repository = manager.repository(&target.name)?;
                let filters = [(foreign_field.as_str(), reference)];
                Ok(Some(if relationship.is_collection() {
                    RelationValue::Many(repository.find_by(&filters)?.into_vec())
                } else {
                    RelationValue::One(repository.find_one_by(&filters)?)
                }))
            }
            Relationship::HasMany {
                iri_collection_field: Some(field),
                ..
            } => {
                let Some(iris) = owner.get(field).as_list().map(<[Value]>::to_vec) else {
                    return Ok(None);
                };

                let mut related = Vec::with_capacity(iris.len());
                for iri in &iris {
                    let id = match iri.as_str() {
                        Some(iri) => target.resource.id_from_iri(iri),
                        None => iri.clone(),
                    };
                    if let Some(found) = manager.find(&target.name, id)? {
                        related.push(found);
                    }
                }
                Ok(Some(RelationValue::Many(related)))
            }
            Relationship::HasMany { .. } => Ok(None),
        }
    }
}
