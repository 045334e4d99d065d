use indexmap::IndexMap;
use std::sync::Arc;

use crate::core::{MapperError, Result, Value};
use crate::metadata::MetadataProvider;
use crate::transfer::TransferRef;

/// Tracked transfers keyed by type name, then by id value.
///
/// Composite ids are keyed by their `name=value;name=value` form. Insertion
/// order is kept so iteration follows the order objects were attached.
pub struct ObjectStorage {
    metadata: Arc<dyn MetadataProvider>,
    storage: IndexMap<String, IndexMap<String, TransferRef>>,
}

impl ObjectStorage {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self {
            metadata,
            storage: IndexMap::new(),
        }
    }

    fn key_of(&self, object: &TransferRef) -> Result<(String, Option<String>)> {
        let transfer = object.borrow();
        let metadata = self.metadata.metadata(transfer.type_name())?;
        let key = metadata.id().key(&transfer)?;
        Ok((transfer.type_name().to_string(), key))
    }

    /// True when an instance with the same type and id is stored.
    pub fn contains(&self, object: &TransferRef) -> Result<bool> {
        let (type_name, key) = self.key_of(object)?;
        Ok(key.is_some_and(|key| {
            self.storage
                .get(&type_name)
                .is_some_and(|items| items.contains_key(&key))
        }))
    }

    /// True when this very instance is stored, whatever its current id.
    pub fn contains_instance(&self, object: &TransferRef) -> bool {
        self.iter().any(|stored| stored.ptr_eq(object))
    }

    pub fn attach(&mut self, object: &TransferRef) -> Result<()> {
        let (type_name, key) = self.key_of(object)?;
        let key = key.ok_or_else(|| MapperError::MissingIdValue(type_name.clone()))?;

        self.storage
            .entry(type_name)
            .or_default()
            .insert(key, object.clone());
        Ok(())
    }

    /// Removes the instance. Looks it up by its current id first and falls
    /// back to an identity scan when the id changed since it was attached.
    pub fn detach(&mut self, object: &TransferRef) -> Result<()> {
        let (type_name, key) = self.key_of(object)?;

        if let Some(items) = self.storage.get_mut(&type_name) {
            let by_key = key
                .as_ref()
                .is_some_and(|key| items.get(key).is_some_and(|stored| stored.ptr_eq(object)));

            if by_key {
                if let Some(key) = key {
                    items.shift_remove(&key);
                }
            } else {
                items.retain(|_, stored| !stored.ptr_eq(object));
            }
        }
        Ok(())
    }

    pub fn fetch_by_params(&self, type_name: &str, id: &Value) -> Option<TransferRef> {
        if id.is_empty() {
            return None;
        }
        self.storage
            .get(type_name)
            .and_then(|items| items.get(&id.to_string()))
            .cloned()
    }

    /// All stored instances, flattened across types.
    pub fn iter(&self) -> impl Iterator<Item = &TransferRef> {
        self.storage.values().flat_map(|items| items.values())
    }

    pub fn len(&self) -> usize {
        self.storage.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Compares the object with the instance stored under its key, field by
    /// field. Related transfers are compared by identity.
    pub fn is_equals(&self, object: &TransferRef) -> Result<bool> {
        let (type_name, key) = self.key_of(object)?;
        let stored = key.and_then(|key| {
            self.storage
                .get(&type_name)
                .and_then(|items| items.get(&key))
                .cloned()
        });

        let Some(stored) = stored else {
            return Ok(false);
        };
        if stored.ptr_eq(object) {
            return Ok(true);
        }

        let metadata = self.metadata.metadata(&type_name)?;
        let current = object.borrow();
        let stored = stored.borrow();

        for prop in &metadata.properties {
            let equal = if prop.is_relationship() {
                let left = current.related_refs(&prop.name);
                let right = stored.related_refs(&prop.name);
                left.len() == right.len() && left.iter().zip(&right).all(|(a, b)| a.ptr_eq(b))
            } else {
                current.get(&prop.name).loose_eq(stored.get(&prop.name))
            };

            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blog_metadata;
    use crate::transfer::Transfer;

    fn post(id: i64) -> TransferRef {
        TransferRef::new(Transfer::new("Post").with("id", id).with("title", "t"))
    }

    #[test]
    fn test_attach_and_fetch() {
        let mut storage = ObjectStorage::new(blog_metadata());
        let first = post(1);
        storage.attach(&first).unwrap();
        storage.attach(&post(2)).unwrap();

        assert_eq!(storage.len(), 2);
        assert!(storage.contains(&first).unwrap());
        assert!(
            storage
                .fetch_by_params("Post", &Value::Integer(1))
                .unwrap()
                .ptr_eq(&first)
        );
        assert!(storage.fetch_by_params("Post", &Value::Integer(9)).is_none());
    }

    #[test]
    fn test_attach_requires_id() {
        let mut storage = ObjectStorage::new(blog_metadata());
        let err = storage
            .attach(&TransferRef::new(Transfer::new("Post")))
            .unwrap_err();
        assert!(matches!(err, MapperError::MissingIdValue(name) if name == "Post"));
    }

    #[test]
    fn test_composite_keys() {
        let mut storage = ObjectStorage::new(blog_metadata());
        let cell = TransferRef::new(Transfer::new("Cell").with("x", 1).with("y", 2));
        storage.attach(&cell).unwrap();

        let found = storage
            .fetch_by_params("Cell", &Value::Text("x=1;y=2".into()))
            .unwrap();
        assert!(found.ptr_eq(&cell));
    }

    #[test]
    fn test_detach_after_id_change() {
        let mut storage = ObjectStorage::new(blog_metadata());
        let first = post(1);
        storage.attach(&first).unwrap();

        first.set("id", 100);
        assert!(!storage.contains(&first).unwrap());
        assert!(storage.contains_instance(&first));

        storage.detach(&first).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_iteration_keeps_attach_order() {
        let mut storage = ObjectStorage::new(blog_metadata());
        let user = TransferRef::new(Transfer::new("User").with("id", 7));
        let p1 = post(1);
        let p2 = post(2);
        storage.attach(&p1).unwrap();
        storage.attach(&user).unwrap();
        storage.attach(&p2).unwrap();

        let order: Vec<String> = storage
            .iter()
            .map(|t| format!("{}#{}", t.type_name(), t.get("id")))
            .collect();
        assert_eq!(order, vec!["Post#1", "Post#2", "User#7"]);
    }

    #[test]
    fn test_is_equals_compares_fields() {
        let mut storage = ObjectStorage::new(blog_metadata());
        storage.attach(&post(1)).unwrap();

        assert!(storage.is_equals(&post(1)).unwrap());

        let changed = post(1);
        changed.set("title", "other");
        assert!(!storage.is_equals(&changed).unwrap());
        assert!(!storage.is_equals(&post(5)).unwrap());
    }
}
