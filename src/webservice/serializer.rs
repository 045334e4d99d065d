use serde_json::{Map, Value as Json};
use std::sync::Arc;

use crate::core::{MapperError, Result};
use crate::metadata::{MetadataProvider, Relationship, TransferMetadata};
use crate::transfer::{Transfer, TransferRef};

/// Converts transfers to and from JSON payloads according to their metadata.
#[derive(Clone)]
pub struct Serializer {
    metadata: Arc<dyn MetadataProvider>,
}

impl Serializer {
    pub fn new(metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { metadata }
    }

    /// Outbound payload. Every declared scalar is written, nulls included,
    /// under its wire name. Relations are written only when embedded, as
    /// nested objects of their scalars.
    pub fn normalize(&self, transfer: &Transfer) -> Result<Json> {
        let metadata = self.metadata.metadata(transfer.type_name())?;
        let mut payload = Map::new();

        for prop in metadata.properties.iter().filter(|prop| prop.writes_output()) {
            let value = match &prop.relationship {
                None => transfer.get(&prop.name).to_json(),
                Some(relationship) if relationship.is_collection() => Json::Array(
                    transfer
                        .related_refs(&prop.name)
                        .iter()
                        .map(|related| self.normalize_scalars(&related.borrow()))
                        .collect::<Result<Vec<_>>>()?,
                ),
                Some(_) => match transfer.related_one(&prop.name) {
                    Some(related) => self.normalize_scalars(&related.borrow())?,
                    None => Json::Null,
                },
            };
            payload.insert(prop.wire_name().to_string(), value);
        }

        Ok(Json::Object(payload))
    }

    fn normalize_scalars(&self, transfer: &Transfer) -> Result<Json> {
        let metadata = self.metadata.metadata(transfer.type_name())?;
        let payload = metadata
            .scalar_properties()
            .filter(|prop| !prop.exclude_output)
            .map(|prop| (prop.wire_name().to_string(), transfer.get(&prop.name).to_json()))
            .collect();
        Ok(Json::Object(payload))
    }

    /// Builds a transfer of `type_name`, or of the concrete type its
    /// discriminator selects, from a decoded response.
    pub fn denormalize(&self, json: &Json, type_name: &str) -> Result<Transfer> {
        let metadata = self.metadata.metadata(type_name)?;
        let concrete = self.resolve_type(json, &metadata)?;

        let mut transfer = Transfer::new(concrete);
        self.hydrate(&mut transfer, json)?;
        Ok(transfer)
    }

    fn resolve_type(&self, json: &Json, metadata: &TransferMetadata) -> Result<String> {
        let Some(discriminator) = &metadata.discriminator else {
            return Ok(metadata.name.clone());
        };

        let key = match json.get(&discriminator.field) {
            None | Some(Json::Null) => return Ok(metadata.name.clone()),
            Some(Json::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        discriminator.map.get(&key).cloned().ok_or_else(|| {
            MapperError::Serialization(format!(
                "discriminator value '{}' of '{}' maps to no transfer",
                key, metadata.name
            ))
        })
    }

    /// Merges a response into an existing transfer. Only keys present in
    /// the response are applied.
    pub fn hydrate(&self, transfer: &mut Transfer, json: &Json) -> Result<()> {
        let object = match json {
            Json::Object(object) => object,
            Json::Null => return Ok(()),
            other => {
                return Err(MapperError::Serialization(format!(
                    "expected an object for '{}', got {}",
                    transfer.type_name(),
                    other
                )));
            }
        };

        let metadata = self.metadata.metadata(transfer.type_name())?;
        for prop in metadata.properties.iter().filter(|prop| !prop.exclude_input) {
            let Some(raw) = object.get(prop.wire_name()) else {
                continue;
            };

            match &prop.relationship {
                None => {
                    let value = prop.field_type.coerce(raw).map_err(|err| {
                        MapperError::Serialization(format!(
                            "{}.{}: {}",
                            transfer.type_name(),
                            prop.name,
                            err
                        ))
                    })?;
                    transfer.set(prop.name.clone(), value);
                }
                Some(relationship) => self.hydrate_relation(transfer, &prop.name, relationship, raw)?,
            }
        }
        Ok(())
    }

    /// Nested objects become related transfers. Anything else under a
    /// relation key (ids, IRIs) is left to the foreign fields. A relation
    /// that already holds transfers keeps them, so a write response never
    /// swaps out instances the unit of work tracks.
    fn hydrate_relation(
        &self,
        transfer: &mut Transfer,
        name: &str,
        relationship: &Relationship,
        raw: &Json,
    ) -> Result<()> {
        if transfer.relation(name).is_some_and(|current| !current.is_empty()) {
            return Ok(());
        }

        match raw {
            Json::Object(_) if !relationship.is_collection() => {
                let related = self.denormalize(raw, relationship.target())?;
                transfer.set_one(name, Some(TransferRef::new(related)));
            }
            Json::Array(items) if items.iter().all(Json::is_object) => {
                let related = items
                    .iter()
                    .map(|item| self.denormalize(item, relationship.target()).map(TransferRef::new))
                    .collect::<Result<Vec<_>>>()?;
                transfer.set_many(name, related);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldType, Value};
    use crate::metadata::{MetadataRegistry, PropertyMetadata, Resource};
    use crate::testing::blog_metadata;
    use serde_json::json;

    #[test]
    fn test_normalize_writes_every_scalar() {
        let serializer = Serializer::new(blog_metadata());
        let author = TransferRef::new(Transfer::new("User").with("id", 3));
        let post = Transfer::new("Post").with("title", "hi").with_one("author", &author);

        let payload = serializer.normalize(&post).unwrap();
        assert_eq!(
            payload,
            json!({"id": null, "title": "hi", "author_id": null})
        );
    }

    #[test]
    fn test_denormalize_coerces_and_nests() {
        let serializer = Serializer::new(blog_metadata());
        let post = serializer
            .denormalize(
                &json!({
                    "id": "5",
                    "title": "hello",
                    "author": {"id": 2, "name": "ann"},
                    "comments": [{"id": 1, "body": "x", "post_id": 5}],
                    "unknown": true
                }),
                "Post",
            )
            .unwrap();

        assert_eq!(post.get("id"), &Value::Integer(5));
        assert!(!post.has_field("unknown"));
        assert_eq!(
            post.related_one("author").unwrap().get("name"),
            Value::Text("ann".into())
        );
        assert_eq!(post.related_refs("comments").len(), 1);
    }

    #[test]
    fn test_hydrate_merges_present_keys_only() {
        let serializer = Serializer::new(blog_metadata());
        let mut post = Transfer::new("Post").with("title", "kept").with("author_id", 3);
        serializer.hydrate(&mut post, &json!({"id": 9})).unwrap();

        assert_eq!(post.get("id"), &Value::Integer(9));
        assert_eq!(post.get("title"), &Value::Text("kept".into()));
        assert_eq!(post.get("author_id"), &Value::Integer(3));
    }

    #[test]
    fn test_hydrate_keeps_held_relations() {
        let serializer = Serializer::new(blog_metadata());
        let author = TransferRef::new(Transfer::new("User").with("id", 3).with("name", "ann"));
        let mut post = Transfer::new("Post").with("title", "t").with_one("author", &author);

        serializer
            .hydrate(
                &mut post,
                &json!({"id": 9, "author": {"id": 3, "name": "echoed"}, "comments": [{"id": 1}]}),
            )
            .unwrap();

        assert!(post.related_one("author").unwrap().ptr_eq(&author));
        assert_eq!(author.get("name"), Value::Text("ann".into()));
        assert_eq!(post.related_refs("comments").len(), 1);
    }

    #[test]
    fn test_list_field_rejects_scalar() {
        let serializer = Serializer::new(blog_metadata());
        let err = serializer
            .denormalize(&json!({"id": 1, "tags": "oops"}), "Article")
            .unwrap_err();
        assert!(matches!(err, MapperError::Serialization(_)));
    }

    fn bindings_registry() -> Arc<dyn MetadataProvider> {
        let mut registry = MetadataRegistry::new();
        registry
            .register(
                TransferMetadata::builder("Vehicle", Resource::new("garage", "/vehicles"))
                    .id("id", FieldType::Integer)
                    .field("type", FieldType::Text)
                    .property(PropertyMetadata::scalar("multiOne", FieldType::Integer).source("multi_one"))
                    .property(PropertyMetadata::scalar("secret", FieldType::Text).exclude_output())
                    .property(PropertyMetadata::scalar("computed", FieldType::Text).exclude_input())
                    .discriminator("type", [("car", "Car")])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                TransferMetadata::builder("Car", Resource::new("garage", "/vehicles"))
                    .id("id", FieldType::Integer)
                    .field("type", FieldType::Text)
                    .field("doors", FieldType::Integer)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn test_bindings_and_exclusions() {
        let serializer = Serializer::new(bindings_registry());
        let vehicle = serializer
            .denormalize(
                &json!({"id": 1, "multi_one": 4, "secret": "s", "computed": "c"}),
                "Vehicle",
            )
            .unwrap();

        assert_eq!(vehicle.get("multiOne"), &Value::Integer(4));
        assert!(vehicle.get("computed").is_null());

        let payload = serializer.normalize(&vehicle).unwrap();
        assert_eq!(payload["multi_one"], json!(4));
        assert!(payload.get("secret").is_none());
    }

    #[test]
    fn test_discriminator_selects_concrete_type() {
        let serializer = Serializer::new(bindings_registry());

        let car = serializer
            .denormalize(&json!({"id": 1, "type": "car", "doors": 4}), "Vehicle")
            .unwrap();
        assert_eq!(car.type_name(), "Car");
        assert_eq!(car.get("doors"), &Value::Integer(4));

        let plain = serializer.denormalize(&json!({"id": 2}), "Vehicle").unwrap();
        assert_eq!(plain.type_name(), "Vehicle");

        assert!(serializer
            .denormalize(&json!({"id": 3, "type": "boat"}), "Vehicle")
            .is_err());
    }
}
