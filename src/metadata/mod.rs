// ============================================================================
// Transfer Metadata
// ============================================================================
//
// Statically declared description of every transfer type: its fields, id
// fields, relationships, remote resource and polymorphic discriminator.
// Declared with builder calls or loaded from a JSON document.
//
// ============================================================================

pub mod id;
pub mod property;
pub mod registry;

pub use id::{IdMetadata, parse_composite_id};
pub use property::{ForeignKey, PropertyMetadata, Relationship};
pub use registry::{MetadataProvider, MetadataRegistry};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{FieldType, MapperError, Result, Value};

/// Remote resource a transfer type maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Name of the HTTP client in the client registry.
    pub client: String,
    #[serde(default = "default_route")]
    pub route: String,
}

fn default_route() -> String {
    "/".to_string()
}

impl Resource {
    pub fn new(client: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            route: route.into(),
        }
    }

    /// Path of a single item of this resource.
    pub fn item_path(&self, id: &Value) -> String {
        format!("{}/{}", self.route.trim_end_matches('/'), id)
    }

    /// IRI-style reference to an item, as stored in string foreign fields.
    pub fn iri(&self, id: &Value) -> String {
        self.item_path(id)
    }

    /// Extracts the id from an IRI pointing at this resource. Values that do
    /// not carry the route prefix are taken as bare ids.
    pub fn id_from_iri(&self, iri: &str) -> Value {
        let prefix = format!("{}/", self.route.trim_end_matches('/'));
        let raw = iri.strip_prefix(&prefix).unwrap_or(iri);

        match raw.parse::<i64>() {
            Ok(id) => Value::Integer(id),
            Err(_) => Value::Text(raw.to_string()),
        }
    }
}

/// Maps a discriminator field value to a concrete transfer type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(default = "default_discriminator_field")]
    pub field: String,
    pub map: BTreeMap<String, String>,
}

fn default_discriminator_field() -> String {
    "type".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub name: String,
    pub resource: Resource,
    #[serde(default)]
    pub properties: Vec<PropertyMetadata>,
    #[serde(default)]
    pub discriminator: Option<Discriminator>,
}

impl TransferMetadata {
    pub fn builder(name: impl Into<String>, resource: Resource) -> TransferMetadataBuilder {
        TransferMetadataBuilder::new(name, resource)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|prop| prop.name == name)
    }

    pub fn id(&self) -> IdMetadata<'_> {
        IdMetadata::new(
            &self.name,
            self.properties
                .iter()
                .filter(|prop| prop.id)
                .map(|prop| prop.name.as_str())
                .collect(),
        )
    }

    pub fn id_value(&self, transfer: &crate::transfer::Transfer) -> Result<Value> {
        self.id().value(transfer)
    }

    pub fn scalar_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|prop| !prop.is_relationship())
    }

    /// Relationship properties paired with their declarations.
    pub fn associations(&self) -> impl Iterator<Item = (&PropertyMetadata, &Relationship)> {
        self.properties
            .iter()
            .filter_map(|prop| prop.relationship.as_ref().map(|rel| (prop, rel)))
    }

    pub fn association(&self, name: &str) -> Option<&Relationship> {
        self.property(name).and_then(|prop| prop.relationship.as_ref())
    }

    /// Checks that every field a relationship refers to on this side exists
    /// as a scalar property.
    pub fn validate(&self) -> Result<()> {
        for (prop, relationship) in self.associations() {
            let local_fields: Vec<&str> = match relationship {
                Relationship::BelongsTo { foreign, .. } => foreign.fields(),
                Relationship::HasMany {
                    iri_collection_field: Some(field),
                    ..
                } => vec![field.as_str()],
                _ => Vec::new(),
            };

            for field in local_fields {
                match self.property(field) {
                    Some(found) if !found.is_relationship() => {}
                    _ => {
                        return Err(MapperError::Metadata(format!(
                            "'{}.{}' refers to unknown field '{}'",
                            self.name, prop.name, field
                        )));
                    }
                }
            }

            if let Relationship::HasMany {
                foreign_field: None,
                iri_collection_field: None,
                ..
            } = relationship
            {
                return Err(MapperError::Metadata(format!(
                    "'{}.{}' needs a foreign field or an IRI collection field",
                    self.name, prop.name
                )));
            }
        }
        Ok(())
    }
}

/// Builder-call declaration of a transfer type.
///
/// ```
/// use webmapper::core::FieldType;
/// use webmapper::metadata::{Resource, TransferMetadata};
///
/// let post = TransferMetadata::builder("Post", Resource::new("blog", "/posts"))
///     .id("id", FieldType::Integer)
///     .field("title", FieldType::Text)
///     .field("author_id", FieldType::Integer)
///     .belongs_to("author", "User", "author_id")
///     .has_many("comments", "Comment", "post_id")
///     .build()
///     .unwrap();
///
/// assert_eq!(post.associations().count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct TransferMetadataBuilder {
    metadata: TransferMetadata,
}

impl TransferMetadataBuilder {
    pub fn new(name: impl Into<String>, resource: Resource) -> Self {
        Self {
            metadata: TransferMetadata {
                name: name.into(),
                resource,
                properties: Vec::new(),
                discriminator: None,
            },
        }
    }

    pub fn id(self, name: &str, field_type: FieldType) -> Self {
        self.property(PropertyMetadata::scalar(name, field_type).as_id())
    }

    pub fn field(self, name: &str, field_type: FieldType) -> Self {
        self.property(PropertyMetadata::scalar(name, field_type))
    }

    pub fn property(mut self, property: PropertyMetadata) -> Self {
        self.metadata.properties.push(property);
        self
    }

    pub fn belongs_to(self, name: &str, target: &str, foreign_field: &str) -> Self {
        self.property(PropertyMetadata::relation(
            name,
            Relationship::BelongsTo {
                target: target.to_string(),
                foreign: ForeignKey::Single(foreign_field.to_string()),
            },
        ))
    }

    pub fn belongs_to_composite(self, name: &str, target: &str, foreign_fields: &[&str]) -> Self {
        self.property(PropertyMetadata::relation(
            name,
            Relationship::BelongsTo {
                target: target.to_string(),
                foreign: ForeignKey::Composite(
                    foreign_fields.iter().map(|f| f.to_string()).collect(),
                ),
            },
        ))
    }

    pub fn has_one(self, name: &str, target: &str, foreign_field: &str) -> Self {
        self.property(PropertyMetadata::relation(
            name,
            Relationship::HasOne {
                target: target.to_string(),
                foreign_field: foreign_field.to_string(),
            },
        ))
    }

    pub fn has_many(self, name: &str, target: &str, foreign_field: &str) -> Self {
        self.property(PropertyMetadata::relation(
            name,
            Relationship::HasMany {
                target: target.to_string(),
                foreign_field: Some(foreign_field.to_string()),
                iri_collection_field: None,
            },
        ))
    }

    pub fn has_many_iri(self, name: &str, target: &str, iri_collection_field: &str) -> Self {
        self.property(PropertyMetadata::relation(
            name,
            Relationship::HasMany {
                target: target.to_string(),
                foreign_field: None,
                iri_collection_field: Some(iri_collection_field.to_string()),
            },
        ))
    }

    pub fn discriminator<I, K, V>(mut self, field: &str, map: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata.discriminator = Some(Discriminator {
            field: field.to_string(),
            map: map
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }

    pub fn build(self) -> Result<TransferMetadata> {
        self.metadata.validate()?;
        Ok(self.metadata)
    }
}
