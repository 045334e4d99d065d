use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use super::{Relationship, TransferMetadata};
use crate::core::{MapperError, Result};

/// Source of transfer metadata consumed by the mapper core.
pub trait MetadataProvider {
    fn metadata(&self, type_name: &str) -> Result<Arc<TransferMetadata>>;
}

/// In-memory metadata provider filled by explicit registration.
#[derive(Debug, Default, Clone)]
pub struct MetadataRegistry {
    types: HashMap<String, Arc<TransferMetadata>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MetadataDocument {
    List(Vec<TransferMetadata>),
    Wrapped { transfers: Vec<TransferMetadata> },
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: TransferMetadata) -> Result<&mut Self> {
        metadata.validate()?;
        self.types
            .insert(metadata.name.clone(), Arc::new(metadata));
        Ok(self)
    }

    pub fn with(mut self, metadata: TransferMetadata) -> Result<Self> {
        self.register(metadata)?;
        Ok(self)
    }

    /// Loads declarations from a JSON document: either an array of transfer
    /// declarations or an object with a `transfers` array.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let document: MetadataDocument = serde_json::from_str(raw)?;
        let transfers = match document {
            MetadataDocument::List(transfers) | MetadataDocument::Wrapped { transfers } => transfers,
        };

        let mut registry = Self::new();
        for metadata in transfers {
            registry.register(metadata)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Cross-type checks: every relationship target is registered and
    /// back-reference fields exist on the target.
    pub fn validate(&self) -> Result<()> {
        for metadata in self.types.values() {
            for (prop, relationship) in metadata.associations() {
                let target = self.types.get(relationship.target()).ok_or_else(|| {
                    MapperError::Metadata(format!(
                        "'{}.{}' targets unregistered transfer '{}'",
                        metadata.name,
                        prop.name,
                        relationship.target()
                    ))
                })?;

                if let Some(field) = relationship.back_reference_field() {
                    if target.property(field).is_none() {
                        return Err(MapperError::Metadata(format!(
                            "'{}.{}' expects field '{}' on '{}'",
                            metadata.name, prop.name, field, target.name
                        )));
                    }
                }

                if let Relationship::BelongsTo { foreign, .. } = relationship {
                    if foreign.is_composite() {
                        for field in foreign.fields() {
                            if target.property(field).is_none() {
                                return Err(MapperError::Metadata(format!(
                                    "'{}.{}' expects field '{}' on '{}'",
                                    metadata.name, prop.name, field, target.name
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl MetadataProvider for MetadataRegistry {
    fn metadata(&self, type_name: &str) -> Result<Arc<TransferMetadata>> {
        self.types
            .get(type_name)
            .cloned()
            .ok_or_else(|| MapperError::UnknownTransfer(type_name.to_string()))
    }
}
