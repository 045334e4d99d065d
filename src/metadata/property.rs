use serde::{Deserialize, Serialize};

use crate::core::FieldType;

/// Where the foreign id of a `BelongsTo` relation lives on the owning side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignKey {
    Single(String),
    /// Same-named fields on the owner and on the related transfer.
    Composite(Vec<String>),
}

impl ForeignKey {
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Single(field) => vec![field.as_str()],
            Self::Composite(fields) => fields.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }
}

/// Declared link between two transfer types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relationship {
    /// The owner stores the related id in its own foreign field(s).
    BelongsTo { target: String, foreign: ForeignKey },
    /// The related transfer stores the owner's id in `foreign_field`.
    HasOne { target: String, foreign_field: String },
    /// Either the related transfers store a back-reference in
    /// `foreign_field`, or the owner lists them as IRIs in
    /// `iri_collection_field`.
    HasMany {
        target: String,
        #[serde(default)]
        foreign_field: Option<String>,
        #[serde(default)]
        iri_collection_field: Option<String>,
    },
}

impl Relationship {
    pub fn target(&self) -> &str {
        match self {
            Self::BelongsTo { target, .. }
            | Self::HasOne { target, .. }
            | Self::HasMany { target, .. } => target,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::HasMany { .. })
    }

    /// Related transfers the owner's own payload depends on, so they must be
    /// written before the owner.
    pub fn is_prerequisite(&self) -> bool {
        match self {
            Self::BelongsTo { .. } => true,
            Self::HasMany {
                iri_collection_field,
                ..
            } => iri_collection_field.is_some(),
            Self::HasOne { .. } => false,
        }
    }

    /// Field on the related side holding the owner's id.
    pub fn back_reference_field(&self) -> Option<&str> {
        match self {
            Self::HasOne { foreign_field, .. } => Some(foreign_field),
            Self::HasMany { foreign_field, .. } => foreign_field.as_deref(),
            Self::BelongsTo { .. } => None,
        }
    }

    pub fn iri_collection_field(&self) -> Option<&str> {
        match self {
            Self::HasMany {
                iri_collection_field,
                ..
            } => iri_collection_field.as_deref(),
            _ => None,
        }
    }
}

/// One declared field of a transfer, scalar or relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub id: bool,
    /// JSON key used on the wire when it differs from `name`.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub relationship: Option<Relationship>,
    #[serde(default)]
    pub exclude_input: bool,
    #[serde(default)]
    pub exclude_output: bool,
    /// Relationship properties are left out of payloads unless embedded.
    #[serde(default)]
    pub embed: bool,
}

impl PropertyMetadata {
    pub fn scalar(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            id: false,
            source: None,
            relationship: None,
            exclude_input: false,
            exclude_output: false,
            embed: false,
        }
    }

    pub fn relation(name: impl Into<String>, relationship: Relationship) -> Self {
        let exclude_output = matches!(relationship, Relationship::BelongsTo { .. });
        Self {
            relationship: Some(relationship),
            exclude_output,
            ..Self::scalar(name, FieldType::Any)
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn exclude_input(mut self) -> Self {
        self.exclude_input = true;
        self
    }

    pub fn exclude_output(mut self) -> Self {
        self.exclude_output = true;
        self
    }

    pub fn embed(mut self) -> Self {
        self.embed = true;
        self.exclude_output = false;
        self
    }

    pub fn as_id(mut self) -> Self {
        self.id = true;
        self
    }

    /// JSON key for this property.
    pub fn wire_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    pub fn is_relationship(&self) -> bool {
        self.relationship.is_some()
    }

    pub fn writes_output(&self) -> bool {
        if self.is_relationship() {
            self.embed && !self.exclude_output
        } else {
            !self.exclude_output
        }
    }
}
