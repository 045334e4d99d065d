use indexmap::IndexMap;

use crate::core::Value;
use crate::transfer::Transfer;

/// Clean copy of a transfer's scalar fields, foreign keys included.
///
/// Related transfers are never copied; dirty checks compare them through
/// the foreign key values kept here.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    type_name: String,
    fields: IndexMap<String, Value>,
}

impl Snapshot {
    pub fn capture(transfer: &Transfer) -> Self {
        Self {
            type_name: transfer.type_name().to_string(),
            fields: transfer
                .fields()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(Value::null_ref())
    }

    /// Materializes the snapshot as a detached transfer without relations.
    pub fn to_transfer(&self) -> Transfer {
        self.fields
            .iter()
            .fold(Transfer::new(self.type_name.clone()), |transfer, (name, value)| {
                transfer.with(name.clone(), value.clone())
            })
    }
}
