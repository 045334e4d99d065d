use crate::core::{MapperError, Result, Value};
use crate::transfer::Transfer;

/// Ordered id fields of a transfer type.
#[derive(Debug, Clone)]
pub struct IdMetadata<'a> {
    type_name: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> IdMetadata<'a> {
    pub(crate) fn new(type_name: &'a str, fields: Vec<&'a str>) -> Self {
        Self { type_name, fields }
    }

    pub fn has_ids(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn is_composite(&self) -> bool {
        self.fields.len() > 1
    }

    pub fn fields(&self) -> &[&'a str] {
        &self.fields
    }

    /// The scalar id, or `name=value;name=value` for composite ids with
    /// empty parts skipped. `Null` when nothing is assigned.
    pub fn value(&self, transfer: &Transfer) -> Result<Value> {
        match self.fields.as_slice() {
            [] => Err(MapperError::MissingIdMapping(self.type_name.to_string())),
            [single] => Ok(transfer.get(single).clone()),
            fields => {
                let parts: Vec<String> = fields
                    .iter()
                    .filter_map(|field| {
                        let value = transfer.get(field);
                        (!value.is_empty()).then(|| format!("{}={}", field, value))
                    })
                    .collect();

                if parts.is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Text(parts.join(";")))
                }
            }
        }
    }

    /// Storage key for the transfer, `None` while the id is empty.
    pub fn key(&self, transfer: &Transfer) -> Result<Option<String>> {
        let value = self.value(transfer)?;
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    /// Every id part holds a value.
    pub fn is_assigned(&self, transfer: &Transfer) -> Result<bool> {
        if !self.has_ids() {
            return Err(MapperError::MissingIdMapping(self.type_name.to_string()));
        }
        Ok(self
            .fields
            .iter()
            .all(|field| !transfer.get(field).is_empty()))
    }
}

/// Splits a `name=value;name=value` composite id into its pairs.
pub fn parse_composite_id(raw: &str) -> Option<Vec<(String, String)>> {
    if !raw.contains('=') {
        return None;
    }

    raw.split(';')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
        })
        .collect()
}
