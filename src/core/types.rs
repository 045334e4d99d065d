use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MapperError, Result, Value};

/// Declared type of a scalar transfer field, used to coerce inbound JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    Text,
    Boolean,
    List,
    Timestamp,
    #[default]
    Any,
}

impl FieldType {
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Converts a decoded JSON value into this type. Null always passes through.
    pub fn coerce(&self, json: &serde_json::Value) -> Result<Value> {
        if json.is_null() {
            return Ok(Value::Null);
        }

        let value = Value::from_json(json)?;
        match self {
            Self::Any => Ok(value),
            Self::Integer => value.as_i64().map(Value::Integer).ok_or_else(|| {
                MapperError::Serialization(format!("value {} is not an integer", json))
            }),
            Self::Float => value.as_f64().map(Value::Float).ok_or_else(|| {
                MapperError::Serialization(format!("value {} is not a number", json))
            }),
            Self::Text => match value {
                Value::List(_) => Err(MapperError::Serialization(format!(
                    "value {} mapped as text is a list",
                    json
                ))),
                other => Ok(Value::Text(other.to_string())),
            },
            Self::Boolean => match value {
                Value::Boolean(b) => Ok(Value::Boolean(b)),
                Value::Integer(i) => Ok(Value::Boolean(i != 0)),
                Value::Text(s) => Ok(Value::Boolean(!s.is_empty() && s != "0" && s != "false")),
                other => Err(MapperError::Serialization(format!(
                    "value of type {} is not a boolean",
                    other.type_name()
                ))),
            },
            Self::List => match value {
                Value::List(items) => Ok(Value::List(items)),
                _ => Err(MapperError::Serialization(format!(
                    "value {} mapped as list is not a list",
                    json
                ))),
            },
            Self::Timestamp => match json.as_str() {
                Some(raw) => DateTime::parse_from_rfc3339(raw)
                    .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                    .map_err(|e| MapperError::Serialization(format!("invalid timestamp '{}': {}", raw, e))),
                None => Err(MapperError::Serialization(format!(
                    "value {} mapped as timestamp is not a string",
                    json
                ))),
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Boolean => write!(f, "boolean"),
            Self::List => write!(f, "list"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Any => write!(f, "any"),
        }
    }
}
