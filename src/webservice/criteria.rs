use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;

use super::HttpRequest;
use crate::core::{MapperError, Result, Value};
use crate::metadata::TransferMetadata;

lazy_static! {
    static ref SLASH_RUNS: Regex = Regex::new("/{2,}").expect("static pattern");
    static ref TRAILING_SLASHES: Regex = Regex::new("(.)/+$").expect("static pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationType {
    Item,
    #[default]
    Collection,
}

impl FromStr for OperationType {
    type Err = MapperError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "item" => Ok(Self::Item),
            "collection" => Ok(Self::Collection),
            other => Err(MapperError::InvalidCriteria(format!(
                "invalid operation type '{}'",
                other
            ))),
        }
    }
}

/// Custom GET request against a resource: `/name/value` path params, a
/// query string and an extra path appended to the route.
///
/// ```
/// use webmapper::webservice::Criteria;
///
/// let criteria = Criteria::new()
///     .set_param("uf", 1)
///     .set_param("city", "bar")
///     .set_query("name", "abc");
/// assert_eq!(criteria.params().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    params: IndexMap<String, Value>,
    query: IndexMap<String, Value>,
    path: Option<String>,
    operation_type: OperationType,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all path params.
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Replaces the whole query.
    pub fn with_query<I, K, V>(mut self, query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.query = query
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn set_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn set_query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_operation_type(mut self, operation_type: OperationType) -> Self {
        self.operation_type = operation_type;
        self
    }

    pub fn params(&self) -> &IndexMap<String, Value> {
        &self.params
    }

    pub fn query(&self) -> &IndexMap<String, Value> {
        &self.query
    }

    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Builds the GET request. Duplicate slashes collapse and trailing ones
    /// are dropped.
    pub fn create_request(&self, metadata: &TransferMetadata) -> HttpRequest {
        let mut route = format!(
            "{}/{}",
            metadata.resource.route,
            self.path.as_deref().unwrap_or_default()
        );
        for (name, value) in &self.params {
            route.push_str(&format!("/{}/{}", name, value));
        }

        let route = SLASH_RUNS.replace_all(&route, "/");
        let route = TRAILING_SLASHES.replace(&route, "$1");

        self.query
            .iter()
            .fold(HttpRequest::get(route.into_owned()), |request, (name, value)| {
                request.query(name.clone(), value.to_string())
            })
    }
}
