use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Object of type '{0}' is not managed by the unit of work")]
    UnmanagedObject(String),

    #[error("Transfer '{0}' has no id mapping")]
    MissingIdMapping(String),

    #[error("Transfer '{0}' has no id value")]
    MissingIdValue(String),

    #[error(transparent)]
    Webservice(#[from] WebserviceResponseError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("No metadata registered for transfer '{0}'")]
    UnknownTransfer(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("No client registered for '{0}'")]
    ClientNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Relationship cycle detected on '{type_name}.{property}'")]
    RelationshipCycle { type_name: String, property: String },

    #[error("Transfer manager is no longer available")]
    ManagerUnavailable,

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Transaction could not be rolled back: {0}")]
    Rollback(Box<MapperError>),
}

pub type Result<T> = std::result::Result<T, MapperError>;

impl MapperError {
    /// True for a webservice response carrying HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Webservice(err) if err.is_not_found())
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for MapperError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A non-2xx answer from a remote resource.
#[derive(Debug, Clone)]
pub struct WebserviceResponseError {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub reason: String,
    pub body: Option<serde_json::Value>,
}

impl WebserviceResponseError {
    pub fn new(method: impl Into<String>, path: impl Into<String>, status: u16) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            status,
            reason: String::new(),
            body: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Attaches the raw response body, kept only when it parses as JSON.
    pub fn with_raw_body(mut self, raw: &str) -> Self {
        self.body = serde_json::from_str(raw).ok();
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl fmt::Display for WebserviceResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Webservice responded {} to {} {}",
            self.status, self.method, self.path
        )?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for WebserviceResponseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err: MapperError = WebserviceResponseError::new("GET", "/foo", 404).into();
        assert!(err.is_not_found());

        let err: MapperError = WebserviceResponseError::new("GET", "/foo", 500).into();
        assert!(!err.is_not_found());
        assert!(!MapperError::ManagerUnavailable.is_not_found());
    }

    #[test]
    fn test_response_error_keeps_json_body_only() {
        let err = WebserviceResponseError::new("POST", "/foo", 422)
            .with_reason("Unprocessable Entity")
            .with_raw_body(r#"{"name": "required"}"#);
        assert_eq!(err.body, Some(serde_json::json!({"name": "required"})));
        assert_eq!(
            err.to_string(),
            "Webservice responded 422 to POST /foo (Unprocessable Entity)"
        );

        let err = WebserviceResponseError::new("POST", "/foo", 500).with_raw_body("<html>");
        assert!(err.body.is_none());
    }
}
