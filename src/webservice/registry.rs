use std::collections::HashMap;
use std::sync::Arc;

use super::{ClientConfig, HttpTransport, ReqwestTransport};
use crate::core::{MapperError, Result};

/// HTTP transports by the client name resources refer to.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, Arc<dyn HttpTransport>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, transport: Arc<dyn HttpTransport>) -> &mut Self {
        self.clients.insert(name.into(), transport);
        self
    }

    pub fn with(mut self, name: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        self.set(name, transport);
        self
    }

    /// Registers a `reqwest` transport built from the configuration.
    pub fn with_config(self, name: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(self.with(name, Arc::new(transport)))
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn HttpTransport>> {
        self.clients
            .get(name)
            .cloned()
            .ok_or_else(|| MapperError::ClientNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }
}
