use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

use super::TransferManager;
use crate::core::{MapperError, Result};
use crate::event::{EventListener, PersistenceEvent};
use crate::metadata::{MetadataProvider, MetadataRegistry};
use crate::transaction::TransactionEventListener;
use crate::webservice::{ClientConfig, ClientRegistry, HttpTransport, HttpWebserviceClient, WebserviceClient};

/// Assembles a [`TransferManager`].
///
/// Metadata comes from a provider or a JSON document on disk. Unless a
/// custom client is set, requests go through an [`HttpWebserviceClient`]
/// over the registered transports.
#[derive(Default)]
pub struct TransferManagerBuilder {
    metadata: Option<Arc<dyn MetadataProvider>>,
    metadata_path: Option<PathBuf>,
    clients: ClientRegistry,
    client: Option<Rc<dyn WebserviceClient>>,
    transactional: bool,
    listeners: Vec<(PersistenceEvent, Rc<dyn EventListener>)>,
}

impl TransferManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// JSON metadata document, read when the manager is built.
    pub fn with_metadata_path(mut self, path: impl AsRef<Path>) -> Self {
        self.metadata_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_client_registry(mut self, clients: ClientRegistry) -> Self {
        self.clients = clients;
        self
    }

    pub fn with_transport(mut self, name: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        self.clients.set(name, transport);
        self
    }

    pub fn with_client_config(mut self, name: impl Into<String>, config: ClientConfig) -> Result<Self> {
        self.clients = self.clients.with_config(name, config)?;
        Ok(self)
    }

    /// Replaces the HTTP client entirely.
    pub fn with_webservice_client(mut self, client: Rc<dyn WebserviceClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Journals flush writes and compensates them when a flush fails.
    pub fn transactional(mut self, enabled: bool) -> Self {
        self.transactional = enabled;
        self
    }

    pub fn with_listener(mut self, event: PersistenceEvent, listener: Rc<dyn EventListener>) -> Self {
        self.listeners.push((event, listener));
        self
    }

    fn load_metadata(&mut self) -> Result<Arc<dyn MetadataProvider>> {
        if let Some(metadata) = self.metadata.take() {
            return Ok(metadata);
        }

        let Some(path) = self.metadata_path.take() else {
            return Err(MapperError::Metadata("no metadata configured".to_string()));
        };
        let raw = std::fs::read_to_string(&path).map_err(|err| {
            MapperError::Metadata(format!("cannot read '{}': {}", path.display(), err))
        })?;
        let registry = MetadataRegistry::from_json_str(&raw)?;

        debug!(path = %path.display(), types = registry.type_names().len(), "metadata loaded");
        Ok(Arc::new(registry))
    }

    pub fn build(mut self) -> Result<TransferManager> {
        let metadata = self.load_metadata()?;
        let client = match self.client.take() {
            Some(client) => client,
            None => Rc::new(HttpWebserviceClient::new(self.clients, metadata.clone())),
        };

        let manager = TransferManager::new(metadata.clone(), client.clone());
        if self.transactional {
            manager.subscribe(
                &TransactionEventListener::EVENTS,
                Rc::new(TransactionEventListener::new(client, metadata)),
            );
        }
        for (event, listener) in self.listeners {
            manager.add_listener(event, listener);
        }
        Ok(manager)
    }
}
