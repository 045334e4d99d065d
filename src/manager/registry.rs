use indexmap::IndexMap;

use super::{TransferManager, TransferRepository};
use crate::core::{MapperError, Result};

/// Named transfer managers. The default is the one set explicitly, or the
/// first registered.
#[derive(Debug, Default)]
pub struct TransferManagerRegistry {
    managers: IndexMap<String, TransferManager>,
    default_manager: Option<String>,
}

impl TransferManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_manager(&mut self, name: impl Into<String>, manager: TransferManager) {
        self.managers.insert(name.into(), manager);
    }

    pub fn set_default_manager(&mut self, name: impl Into<String>) {
        self.default_manager = Some(name.into());
    }

    pub fn default_manager_name(&self) -> Option<&str> {
        self.default_manager
            .as_deref()
            .or_else(|| self.managers.keys().next().map(String::as_str))
    }

    pub fn manager_names(&self) -> Vec<&str> {
        self.managers.keys().map(String::as_str).collect()
    }

    /// The named manager, or the default one for `None`.
    pub fn manager(&self, name: Option<&str>) -> Result<TransferManager> {
        let name = name
            .or_else(|| self.default_manager_name())
            .ok_or_else(|| MapperError::Metadata("no transfer manager registered".to_string()))?;

        self.managers
            .get(name)
            .cloned()
            .ok_or_else(|| MapperError::Metadata(format!("no transfer manager named '{}'", name)))
    }

    pub fn repository(&self, type_name: &str, manager: Option<&str>) -> Result<TransferRepository> {
        self.manager(manager)?.repository(type_name)
    }

    /// Clears the manager's unit of work and returns it.
    pub fn reset_manager(&self, name: Option<&str>) -> Result<TransferManager> {
        let manager = self.manager(name)?;
        manager.clear();
        Ok(manager)
    }
}
