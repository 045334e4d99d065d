use super::TransferRef;
use crate::core::Result;

/// Content of a relation slot.
#[derive(Debug, Clone)]
pub enum RelationValue {
    One(Option<TransferRef>),
    Many(Vec<TransferRef>),
}

impl RelationValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(related) => related.is_none(),
            Self::Many(items) => items.is_empty(),
        }
    }

    pub fn refs(&self) -> Vec<TransferRef> {
        match self {
            Self::One(related) => related.iter().cloned().collect(),
            Self::Many(items) => items.clone(),
        }
    }
}

/// Whether a proxied relation still has its one-shot fetch ahead of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Initialized,
}

#[derive(Debug, Clone)]
pub struct RelationSlot {
    value: RelationValue,
    state: SlotState,
}

impl RelationSlot {
    pub fn initialized(value: RelationValue) -> Self {
        Self {
            value,
            state: SlotState::Initialized,
        }
    }

    pub fn uninitialized(value: RelationValue) -> Self {
        Self {
            value,
            state: SlotState::Uninitialized,
        }
    }

    pub fn value(&self) -> &RelationValue {
        &self.value
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub(crate) fn push(&mut self, related: TransferRef) {
        match &mut self.value {
            RelationValue::Many(items) => items.push(related),
            RelationValue::One(slot) => *slot = Some(related),
        }
        self.state = SlotState::Initialized;
    }
}

/// Fetches the content of a relation the first time a proxy reads it.
///
/// `Ok(None)` means the relation cannot be resolved yet (e.g. the foreign key
/// is still empty); the slot stays uninitialized and a later access retries.
pub trait RelationLoader {
    fn load(&self, owner: &TransferRef, relation: &str) -> Result<Option<RelationValue>>;
}
