// ============================================================================
// Persistence Events
// ============================================================================
//
// Observer hooks fired by the transfer manager and the persister around
// flushes, writes and loads. Listeners run in registration order and an
// error returned by a listener aborts the operation that fired it.
//
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::{MapperError, Result};
use crate::transfer::{Transfer, TransferRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistenceEvent {
    PreFlush,
    PrePersist,
    PreUpdate,
    PreRemove,
    PostPersist,
    PostUpdate,
    PostRemove,
    PostFlush,
    OnLoad,
    OnException,
}

impl PersistenceEvent {
    pub const ALL: [PersistenceEvent; 10] = [
        Self::PreFlush,
        Self::PrePersist,
        Self::PreUpdate,
        Self::PreRemove,
        Self::PostPersist,
        Self::PostUpdate,
        Self::PostRemove,
        Self::PostFlush,
        Self::OnLoad,
        Self::OnException,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PreFlush => "preFlush",
            Self::PrePersist => "prePersist",
            Self::PreUpdate => "preUpdate",
            Self::PreRemove => "preRemove",
            Self::PostPersist => "postPersist",
            Self::PostUpdate => "postUpdate",
            Self::PostRemove => "postRemove",
            Self::PostFlush => "postFlush",
            Self::OnLoad => "onLoad",
            Self::OnException => "onException",
        }
    }
}

impl fmt::Display for PersistenceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Context handed to listeners.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleEvent<'a> {
    pub event: PersistenceEvent,
    /// The transfer being written or loaded. `None` for flush events.
    pub object: Option<&'a TransferRef>,
    /// Clean snapshot of the object, set for `PreUpdate`.
    pub original: Option<&'a Transfer>,
    /// The failure, set for `OnException`.
    pub error: Option<&'a MapperError>,
}

impl<'a> LifecycleEvent<'a> {
    pub fn new(event: PersistenceEvent) -> Self {
        Self {
            event,
            object: None,
            original: None,
            error: None,
        }
    }

    pub fn for_object(event: PersistenceEvent, object: &'a TransferRef) -> Self {
        Self {
            object: Some(object),
            ..Self::new(event)
        }
    }

    pub fn with_original(mut self, original: Option<&'a Transfer>) -> Self {
        self.original = original;
        self
    }

    pub fn exception(error: &'a MapperError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(PersistenceEvent::OnException)
        }
    }
}

pub trait EventListener {
    fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<()>;
}

impl<F> EventListener for F
where
    F: Fn(&LifecycleEvent<'_>) -> Result<()>,
{
    fn on_event(&self, event: &LifecycleEvent<'_>) -> Result<()> {
        self(event)
    }
}

#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<(PersistenceEvent, Rc<dyn EventListener>)>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, event: PersistenceEvent, listener: Rc<dyn EventListener>) {
        self.listeners.push((event, listener));
    }

    /// Registers one listener for several events.
    pub fn subscribe(&mut self, events: &[PersistenceEvent], listener: Rc<dyn EventListener>) {
        for event in events {
            self.add_listener(*event, listener.clone());
        }
    }

    pub fn has_listeners(&self, event: PersistenceEvent) -> bool {
        self.listeners.iter().any(|(registered, _)| *registered == event)
    }

    /// Listeners registered for the event, in registration order.
    pub fn listeners(&self, event: PersistenceEvent) -> Vec<Rc<dyn EventListener>> {
        self.listeners
            .iter()
            .filter(|(registered, _)| *registered == event)
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    pub fn dispatch(&self, event: &LifecycleEvent<'_>) -> Result<()> {
        for listener in self.listeners(event.event) {
            listener.on_event(event)?;
        }
        Ok(())
    }
}
