//! In-memory [`Pipeline`] used by the tests and by `hush simulate`.
//!
//! Mimics a proxy connection: a fixed set of host handlers, with
//! [`DECODE_ANCHOR`] last, and two sinks recording what made it through.
//! Host handlers pass everything along untouched.

use crate::error::{RegistryError, Result};
use crate::pipeline::{Pipeline, DECODE_ANCHOR};
use hush_filter::{Message, Stage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Handlers a fresh [`MemoryPipeline`] starts with, head first.
pub const HOST_HANDLERS: &[&str] = &["splitter", "decoder", "prepender", "encoder", DECODE_ANCHOR];

struct Passthrough;

impl Stage for Passthrough {
    fn on_message(&self, message: Message) -> Option<Message> {
        Some(message)
    }
}

struct Handler {
    name: String,
    stage: Arc<dyn Stage>,
}

/// A connection pipeline held entirely in memory.
pub struct MemoryPipeline {
    handlers: RwLock<Vec<Handler>>,
    open: AtomicBool,
    received: Mutex<Vec<Message>>,
    sent: Mutex<Vec<Message>>,
}

impl std::fmt::Debug for MemoryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPipeline")
            .field("handlers", &self.names())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Default for MemoryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPipeline {
    /// An open pipeline with the [`HOST_HANDLERS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_handlers(HOST_HANDLERS)
    }

    /// An open pipeline with the given passthrough handlers, head first.
    #[must_use]
    pub fn with_handlers(names: &[&str]) -> Self {
        let handlers = names
            .iter()
            .map(|name| Handler {
                name: (*name).to_string(),
                stage: Arc::new(Passthrough),
            })
            .collect();
        Self {
            handlers: RwLock::new(handlers),
            open: AtomicBool::new(true),
            received: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Delivers a client message, head to tail.
    ///
    /// Returns whether it reached the host.
    pub fn receive(&self, message: Message) -> bool {
        let stages = self.snapshot();
        self.deliver(stages.iter(), message, &self.received)
    }

    /// Writes a server message, tail to head.
    ///
    /// Returns whether it reached the wire.
    pub fn send(&self, message: Message) -> bool {
        let stages = self.snapshot();
        self.deliver(stages.iter().rev(), message, &self.sent)
    }

    /// Closes the channel; later edits and traffic are refused.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Handler names, head first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|handler| handler.name.clone()).collect()
    }

    /// Number of handlers named `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.read().iter().filter(|handler| handler.name == name).count()
    }

    /// Client messages that reached the host.
    #[must_use]
    pub fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Server messages that reached the wire.
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn deliver<'a>(
        &self,
        stages: impl Iterator<Item = &'a Arc<dyn Stage>>,
        message: Message,
        sink: &Mutex<Vec<Message>>,
    ) -> bool {
        if !self.is_open() {
            return false;
        }
        let mut current = message;
        for stage in stages {
            match stage.on_message(current) {
                Some(next) => current = next,
                None => return false,
            }
        }
        sink.lock().unwrap_or_else(PoisonError::into_inner).push(current);
        true
    }

    /// Stages in order, so traffic never holds the handler lock.
    fn snapshot(&self) -> Vec<Arc<dyn Stage>> {
        self.read().iter().map(|handler| Arc::clone(&handler.stage)).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Handler>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Handler>>> {
        if !self.is_open() {
            return Err(RegistryError::ChannelClosed);
        }
        Ok(self.handlers.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Pipeline for MemoryPipeline {
    fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|handler| handler.name == name)
    }

    fn add_before(&self, anchor: &str, name: &str, stage: Arc<dyn Stage>) -> Result<()> {
        let mut handlers = self.write()?;
        if handlers.iter().any(|handler| handler.name == name) {
            return Err(RegistryError::DuplicateStage(name.to_string()));
        }
        let position = handlers
            .iter()
            .position(|handler| handler.name == anchor)
            .ok_or_else(|| RegistryError::MissingAnchor(anchor.to_string()))?;
        handlers.insert(
            position,
            Handler {
                name: name.to_string(),
                stage,
            },
        );
        Ok(())
    }

    fn add_last(&self, name: &str, stage: Arc<dyn Stage>) -> Result<()> {
        let mut handlers = self.write()?;
        if handlers.iter().any(|handler| handler.name == name) {
            return Err(RegistryError::DuplicateStage(name.to_string()));
        }
        handlers.push(Handler {
            name: name.to_string(),
            stage,
        });
        Ok(())
    }

    fn remove(&self, name: &str) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|handler| handler.name != name);
        handlers.len() != before
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
