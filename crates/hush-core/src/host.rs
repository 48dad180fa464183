//! The host side: what Hush needs from the server or proxy it runs in.
//!
//! A host hands over its live channels at start-up, can message a single
//! client, and may expose a "enforce secure profile" setting that would
//! otherwise reject clients without a profile key.

use hush_filter::SessionId;
use hush_guard::{Advisory, HookRegistration};
use hush_registry::{MemoryPipeline, Pipeline};
use std::sync::{Arc, Mutex, PoisonError};

/// Services a host provides.
pub trait Host: Advisory {
    /// Channels open right now, with their identities.
    fn active_connections(&self) -> Vec<(SessionId, Arc<dyn Pipeline>)>;

    /// Whether the host rejects clients without a valid profile key.
    ///
    /// `None` when the host has no such setting.
    fn enforces_secure_profile(&self) -> Option<bool> {
        None
    }

    /// Turns the secure profile requirement off.
    fn disable_secure_profile(&self) {}

    /// Wires [`Hush::on_disconnect_notice`](crate::Hush::on_disconnect_notice)
    /// into the host's disconnect handlers with `registration`.
    fn register_disconnect_hook(&self, _registration: HookRegistration) {}
}

/// A host living entirely in memory, backed by [`MemoryPipeline`]s.
///
/// Drives the integration tests and `hush simulate`.
#[derive(Debug, Default)]
pub struct MemoryHost {
    connections: Mutex<Vec<(SessionId, Arc<MemoryPipeline>)>>,
    advisories: Mutex<Vec<(SessionId, String)>>,
    secure_profile: Mutex<Option<bool>>,
    disconnect_hook: Mutex<Option<HookRegistration>>,
}

impl MemoryHost {
    /// A host with no connections and no secure profile setting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose secure profile setting starts at `enforced`.
    #[must_use]
    pub fn with_secure_profile(enforced: bool) -> Self {
        Self {
            secure_profile: Mutex::new(Some(enforced)),
            ..Self::default()
        }
    }

    /// Opens a new connection.
    pub fn connect(&self) -> (SessionId, Arc<MemoryPipeline>) {
        let identity = SessionId::new();
        let channel = Arc::new(MemoryPipeline::new());
        lock(&self.connections).push((identity, Arc::clone(&channel)));
        (identity, channel)
    }

    /// Forgets a connection; the host no longer holds its channel.
    pub fn disconnect(&self, identity: SessionId) -> Option<Arc<MemoryPipeline>> {
        let mut connections = lock(&self.connections);
        let position = connections.iter().position(|(id, _)| *id == identity)?;
        let (_, channel) = connections.remove(position);
        channel.close();
        Some(channel)
    }

    /// Every advisory sent so far.
    #[must_use]
    pub fn advisories(&self) -> Vec<(SessionId, String)> {
        lock(&self.advisories).clone()
    }

    /// Current secure profile setting.
    #[must_use]
    pub fn secure_profile(&self) -> Option<bool> {
        *lock(&self.secure_profile)
    }

    /// How the disconnect hook was registered, if it was.
    #[must_use]
    pub fn disconnect_hook(&self) -> Option<HookRegistration> {
        *lock(&self.disconnect_hook)
    }
}

impl Advisory for MemoryHost {
    fn send_advisory(&self, identity: SessionId, text: &str) {
        lock(&self.advisories).push((identity, text.to_string()));
    }
}

impl Host for MemoryHost {
    fn active_connections(&self) -> Vec<(SessionId, Arc<dyn Pipeline>)> {
        lock(&self.connections)
            .iter()
            .map(|(identity, channel)| (*identity, Arc::clone(channel) as Arc<dyn Pipeline>))
            .collect()
    }

    fn enforces_secure_profile(&self) -> Option<bool> {
        self.secure_profile()
    }

    fn disable_secure_profile(&self) {
        let mut setting = lock(&self.secure_profile);
        if setting.is_some() {
            *setting = Some(false);
        }
    }

    fn register_disconnect_hook(&self, registration: HookRegistration) {
        *lock(&self.disconnect_hook) = Some(registration);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
