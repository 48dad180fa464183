//! The unified Hush facade.
//!
//! [`Hush`] owns the registry, the guard, the counters and the deferred
//! log pool, and exposes the lifecycle hooks a host calls: start-up,
//! connect, disconnect, the pre-disconnect notification, reload and
//! shutdown.

use crate::{config::HushConfig, host::Host, Result};

use hush_filter::{FilterConfig, InterceptionStage, SessionId};
use hush_guard::{DisconnectEvent, DisconnectGuard, GuardDecision};
use hush_monitor::{DeferredLog, Diagnostics, DiagnosticsSnapshot, LogPool};
use hush_registry::{AttachOutcome, ConnectionRegistry, Pipeline};

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Everything derived from one configuration snapshot.
struct Generation {
    config: Arc<HushConfig>,
    filter: Arc<FilterConfig>,
    guard: Arc<DisconnectGuard>,
}

impl Generation {
    fn build(config: HushConfig, diagnostics: &Arc<Diagnostics>, log: &DeferredLog) -> Result<Self> {
        let guard = DisconnectGuard::new(config.guard(), Arc::clone(diagnostics), log.clone())?;
        Ok(Self {
            filter: Arc::new(config.filter()),
            config: Arc::new(config),
            guard: Arc::new(guard),
        })
    }
}

/// The Hush core.
///
/// Share it behind an `Arc`; every method takes `&self` and is safe to
/// call from any connection thread.
///
/// # Configuration Snapshots
///
/// Stages and the guard capture the snapshot current when they are built.
/// [`reload`](Self::reload) swaps the snapshot and re-attaches every live
/// connection, so each connection moves to the new generation as a whole.
///
/// # Example
///
/// ```rust
/// use hush_core::{Hush, HushConfig, MemoryHost};
/// use std::sync::Arc;
///
/// let host = Arc::new(MemoryHost::new());
/// let (_identity, channel) = host.connect();
///
/// let hush = Hush::new(HushConfig::default(), host.clone()).unwrap();
/// assert_eq!(hush.start(), 1);
///
/// channel.receive(hush_filter::fixtures::chat_session_update());
/// assert!(channel.received().is_empty());
/// ```
pub struct Hush {
    generation: RwLock<Arc<Generation>>,
    host: Arc<dyn Host>,
    registry: ConnectionRegistry,
    diagnostics: Arc<Diagnostics>,
    log: DeferredLog,
    pool: Mutex<Option<LogPool>>,
}

impl std::fmt::Debug for Hush {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hush")
            .field("config", &self.config())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Hush {
    /// Builds the core around `host`.
    ///
    /// Inside a Tokio runtime a deferred log pool is started with the
    /// configured size; outside one, verbose records are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the guard's
    /// patterns fail to compile.
    pub fn new(config: HushConfig, host: Arc<dyn Host>) -> Result<Self> {
        config.validate()?;

        let diagnostics = Arc::new(Diagnostics::new());
        let (pool, log) = match tokio::runtime::Handle::try_current() {
            Ok(_) => {
                let pool = LogPool::start(config.log_workers, config.log_queue);
                let log = pool.handle();
                (Some(pool), log)
            }
            Err(_) => {
                debug!("no tokio runtime; deferred logging disabled");
                (None, DeferredLog::disabled())
            }
        };

        let generation = Generation::build(config, &diagnostics, &log)?;

        Ok(Self {
            generation: RwLock::new(Arc::new(generation)),
            host,
            registry: ConnectionRegistry::new(log.clone()),
            diagnostics,
            log,
            pool: Mutex::new(pool),
        })
    }

    /// Brings Hush up on a running host.
    ///
    /// Turns off the host's secure profile requirement if it has one,
    /// registers the disconnect hook, logs the active settings, and
    /// attaches every open connection.
    /// Returns the number of connections attached.
    pub fn start(&self) -> usize {
        match self.host.enforces_secure_profile() {
            Some(true) => {
                self.host.disable_secure_profile();
                info!("disabled enforce-secure-profile on the host");
            }
            Some(false) => debug!("host secure profile already disabled"),
            None => debug!("host has no secure profile setting"),
        }

        self.host.register_disconnect_hook(DisconnectGuard::REGISTRATION);

        let config = self.config();
        info!(
            strip_server_signatures = config.strip_server_signatures,
            strip_client_signatures = config.strip_client_signatures,
            hide_secure_chat_warning = config.hide_secure_chat_warning,
            block_chat_session_updates = config.block_chat_session_updates,
            prevent_chat_kicks = config.prevent_chat_kicks,
            enable_logging = config.enable_logging,
            "hush starting"
        );

        let attached = self.attach_all();
        info!(attached, "hush started");
        attached
    }

    /// Attaches a stage to a newly opened connection.
    ///
    /// # Errors
    ///
    /// Pipeline errors other than a closed channel.
    pub fn on_connect(&self, identity: SessionId, channel: &Arc<dyn Pipeline>) -> Result<AttachOutcome> {
        let stage = self.stage_for(identity, &self.generation());
        Ok(self.registry.attach(identity, channel, stage)?)
    }

    /// Detaches a closing connection. Returns whether it was attached.
    pub fn on_disconnect(&self, identity: SessionId) -> bool {
        self.registry.detach(identity)
    }

    /// Attaches every connection the host reports as open.
    ///
    /// Failures are logged and skipped. Returns the number attached.
    pub fn attach_all(&self) -> usize {
        let generation = self.generation();
        self.host
            .active_connections()
            .into_iter()
            .filter(|(identity, channel)| {
                match self
                    .registry
                    .attach(*identity, channel, self.stage_for(*identity, &generation))
                {
                    Ok(AttachOutcome::ChannelClosed) => false,
                    Ok(_) => true,
                    Err(err) => {
                        warn!(%identity, %err, "could not attach");
                        false
                    }
                }
            })
            .count()
    }

    /// Detaches every connection. Returns the number detached.
    pub fn detach_all(&self) -> usize {
        let detached = self.registry.detach_all();
        info!(detached, "detached all connections; {}", self.diagnostics());
        detached
    }

    /// Replaces the configuration and re-attaches every live connection.
    ///
    /// Connections detached while the reload runs stay detached.
    /// `log-workers` and `log-queue` are not re-read. On error the old
    /// configuration stays in place. Returns the number re-attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the new configuration is invalid.
    pub fn reload(&self, config: HushConfig) -> Result<usize> {
        config.validate()?;
        let generation = Arc::new(Generation::build(config, &self.diagnostics, &self.log)?);
        *self
            .generation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&generation);

        let mut reattached = 0;
        self.registry.for_each_active(|identity, _| {
            match self.registry.reattach(identity, self.stage_for(identity, &generation)) {
                Ok(Some(AttachOutcome::Replaced)) => reattached += 1,
                Ok(_) => debug!(%identity, "connection left during reload"),
                Err(err) => warn!(%identity, %err, "could not re-attach after reload"),
            }
        });
        info!(reattached, "configuration reloaded");
        Ok(reattached)
    }

    /// Hook for the host's pre-disconnect notification.
    pub fn on_disconnect_notice(&self, event: &mut DisconnectEvent) -> GuardDecision {
        let guard = Arc::clone(&self.generation().guard);
        guard.inspect(event, self.host.as_ref())
    }

    /// Counters as one line of text.
    #[must_use]
    pub fn diagnostics(&self) -> String {
        self.diagnostics.snapshot().to_string()
    }

    /// Counters as values.
    #[must_use]
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// The configuration snapshot in force.
    #[must_use]
    pub fn config(&self) -> Arc<HushConfig> {
        Arc::clone(&self.generation().config)
    }

    /// The connection registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Detaches everything, logs final statistics and drains the log pool.
    pub async fn shutdown(&self) {
        let detached = self.registry.detach_all();
        info!(detached, "hush stopped; {}", self.diagnostics());

        let pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pool) = pool {
            pool.shutdown().await;
        }
    }

    fn generation(&self) -> Arc<Generation> {
        Arc::clone(&self.generation.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn stage_for(&self, identity: SessionId, generation: &Generation) -> Arc<InterceptionStage> {
        Arc::new(InterceptionStage::new(
            identity,
            Arc::clone(&generation.filter),
            Arc::clone(&self.diagnostics),
            self.log.clone(),
        ))
    }
}
