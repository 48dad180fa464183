//! # Connection Registry
//!
//! Tracks which connections carry an interception stage. The registry is
//! the only structure shared by every connection thread, so it lives in a
//! sharded [`DashMap`]: attaching one connection never waits on another.
//!
//! ## Idempotence
//!
//! | Call | State before | Result |
//! |------|--------------|--------|
//! | `attach` | no entry | stage installed, entry added |
//! | `attach` | entry exists | old stage removed, new stage installed |
//! | `attach` | channel closed | nothing installed, no entry |
//! | `reattach` | entry exists | stage swapped on the same channel |
//! | `reattach` | no entry | nothing |
//! | `detach` | entry exists | stage removed, entry dropped |
//! | `detach` | no entry | nothing |
//!
//! ## Channel Lifetime
//!
//! The host owns its channels. The registry keeps only a [`Weak`]
//! reference; once the host drops a channel, bulk operations skip it and
//! prune its entry.

use crate::error::{RegistryError, Result};
use crate::pipeline::{install, Pipeline, STAGE_NAME};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hush_filter::{InterceptionStage, SessionId, StageStatsSnapshot};
use hush_monitor::{DeferredLog, LogRecord};
use std::sync::{Arc, Weak};

/// What [`ConnectionRegistry::attach`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// First stage for this identity.
    Installed,
    /// An earlier stage was swapped out.
    Replaced,
    /// The channel was already closed; nothing was installed.
    ChannelClosed,
}

struct Attached {
    channel: Weak<dyn Pipeline>,
    stage: Arc<InterceptionStage>,
}

/// Live connections and their interception stages.
pub struct ConnectionRegistry {
    entries: DashMap<SessionId, Attached>,
    log: DeferredLog,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    /// An empty registry deferring its verbose records to `log`.
    #[must_use]
    pub fn new(log: DeferredLog) -> Self {
        Self {
            entries: DashMap::new(),
            log,
        }
    }

    /// Installs `stage` on `channel` for `identity`.
    ///
    /// An existing stage for the identity is removed first, from whichever
    /// channel it was on, so handlers never stack.
    ///
    /// # Errors
    ///
    /// Pipeline errors other than a closed channel, which is reported as
    /// [`AttachOutcome::ChannelClosed`].
    pub fn attach(
        &self,
        identity: SessionId,
        channel: &Arc<dyn Pipeline>,
        stage: Arc<InterceptionStage>,
    ) -> Result<AttachOutcome> {
        let logging = stage.config().enable_logging;
        let attached = Attached {
            channel: Arc::downgrade(channel),
            stage: Arc::clone(&stage),
        };

        // The entry guard serializes concurrent attaches for one identity.
        let outcome = match self.entries.entry(identity) {
            Entry::Occupied(mut occupied) => {
                if let Some(previous) = occupied.get().channel.upgrade() {
                    previous.remove(STAGE_NAME);
                }
                match install(channel.as_ref(), stage) {
                    Ok(()) => {
                        occupied.insert(attached);
                        AttachOutcome::Replaced
                    }
                    Err(RegistryError::ChannelClosed) => {
                        occupied.remove();
                        AttachOutcome::ChannelClosed
                    }
                    Err(err) => {
                        occupied.remove();
                        tracing::warn!(%identity, %err, "failed to attach interception stage");
                        return Err(err);
                    }
                }
            }
            Entry::Vacant(vacant) => match install(channel.as_ref(), stage) {
                Ok(()) => {
                    vacant.insert(attached);
                    AttachOutcome::Installed
                }
                Err(RegistryError::ChannelClosed) => AttachOutcome::ChannelClosed,
                Err(err) => {
                    tracing::warn!(%identity, %err, "failed to attach interception stage");
                    return Err(err);
                }
            },
        };

        if logging {
            self.log
                .defer(LogRecord::info(format!("attach: {outcome:?}")).with_connection(identity));
        }
        Ok(outcome)
    }

    /// Swaps the stage of an existing entry, on the channel it already has.
    ///
    /// Unlike [`attach`](Self::attach) this never creates an entry: an
    /// identity detached in the meantime yields `Ok(None)` and stays
    /// detached. An entry whose channel has gone away is dropped.
    ///
    /// # Errors
    ///
    /// Pipeline errors other than a closed channel. The entry is dropped.
    pub fn reattach(&self, identity: SessionId, stage: Arc<InterceptionStage>) -> Result<Option<AttachOutcome>> {
        let Entry::Occupied(mut occupied) = self.entries.entry(identity) else {
            return Ok(None);
        };
        let Some(channel) = occupied.get().channel.upgrade() else {
            occupied.remove();
            return Ok(Some(AttachOutcome::ChannelClosed));
        };

        channel.remove(STAGE_NAME);
        match install(channel.as_ref(), Arc::clone(&stage) as _) {
            Ok(()) => {
                occupied.get_mut().stage = stage;
                Ok(Some(AttachOutcome::Replaced))
            }
            Err(RegistryError::ChannelClosed) => {
                occupied.remove();
                Ok(Some(AttachOutcome::ChannelClosed))
            }
            Err(err) => {
                occupied.remove();
                tracing::warn!(%identity, %err, "failed to re-attach interception stage");
                Err(err)
            }
        }
    }

    /// Removes the stage for `identity` and forgets it.
    ///
    /// The stage comes off the channel before the entry is released, so a
    /// concurrent [`attach`](Self::attach) for the same identity lands
    /// either wholly before or wholly after. Returns `false` when there was
    /// nothing to detach.
    pub fn detach(&self, identity: SessionId) -> bool {
        let Entry::Occupied(occupied) = self.entries.entry(identity) else {
            return false;
        };
        if let Some(channel) = occupied.get().channel.upgrade() {
            channel.remove(STAGE_NAME);
        }
        let (_, attached) = occupied.remove_entry();

        if attached.stage.config().enable_logging {
            let stats = attached.stage.stats();
            self.log.defer(
                LogRecord::info(format!(
                    "detach: forwarded={} replaced={} dropped={}",
                    stats.forwarded, stats.replaced, stats.dropped
                ))
                .with_connection(identity),
            );
        }
        true
    }

    /// Detaches every entry present when the call starts.
    ///
    /// Returns the number actually detached.
    pub fn detach_all(&self) -> usize {
        self.identities()
            .into_iter()
            .filter(|identity| self.detach(*identity))
            .count()
    }

    /// Calls `f` once per entry whose channel the host still holds.
    ///
    /// Works on a snapshot, so `f` may touch the registry without
    /// deadlocking. An entry detached after the snapshot is still visited;
    /// use [`reattach`](Self::reattach) inside `f` so it stays detached.
    /// Entries whose channel is gone are pruned. Returns the number of
    /// calls made.
    pub fn for_each_active<F>(&self, mut f: F) -> usize
    where
        F: FnMut(SessionId, &Arc<dyn Pipeline>),
    {
        let mut live = Vec::with_capacity(self.entries.len());
        let mut dead = Vec::new();
        for entry in self.entries.iter() {
            match entry.channel.upgrade() {
                Some(channel) => live.push((*entry.key(), channel)),
                None => dead.push(*entry.key()),
            }
        }

        for identity in dead {
            self.entries
                .remove_if(&identity, |_, attached| attached.channel.strong_count() == 0);
        }

        for (identity, channel) in &live {
            f(*identity, channel);
        }
        live.len()
    }

    /// Message counts of the stage attached for `identity`.
    #[must_use]
    pub fn stats(&self, identity: SessionId) -> Option<StageStatsSnapshot> {
        self.entries.get(&identity).map(|attached| attached.stage.stats())
    }

    /// The stage attached for `identity`.
    #[must_use]
    pub fn stage(&self, identity: SessionId) -> Option<Arc<InterceptionStage>> {
        self.entries
            .get(&identity)
            .map(|attached| Arc::clone(&attached.stage))
    }

    /// Whether `identity` has an entry.
    #[must_use]
    pub fn is_attached(&self, identity: SessionId) -> bool {
        self.entries.contains_key(&identity)
    }

    /// Identities with an entry, in no particular order.
    #[must_use]
    pub fn identities(&self) -> Vec<SessionId> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
