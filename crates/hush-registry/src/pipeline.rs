//! The channel side of a connection, as the host exposes it.
//!
//! A pipeline is an ordered list of named handlers. Inbound messages flow
//! from the head towards the host's [`DECODE_ANCHOR`]; outbound messages
//! flow back towards the head. The interception stage is installed under
//! [`STAGE_NAME`] directly in front of the anchor so it sees decoded
//! messages in both directions.

use crate::error::{RegistryError, Result};
use hush_filter::Stage;
use std::sync::Arc;

/// Name the interception stage is installed under.
pub const STAGE_NAME: &str = "hush_interceptor";

/// Host handler the stage is inserted before.
pub const DECODE_ANCHOR: &str = "packet_handler";

/// A connection's handler list.
///
/// Implementations must be safe to edit from any thread while messages
/// are flowing.
pub trait Pipeline: Send + Sync {
    /// Whether a handler named `name` is installed.
    fn contains(&self, name: &str) -> bool;

    /// Inserts `stage` as `name` directly before `anchor`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::MissingAnchor`], [`RegistryError::DuplicateStage`]
    /// or [`RegistryError::ChannelClosed`].
    fn add_before(&self, anchor: &str, name: &str, stage: Arc<dyn Stage>) -> Result<()>;

    /// Appends `stage` as `name` at the tail.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateStage`] or [`RegistryError::ChannelClosed`].
    fn add_last(&self, name: &str, stage: Arc<dyn Stage>) -> Result<()>;

    /// Removes the handler named `name`. Returns whether one was removed.
    fn remove(&self, name: &str) -> bool;

    /// Whether the channel still carries traffic.
    fn is_open(&self) -> bool;
}

/// Installs `stage` under [`STAGE_NAME`], replacing any earlier instance.
///
/// Goes before [`DECODE_ANCHOR`] when the host has one, last otherwise.
///
/// # Errors
///
/// [`RegistryError::ChannelClosed`] when the channel is gone; any other
/// error from the pipeline is passed through.
pub fn install(pipeline: &dyn Pipeline, stage: Arc<dyn Stage>) -> Result<()> {
    if !pipeline.is_open() {
        return Err(RegistryError::ChannelClosed);
    }

    pipeline.remove(STAGE_NAME);

    if pipeline.contains(DECODE_ANCHOR) {
        match pipeline.add_before(DECODE_ANCHOR, STAGE_NAME, Arc::clone(&stage)) {
            // Anchor went away between the check and the insert.
            Err(RegistryError::MissingAnchor(_)) => pipeline.add_last(STAGE_NAME, stage),
            other => other,
        }
    } else {
        pipeline.add_last(STAGE_NAME, stage)
    }
}
