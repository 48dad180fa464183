//! # Tests for the Connection Registry
//!
//! ## Test Categories
//!
//! 1. **Installation**: placement relative to the host's anchor
//! 2. **Idempotence**: repeated attach and detach
//! 3. **Lifetime**: closed and dropped channels
//! 4. **Traffic**: messages flowing through an installed stage

use crate::memory::MemoryPipeline;
use crate::pipeline::{install, Pipeline, DECODE_ANCHOR, STAGE_NAME};
use crate::registry::{AttachOutcome, ConnectionRegistry};
use crate::RegistryError;
use hush_filter::{fixtures, tags, FilterConfig, InterceptionStage, SessionId, Stage};
use hush_monitor::{Counter, DeferredLog, Diagnostics};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn registry() -> ConnectionRegistry {
    ConnectionRegistry::new(DeferredLog::disabled())
}

fn stage_for(identity: SessionId, diagnostics: &Arc<Diagnostics>) -> Arc<InterceptionStage> {
    Arc::new(InterceptionStage::new(
        identity,
        Arc::new(FilterConfig::default()),
        Arc::clone(diagnostics),
        DeferredLog::disabled(),
    ))
}

fn channel() -> (Arc<MemoryPipeline>, Arc<dyn Pipeline>) {
    let memory = Arc::new(MemoryPipeline::new());
    let dynamic: Arc<dyn Pipeline> = memory.clone();
    (memory, dynamic)
}

// =============================================================================
// Installation
// =============================================================================

#[test]
fn test_stage_goes_before_anchor() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();

    let names = memory.names();
    let stage = names.iter().position(|n| n == STAGE_NAME).unwrap();
    let anchor = names.iter().position(|n| n == DECODE_ANCHOR).unwrap();
    assert_eq!(stage + 1, anchor);
}

#[test]
fn test_stage_goes_last_without_anchor() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let memory = Arc::new(MemoryPipeline::with_handlers(&["decoder", "encoder"]));
    let channel: Arc<dyn Pipeline> = memory.clone();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();

    assert_eq!(memory.names().last().map(String::as_str), Some(STAGE_NAME));
}

#[test]
fn test_pipeline_rejects_duplicate_names() {
    let memory = MemoryPipeline::new();
    let diagnostics = Arc::new(Diagnostics::new());
    let stage: Arc<dyn Stage> = stage_for(SessionId::new(), &diagnostics);

    memory.add_last("extra", Arc::clone(&stage)).unwrap();
    assert_eq!(
        memory.add_last("extra", Arc::clone(&stage)),
        Err(RegistryError::DuplicateStage("extra".to_string()))
    );
    assert_eq!(
        memory.add_before("missing", "other", stage),
        Err(RegistryError::MissingAnchor("missing".to_string()))
    );
}

#[test]
fn test_install_replaces_stray_stage() {
    let memory = MemoryPipeline::new();
    let diagnostics = Arc::new(Diagnostics::new());

    install(&memory, stage_for(SessionId::new(), &diagnostics)).unwrap();
    install(&memory, stage_for(SessionId::new(), &diagnostics)).unwrap();

    assert_eq!(memory.count(STAGE_NAME), 1);
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_attach_twice_leaves_one_stage() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    let first = registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();
    let second = registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();

    assert_eq!(first, AttachOutcome::Installed);
    assert_eq!(second, AttachOutcome::Replaced);
    assert_eq!(memory.count(STAGE_NAME), 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_reattach_on_new_channel_clears_old_one() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (old_memory, old_channel) = channel();
    let (new_memory, new_channel) = channel();

    registry
        .attach(identity, &old_channel, stage_for(identity, &diagnostics))
        .unwrap();
    registry
        .attach(identity, &new_channel, stage_for(identity, &diagnostics))
        .unwrap();

    assert_eq!(old_memory.count(STAGE_NAME), 0);
    assert_eq!(new_memory.count(STAGE_NAME), 1);
}

#[test]
fn test_detach_unknown_is_noop() {
    let registry = registry();
    assert!(!registry.detach(SessionId::new()));
    assert!(registry.is_empty());
}

#[test]
fn test_detach_removes_stage_and_entry() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();
    assert!(registry.is_attached(identity));

    assert!(registry.detach(identity));
    assert!(!registry.detach(identity));
    assert!(!registry.is_attached(identity));
    assert_eq!(memory.count(STAGE_NAME), 0);
    assert!(registry.stats(identity).is_none());
}

#[test]
fn test_detach_all_counts_entries() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let channels: Vec<_> = (0..5).map(|_| channel()).collect();

    for (_, channel) in &channels {
        let identity = SessionId::new();
        registry
            .attach(identity, channel, stage_for(identity, &diagnostics))
            .unwrap();
    }

    assert_eq!(registry.detach_all(), 5);
    assert!(registry.is_empty());
    for (memory, _) in &channels {
        assert_eq!(memory.count(STAGE_NAME), 0);
    }
}

// =============================================================================
// Lifetime
// =============================================================================

#[test]
fn test_closed_channel_is_noop() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();
    memory.close();

    let outcome = registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();

    assert_eq!(outcome, AttachOutcome::ChannelClosed);
    assert!(!registry.is_attached(identity));
    assert_eq!(memory.count(STAGE_NAME), 0);
}

#[test]
fn test_for_each_active_skips_and_prunes_dropped_channels() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let kept = SessionId::new();
    let gone = SessionId::new();
    let (_kept_memory, kept_channel) = channel();

    registry
        .attach(kept, &kept_channel, stage_for(kept, &diagnostics))
        .unwrap();
    {
        let (_memory, gone_channel) = channel();
        registry
            .attach(gone, &gone_channel, stage_for(gone, &diagnostics))
            .unwrap();
    }

    let mut seen = Vec::new();
    let visited = registry.for_each_active(|identity, _| seen.push(identity));

    assert_eq!(visited, 1);
    assert_eq!(seen, vec![kept]);
    assert!(!registry.is_attached(gone));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_for_each_active_allows_reattach_inside_callback() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();

    registry.for_each_active(|id, channel| {
        let outcome = registry.attach(id, channel, stage_for(id, &diagnostics)).unwrap();
        assert_eq!(outcome, AttachOutcome::Replaced);
    });

    assert_eq!(memory.count(STAGE_NAME), 1);
}

#[test]
fn test_detach_during_walk_stays_detached() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let (a, b) = (SessionId::new(), SessionId::new());
    let (memory_a, channel_a) = channel();
    let (memory_b, channel_b) = channel();
    registry.attach(a, &channel_a, stage_for(a, &diagnostics)).unwrap();
    registry.attach(b, &channel_b, stage_for(b, &diagnostics)).unwrap();

    // b closes on the first visit, whichever identity that is.
    let visited = registry.for_each_active(|id, _| {
        registry.detach(b);
        registry.reattach(id, stage_for(id, &diagnostics)).unwrap();
    });

    assert_eq!(visited, 2);
    assert_eq!(registry.len(), 1);
    assert!(registry.is_attached(a));
    assert!(!registry.is_attached(b));
    assert_eq!(memory_a.count(STAGE_NAME), 1);
    assert_eq!(memory_b.count(STAGE_NAME), 0);
}

#[test]
fn test_reattach_unknown_is_noop() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();
    assert!(registry.detach(identity));

    assert_eq!(registry.reattach(identity, stage_for(identity, &diagnostics)).unwrap(), None);
    assert!(!registry.is_attached(identity));
    assert_eq!(memory.count(STAGE_NAME), 0);
}

#[test]
fn test_reattach_swaps_stage_in_place() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();
    let before = registry.stage(identity).unwrap();

    let replacement = stage_for(identity, &diagnostics);
    assert_eq!(
        registry.reattach(identity, Arc::clone(&replacement)).unwrap(),
        Some(AttachOutcome::Replaced)
    );
    assert!(Arc::ptr_eq(&registry.stage(identity).unwrap(), &replacement));
    assert!(!Arc::ptr_eq(&before, &replacement));
    assert_eq!(memory.count(STAGE_NAME), 1);
}

#[test]
fn test_concurrent_attach_detach_keeps_entry_and_stage_in_step() {
    let registry = Arc::new(registry());
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    let attacher = {
        let registry = Arc::clone(&registry);
        let diagnostics = Arc::clone(&diagnostics);
        let channel = Arc::clone(&channel);
        std::thread::spawn(move || {
            for _ in 0..500 {
                registry
                    .attach(identity, &channel, stage_for(identity, &diagnostics))
                    .unwrap();
            }
        })
    };
    let detacher = {
        let registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            for _ in 0..500 {
                registry.detach(identity);
            }
        })
    };
    attacher.join().unwrap();
    detacher.join().unwrap();

    let installed = memory.count(STAGE_NAME);
    assert!(installed <= 1);
    assert_eq!(registry.is_attached(identity), installed == 1);
}

#[test]
fn test_detach_after_host_dropped_channel() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    {
        let (_memory, channel) = channel();
        registry
            .attach(identity, &channel, stage_for(identity, &diagnostics))
            .unwrap();
    }
    assert!(registry.detach(identity));
}

// =============================================================================
// Traffic
// =============================================================================

#[test]
fn test_traffic_through_installed_stage() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();

    assert!(memory.send(fixtures::player_chat("Steve", "hello")));
    assert!(!memory.receive(fixtures::chat_session_update()));
    assert!(memory.receive(fixtures::chat("hi")));

    let sent = memory.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tag, tags::SYSTEM_CHAT);

    let received = memory.received();
    assert_eq!(received.len(), 1);
    assert!(received[0].payload["signature"].is_null());

    let stats = registry.stats(identity).unwrap();
    assert_eq!(stats.forwarded, 2);
    assert_eq!(stats.dropped, 1);
    assert_eq!(diagnostics.get(Counter::BlockedSessionUpdates), 1);
}

#[test]
fn test_traffic_after_detach_is_untouched() {
    let registry = registry();
    let diagnostics = Arc::new(Diagnostics::new());
    let identity = SessionId::new();
    let (memory, channel) = channel();

    registry
        .attach(identity, &channel, stage_for(identity, &diagnostics))
        .unwrap();
    registry.detach(identity);

    let message = fixtures::player_chat("Steve", "hello");
    assert!(memory.send(message.clone()));
    assert_eq!(memory.sent(), vec![message]);
    assert_eq!(diagnostics.get(Counter::ProcessedChat), 0);
}

#[test]
fn test_closed_channel_carries_nothing() {
    let memory = MemoryPipeline::new();
    memory.close();
    assert!(!memory.send(fixtures::keep_alive()));
    assert!(memory.sent().is_empty());
}
