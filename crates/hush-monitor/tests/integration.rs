//! # Integration Tests
//!
//! Counters and the deferred log pool under concurrent producers.

use hush_monitor::{Counter, DeferredLog, Diagnostics, LogPool, LogRecord};
use std::sync::Arc;

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_counters_survive_many_writers_per_category() {
    let diagnostics = Arc::new(Diagnostics::new());

    let mut handles = Vec::new();
    for counter in Counter::ALL {
        for _ in 0..4 {
            let d = Arc::clone(&diagnostics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..250 {
                    d.increment(counter);
                }
            }));
        }
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = diagnostics.snapshot();
    for counter in Counter::ALL {
        assert_eq!(snapshot.get(counter), 1000, "{counter}");
    }
}

// ============================================================================
// Deferred logging
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_producers_on_plain_threads_never_block() {
    let pool = LogPool::start(2, 64);
    let log = pool.handle();

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let log = log.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    log.defer(LogRecord::debug(format!("thread {t} record {i}")).with_connection(t));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    // Whatever did not fit was counted, nothing panicked or stalled.
    assert!(log.dropped() <= 400);
    pool.shutdown().await;
}

#[test]
fn test_disabled_handle_is_usable_without_runtime() {
    let log = DeferredLog::disabled();
    for i in 0..10 {
        assert!(!log.defer(LogRecord::info(format!("{i}"))));
    }
}
