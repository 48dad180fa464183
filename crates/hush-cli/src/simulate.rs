//! Drives Hush against an in-memory host.
//!
//! Every connection runs on its own thread, pushes a scripted mix of
//! messages through its pipeline, then receives one attestation kick.

use hush_core::{
    DiagnosticsSnapshot, DisconnectEvent, GuardDecision, Hush, HushConfig, MemoryHost, MemoryPipeline, Message,
};
use hush_filter::{fixtures, Direction};
use std::sync::Arc;
use tracing::info;

/// What a simulation run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Connections simulated.
    pub connections: usize,
    /// Messages pushed per connection.
    pub messages: usize,
    /// Messages that reached the host or the wire.
    pub delivered: usize,
    /// Kicks the guard cancelled.
    pub kicks_cancelled: usize,
    /// Counters at the end of the run.
    pub diagnostics: DiagnosticsSnapshot,
}

/// Message `index` of the script.
fn scripted(index: usize) -> Message {
    match index % 6 {
        0 => fixtures::player_chat("Steve", &format!("hello #{index}")),
        1 => fixtures::chat("hi"),
        2 => fixtures::chat_command_signed("msg Alex hi"),
        3 => fixtures::chat_session_update(),
        4 => fixtures::login(),
        _ => fixtures::keep_alive(),
    }
}

fn push(channel: &MemoryPipeline, message: Message) -> bool {
    match message.direction {
        Direction::Inbound => channel.receive(message),
        Direction::Outbound => channel.send(message),
    }
}

/// Sums per-connection `(delivered, cancelled)` pairs.
///
/// A connection thread that panicked fails the run.
fn tally<I>(results: I) -> anyhow::Result<(usize, usize)>
where
    I: IntoIterator<Item = std::thread::Result<(usize, usize)>>,
{
    results
        .into_iter()
        .enumerate()
        .try_fold((0, 0), |(delivered, cancelled), (index, result)| {
            let (d, k) = result.map_err(|payload| {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                anyhow::anyhow!("connection {index} panicked: {reason}")
            })?;
            Ok((delivered + d, cancelled + k))
        })
}

/// Runs the simulation and shuts Hush down.
///
/// # Errors
///
/// Fails if the core cannot be built or a connection thread panics.
pub async fn run(config: HushConfig, connections: usize, messages: usize) -> anyhow::Result<Report> {
    let host = Arc::new(MemoryHost::new());
    let channels: Vec<_> = (0..connections).map(|_| host.connect()).collect();

    let hush = Hush::new(config, host.clone())?;
    let attached = hush.start();
    info!(attached, messages, "simulation running");

    let totals = std::thread::scope(|scope| {
        let workers: Vec<_> = channels
            .iter()
            .map(|(identity, channel)| {
                let hush = &hush;
                scope.spawn(move || {
                    let delivered = (0..messages)
                        .filter(|index| push(channel, scripted(*index)))
                        .count();

                    let mut kick = DisconnectEvent::new(*identity, "Chat message validation failure")
                        .with_cause("CHAT_VALIDATION_FAILED");
                    let cancelled = matches!(hush.on_disconnect_notice(&mut kick), GuardDecision::Cancelled(_));
                    (delivered, usize::from(cancelled))
                })
            })
            .collect();

        tally(workers.into_iter().map(|worker| worker.join()))
    });

    let diagnostics = hush.diagnostics_snapshot();
    hush.shutdown().await;
    let (delivered, kicks_cancelled) = totals?;

    Ok(Report {
        connections,
        messages,
        delivered,
        kicks_cancelled,
        diagnostics,
    })
}
