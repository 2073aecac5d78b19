//! Keep-alive thread.
//!
//! Sends one heartbeat immediately and then one per interval until the stop
//! signal is raised or the shutdown channel is closed.

use crossbeam::channel::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::StopSignal;
use crate::slimevr::PacketSender;

/// Spawn the heartbeat thread.
///
/// Dropping every sender of `shutdown` wakes the thread immediately. The join
/// handle yields the number of heartbeats handed to the sink.
pub fn spawn(
    sender: Arc<PacketSender>,
    interval: Duration,
    stop: StopSignal,
    shutdown: Receiver<()>,
) -> std::io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("heartbeat".to_string())
        .spawn(move || run(&sender, interval, &stop, &shutdown))
}

fn run(
    sender: &PacketSender,
    interval: Duration,
    stop: &StopSignal,
    shutdown: &Receiver<()>,
) -> u64 {
    tracing::debug!("Heartbeat thread started ({:?} interval)", interval);

    let ticker = channel::tick(interval);
    let mut beats = 0u64;

    while !stop.is_triggered() {
        if sender.send_heartbeat().is_ok() {
            beats += 1;
        }

        crossbeam::select! {
            recv(ticker) -> _ => {}
            recv(shutdown) -> _ => break,
        }
    }

    tracing::debug!("Heartbeat thread stopped after {} heartbeats", beats);
    beats
}
