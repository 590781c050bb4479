use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::event::DaemonEvent;
use crate::snapshot::SnapshotSource;

/// Handle to the background poll loop.
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signals the monitor to stop, lets any in-flight poll cycle finish, and
    /// joins the background task.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Spawns the process lifecycle monitor on a background task.
///
/// Every poll cycle the monitor diffs a fresh snapshot against the set of
/// known pids and sends `ProcessStarted` / `ProcessTerminated` events to `tx`
/// in the order they were derived. The monitor never touches the repository;
/// classification happens on the receiving side of the channel.
pub fn start<S>(
    source: S,
    config: Arc<RwLock<Config>>,
    tx: mpsc::Sender<DaemonEvent>,
) -> MonitorHandle
where
    S: SnapshotSource + Send + 'static,
{
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(source, config, tx, cancel.clone()));
    MonitorHandle { cancel, task }
}

async fn run<S: SnapshotSource>(
    mut source: S,
    config: Arc<RwLock<Config>>,
    tx: mpsc::Sender<DaemonEvent>,
    cancel: CancellationToken,
) {
    let mut known: HashSet<u32> = HashSet::new();

    let mut interval_secs = config.read().await.monitor.effective_poll_interval_secs();
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => break,
        }

        // Pick up an interval change from a config reload without restarting.
        let configured = config.read().await.monitor.effective_poll_interval_secs();
        if configured != interval_secs {
            log::info!("Poll interval changed to {configured}s");
            interval_secs = configured;
            ticker = interval(Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        let snapshot = match source.processes() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Transient query failure: the known set stays untouched so a
                // failed enumeration never reads as mass termination.
                log::warn!("Process snapshot failed, skipping cycle: {e}");
                continue;
            }
        };

        for event in diff_snapshot(&mut known, &snapshot) {
            if tx.send(event).await.is_err() {
                // Main loop is gone; nothing left to monitor for.
                return;
            }
        }
    }
}

/// Diffs `snapshot` against the known-pid set, updating it in place and
/// returning the derived transitions.
///
/// The removal pass runs before the addition pass. A pid the OS recycles for
/// an unrelated process is therefore retired first and detected as a fresh
/// start on a later cycle, never silently merged into the old identity.
/// Identity is the pid alone: a known pid whose executable name changed
/// produces no transition.
pub(crate) fn diff_snapshot(
    known: &mut HashSet<u32>,
    snapshot: &HashMap<u32, String>,
) -> Vec<DaemonEvent> {
    let mut events = Vec::new();

    known.retain(|&pid| {
        let alive = snapshot.contains_key(&pid);
        if !alive {
            events.push(DaemonEvent::ProcessTerminated { pid });
        }
        alive
    });

    for (&pid, name) in snapshot {
        if known.insert(pid) {
            events.push(DaemonEvent::ProcessStarted {
                pid,
                name: name.clone(),
            });
        }
    }

    events
}
