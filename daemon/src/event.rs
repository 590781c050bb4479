use crate::application::{Application, Category};
use crate::config::Config;

/// Everything that crosses into the main event loop, in FIFO order.
///
/// The monitor task only ever communicates through these; it never touches
/// the repository directly.
#[derive(Debug)]
pub enum DaemonEvent {
    /// A pid appeared in the process table that was not known last cycle.
    ProcessStarted { pid: u32, name: String },
    /// A previously known pid disappeared from the process table.
    ProcessTerminated { pid: u32 },
    /// The user decided a category for a pending application.
    CategorizationDecided { name: String, category: Category },
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C received; the daemon should flush state and exit.
    Shutdown,
}

/// Classified events emitted by the dispatcher for downstream consumers
/// (session tracking, enforcement, the categorization flow).
#[derive(Debug, PartialEq)]
pub enum DomainEvent {
    /// A game or leisure application started.
    GameDetected {
        pid: u32,
        name: String,
        app: Application,
    },
    /// A work or productivity application started.
    WorkDetected {
        pid: u32,
        name: String,
        app: Application,
    },
    /// An executable with no catalog record started and is not yet awaiting
    /// a categorization decision.
    UncategorizedDetected { name: String },
    /// A tracked or untracked pid exited; consumers ignore pids they never
    /// tracked.
    ApplicationTerminated { pid: u32 },
}
