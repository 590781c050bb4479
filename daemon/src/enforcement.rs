use crate::application::Application;

/// Outcome of an enforcement consultation for a running game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementDecision {
    /// Forcefully terminate the process.
    Terminate,
    /// Grant the session additional minutes.
    Extend { minutes: u32 },
}

/// Boundary for the session countdown / warning / forced-termination policy.
///
/// When and how to warn or cut a session off is the policy's business; a
/// policy receives the pid, the application record (warning strategy
/// included), and the resolved effective time limit in minutes, and answers
/// with a decision, or `None` to leave the session alone.
pub trait EnforcementPolicy: Send {
    fn on_game_detected(
        &mut self,
        pid: u32,
        name: &str,
        app: &Application,
        effective_limit_minutes: u32,
    ) -> Option<EnforcementDecision>;
}

/// Default policy: observe, never intervene.
pub struct NoEnforcement;

impl EnforcementPolicy for NoEnforcement {
    fn on_game_detected(
        &mut self,
        _pid: u32,
        _name: &str,
        _app: &Application,
        _effective_limit_minutes: u32,
    ) -> Option<EnforcementDecision> {
        None
    }
}
