use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::categorization::CategorizationManager;
use crate::config::TimeLimits;
use crate::dispatcher;
use crate::enforcement::{EnforcementDecision, EnforcementPolicy};
use crate::event::{DaemonEvent, DomainEvent};
use crate::repository::ApplicationRepository;
use crate::snapshot;

/// A categorized application currently running under a tracked pid.
struct ActiveSession {
    name: String,
    started_at: DateTime<Utc>,
}

/// Main-context consumer of the daemon event stream.
///
/// Owns the repository, the categorization manager, the enforcement policy,
/// and the active-session table. All catalog mutation happens here, on the
/// single context that drains the channel, which is what keeps the
/// repository's single-writer contract honest while the monitor polls in the
/// background.
pub struct Pipeline {
    repo: ApplicationRepository,
    categorization: CategorizationManager,
    policy: Box<dyn EnforcementPolicy>,
    limits: TimeLimits,
    sessions: HashMap<u32, ActiveSession>,
}

impl Pipeline {
    pub fn new(
        repo: ApplicationRepository,
        categorization: CategorizationManager,
        policy: Box<dyn EnforcementPolicy>,
        limits: TimeLimits,
    ) -> Self {
        Self {
            repo,
            categorization,
            policy,
            limits,
            sessions: HashMap::new(),
        }
    }

    /// Handles one event from the channel, in arrival (emission) order.
    pub fn handle(&mut self, event: DaemonEvent) {
        match event {
            DaemonEvent::ProcessStarted { pid, name } => {
                if let Some(domain) =
                    dispatcher::on_process_started(pid, &name, &self.repo, &self.categorization)
                {
                    self.consume(domain);
                }
            }
            DaemonEvent::ProcessTerminated { pid } => {
                self.consume(dispatcher::on_process_terminated(pid));
            }
            DaemonEvent::CategorizationDecided { name, category } => {
                self.categorization
                    .on_categorization_decided(&name, category, &mut self.repo);
            }
            DaemonEvent::ConfigReloaded(config) => {
                self.limits = config.limits;
            }
            // Shutdown sequencing (stop monitor, flush) is owned by main.
            DaemonEvent::Shutdown => {}
        }
    }

    fn consume(&mut self, event: DomainEvent) {
        match event {
            DomainEvent::GameDetected { pid, name, app } => {
                self.begin_session(pid, &name);
                let limit = app.effective_time_limit(&self.limits);
                if let Some(decision) = self.policy.on_game_detected(pid, &name, &app, limit) {
                    enforce(pid, &name, decision);
                }
            }
            DomainEvent::WorkDetected { pid, name, .. } => {
                self.begin_session(pid, &name);
            }
            DomainEvent::UncategorizedDetected { name } => {
                self.categorization
                    .on_uncategorized_detected(&name, &mut self.repo);
            }
            DomainEvent::ApplicationTerminated { pid } => {
                self.end_session(pid);
            }
        }
    }

    fn begin_session(&mut self, pid: u32, name: &str) {
        // A pid already under a session would double-count its start.
        if self.sessions.contains_key(&pid) {
            return;
        }

        let mut app = self.repo.find_or_create(name).clone();
        app.record_session_start();
        self.repo.save(&app);

        self.sessions.insert(
            pid,
            ActiveSession {
                name: name.to_string(),
                started_at: Utc::now(),
            },
        );
    }

    fn end_session(&mut self, pid: u32) {
        // Terminations arrive for every pid on the host; only tracked ones
        // belong to a session.
        let Some(session) = self.sessions.remove(&pid) else {
            return;
        };

        let minutes = (Utc::now() - session.started_at).num_minutes().max(0) as u32;
        let mut app = self.repo.find_or_create(&session.name).clone();
        app.record_session_end(minutes);
        self.repo.save(&app);
        log::info!(
            "Session ended for {} (pid {pid}, {minutes} min)",
            session.name
        );
    }

    /// Writes the catalog to disk if any unsaved mutations are pending.
    /// Called on controlled shutdown.
    pub fn flush(&mut self) {
        if self.repo.is_dirty() && self.repo.save_all() {
            log::info!("Catalog flushed to disk");
        }
    }

    pub fn repository(&self) -> &ApplicationRepository {
        &self.repo
    }

    pub fn categorization(&self) -> &CategorizationManager {
        &self.categorization
    }
}

fn enforce(pid: u32, name: &str, decision: EnforcementDecision) {
    match decision {
        EnforcementDecision::Terminate => {
            log::info!("Enforcement requested termination of {name} (pid {pid})");
            if !snapshot::terminate(pid) {
                log::warn!("Could not terminate pid {pid}");
            }
        }
        EnforcementDecision::Extend { minutes } => {
            log::info!("Session for {name} (pid {pid}) extended by {minutes} minutes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{Application, Category};
    use crate::categorization::CategorizationPrompt;
    use crate::config::Config;
    use crate::monitor::diff_snapshot;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    struct RecordingPrompt(Arc<Mutex<Vec<String>>>);

    impl CategorizationPrompt for RecordingPrompt {
        fn request_decision(&mut self, process_name: &str) {
            self.0.lock().unwrap().push(process_name.to_string());
        }
    }

    struct RecordingPolicy {
        calls: Arc<Mutex<Vec<(u32, String, u32)>>>,
        decision: Option<EnforcementDecision>,
    }

    impl EnforcementPolicy for RecordingPolicy {
        fn on_game_detected(
            &mut self,
            pid: u32,
            name: &str,
            _app: &Application,
            effective_limit_minutes: u32,
        ) -> Option<EnforcementDecision> {
            self.calls
                .lock()
                .unwrap()
                .push((pid, name.to_string(), effective_limit_minutes));
            self.decision
        }
    }

    struct Fixture {
        pipeline: Pipeline,
        prompts: Arc<Mutex<Vec<String>>>,
        policy_calls: Arc<Mutex<Vec<(u32, String, u32)>>>,
        _dir: tempfile::TempDir,
    }

    fn fixture(decision: Option<EnforcementDecision>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repo = ApplicationRepository::open(dir.path().join("apps.json"));
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let policy_calls = Arc::new(Mutex::new(Vec::new()));

        let pipeline = Pipeline::new(
            repo,
            CategorizationManager::new(Box::new(RecordingPrompt(prompts.clone()))),
            Box::new(RecordingPolicy {
                calls: policy_calls.clone(),
                decision,
            }),
            TimeLimits::default(),
        );

        Fixture {
            pipeline,
            prompts,
            policy_calls,
            _dir: dir,
        }
    }

    fn snap(entries: &[(u32, &str)]) -> HashMap<u32, String> {
        entries
            .iter()
            .map(|&(pid, name)| (pid, name.to_string()))
            .collect()
    }

    fn started(pid: u32, name: &str) -> DaemonEvent {
        DaemonEvent::ProcessStarted {
            pid,
            name: name.to_string(),
        }
    }

    #[test]
    fn game_detection_starts_session_and_consults_policy() {
        let mut f = fixture(None);
        f.pipeline
            .handle(DaemonEvent::CategorizationDecided {
                name: "game.exe".to_string(),
                category: Category::Game,
            });

        f.pipeline.handle(started(10, "game.exe"));

        let calls = f.policy_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 10);
        assert_eq!(calls[0].1, "game.exe");
        assert_eq!(calls[0].2, TimeLimits::default().game);

        let app = f.pipeline.repository().find("game.exe").unwrap();
        assert_eq!(app.total_sessions(), 1);
    }

    #[test]
    fn policy_sees_custom_limit_when_set() {
        let mut f = fixture(None);
        f.pipeline
            .handle(DaemonEvent::CategorizationDecided {
                name: "game.exe".to_string(),
                category: Category::Game,
            });
        let mut app = f.pipeline.repository().find("game.exe").unwrap().clone();
        app.set_custom_time_limit(25);
        f.pipeline.repo.save(&app);

        f.pipeline.handle(started(11, "game.exe"));
        assert_eq!(f.policy_calls.lock().unwrap()[0].2, 25);
    }

    #[test]
    fn config_reload_updates_limits_for_later_detections() {
        let mut f = fixture(None);
        f.pipeline
            .handle(DaemonEvent::CategorizationDecided {
                name: "game.exe".to_string(),
                category: Category::Game,
            });

        let mut config = Config::default();
        config.limits.game = 99;
        f.pipeline.handle(DaemonEvent::ConfigReloaded(config));

        f.pipeline.handle(started(12, "game.exe"));
        assert_eq!(f.policy_calls.lock().unwrap()[0].2, 99);
    }

    #[test]
    fn terminate_decision_for_dead_pid_is_harmless() {
        // Pid far outside any real range: the kill is attempted, fails, and
        // the pipeline carries on.
        let mut f = fixture(Some(EnforcementDecision::Terminate));
        f.pipeline
            .handle(DaemonEvent::CategorizationDecided {
                name: "game.exe".to_string(),
                category: Category::Game,
            });
        f.pipeline.handle(started(4_000_000_000, "game.exe"));
        assert_eq!(f.policy_calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_start_for_tracked_pid_does_not_double_count() {
        let mut f = fixture(None);
        f.pipeline
            .handle(DaemonEvent::CategorizationDecided {
                name: "work.exe".to_string(),
                category: Category::Work,
            });

        f.pipeline.handle(started(20, "work.exe"));
        f.pipeline.handle(started(20, "work.exe"));

        let app = f.pipeline.repository().find("work.exe").unwrap();
        assert_eq!(app.total_sessions(), 1);
    }

    #[test]
    fn termination_of_untracked_pid_is_ignored() {
        let mut f = fixture(None);
        f.pipeline
            .handle(DaemonEvent::ProcessTerminated { pid: 555 });
        assert_eq!(f.pipeline.repository().count(), 0);
    }

    #[test]
    fn work_session_records_duration_on_termination() {
        let mut f = fixture(None);
        f.pipeline
            .handle(DaemonEvent::CategorizationDecided {
                name: "work.exe".to_string(),
                category: Category::Work,
            });

        f.pipeline.handle(started(30, "work.exe"));
        f.pipeline.handle(DaemonEvent::ProcessTerminated { pid: 30 });

        let app = f.pipeline.repository().find("work.exe").unwrap();
        assert_eq!(app.total_sessions(), 1);
        // Sub-minute test session rounds down to zero minutes.
        assert_eq!(app.total_minutes_used(), 0);
    }

    // Full pipeline walk-through of the first-contact flow: detection,
    // categorization, quiet steady state, termination, re-detection.
    #[test]
    fn chrome_first_contact_scenario() {
        let mut f = fixture(None);
        let mut known = HashSet::new();

        // Cycle 1: chrome.exe appears on an empty catalog.
        let events = diff_snapshot(&mut known, &snap(&[(100, "chrome.exe")]));
        assert_eq!(events.len(), 1);
        for event in events {
            f.pipeline.handle(event);
        }

        assert_eq!(*f.prompts.lock().unwrap(), vec!["chrome.exe".to_string()]);
        assert!(f.pipeline.categorization().is_awaiting("chrome.exe"));

        // User decides: Work.
        f.pipeline.handle(DaemonEvent::CategorizationDecided {
            name: "chrome.exe".to_string(),
            category: Category::Work,
        });
        assert!(!f.pipeline.categorization().is_awaiting("chrome.exe"));
        assert_eq!(
            f.pipeline.repository().find("chrome.exe").unwrap().category(),
            Category::Work
        );

        // Cycle 2: unchanged snapshot, pid still known, no events at all.
        assert!(diff_snapshot(&mut known, &snap(&[(100, "chrome.exe")])).is_empty());

        // Cycle 3: chrome exits.
        let events = diff_snapshot(&mut known, &HashMap::new());
        assert_eq!(events.len(), 1);
        for event in events {
            f.pipeline.handle(event);
        }
        // No session had been started (categorization happened mid-run), so
        // stats are untouched.
        assert_eq!(
            f.pipeline
                .repository()
                .find("chrome.exe")
                .unwrap()
                .total_sessions(),
            0
        );

        // Cycle 4: chrome starts again, now categorized. A session begins
        // and ends with the next exit.
        for event in diff_snapshot(&mut known, &snap(&[(100, "chrome.exe")])) {
            f.pipeline.handle(event);
        }
        for event in diff_snapshot(&mut known, &HashMap::new()) {
            f.pipeline.handle(event);
        }

        let app = f.pipeline.repository().find("chrome.exe").unwrap();
        assert_eq!(app.total_sessions(), 1);

        // And no second prompt ever fired.
        assert_eq!(f.prompts.lock().unwrap().len(), 1);
    }

    #[test]
    fn flush_persists_dirty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        let repo = ApplicationRepository::open(&path);
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = Pipeline::new(
            repo,
            CategorizationManager::new(Box::new(RecordingPrompt(prompts))),
            Box::new(crate::enforcement::NoEnforcement),
            TimeLimits::default(),
        );

        pipeline.handle(DaemonEvent::CategorizationDecided {
            name: "work.exe".to_string(),
            category: Category::Work,
        });
        pipeline.handle(started(40, "work.exe"));
        assert!(pipeline.repository().is_dirty());

        pipeline.flush();
        assert!(!pipeline.repository().is_dirty());

        let reloaded = ApplicationRepository::open(&path);
        assert_eq!(reloaded.find("work.exe").unwrap().total_sessions(), 1);
    }
}
