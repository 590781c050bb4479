/// Stateless translation from process transitions to domain events.
///
/// Resolution reads the repository and the categorization manager's pending
/// predicate; it never mutates either. Prompt deduplication belongs to the
/// categorization manager alone, so the dispatcher stays free of state that
/// would otherwise mirror it.
use crate::application::Category;
use crate::categorization::CategorizationManager;
use crate::event::DomainEvent;
use crate::repository::ApplicationRepository;

/// Classifies a started process against the catalog.
///
/// Unknown names yield `UncategorizedDetected` exactly once per pending
/// decision; known names route on their category. Social is reserved (no
/// consumer yet) and system/utility processes are not worth tracking, so
/// neither produces an event.
pub fn on_process_started(
    pid: u32,
    name: &str,
    repo: &ApplicationRepository,
    categorization: &CategorizationManager,
) -> Option<DomainEvent> {
    let normalized = name.to_lowercase();
    log::debug!("Process started: {normalized} (pid {pid})");

    let Some(app) = repo.find(&normalized) else {
        if categorization.is_awaiting(&normalized) {
            return None;
        }
        log::info!("Uncategorized application found: {normalized}");
        return Some(DomainEvent::UncategorizedDetected { name: normalized });
    };

    match app.category() {
        Category::Game | Category::Leisure => {
            log::info!("Game detected: {normalized} (pid {pid})");
            Some(DomainEvent::GameDetected {
                pid,
                name: normalized,
                app: app.clone(),
            })
        }
        Category::Work | Category::Productivity => {
            log::info!("Work application detected: {normalized} (pid {pid})");
            Some(DomainEvent::WorkDetected {
                pid,
                name: normalized,
                app: app.clone(),
            })
        }
        Category::Social => {
            // Reserved: no consumer is defined for social applications yet.
            log::debug!("Social application detected: {normalized}");
            None
        }
        Category::Utility | Category::System => {
            log::debug!("System/utility process ignored: {normalized}");
            None
        }
        Category::Uncategorized | Category::Educational => {
            log::warn!(
                "No event route for category {} ({normalized})",
                app.category().as_str()
            );
            None
        }
    }
}

/// Forwards a termination unconditionally; each consumer ignores pids it
/// never tracked.
pub fn on_process_terminated(pid: u32) -> DomainEvent {
    log::debug!("Process terminated: pid {pid}");
    DomainEvent::ApplicationTerminated { pid }
}
