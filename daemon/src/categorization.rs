use std::collections::HashSet;

use crate::application::{Application, Category};
use crate::repository::ApplicationRepository;

/// External collaborator that fronts for the user when a new executable needs
/// a category. The interactive dialog lives outside the daemon; the daemon
/// only guarantees it asks at most once per pending name.
pub trait CategorizationPrompt: Send {
    fn request_decision(&mut self, process_name: &str);
}

/// Headless stand-in for the categorization dialog: surfaces the request in
/// the log and waits for a `CategorizationDecided` event to arrive.
pub struct LoggingPrompt;

impl CategorizationPrompt for LoggingPrompt {
    fn request_decision(&mut self, process_name: &str) {
        log::info!("New application '{process_name}' is awaiting categorization");
    }
}

/// All known applications split for display: games and leisure on one side,
/// everything else on the other. Read-only.
pub struct ArchiveView<'a> {
    pub games: Vec<&'a Application>,
    pub others: Vec<&'a Application>,
}

/// Tracks which names are awaiting a user decision and deduplicates prompts.
///
/// The dispatcher consults `is_awaiting` before emitting
/// `UncategorizedDetected`, so a name is prompted for exactly once no matter
/// how many times its process is started before the user answers.
pub struct CategorizationManager {
    awaiting: HashSet<String>,
    prompt: Box<dyn CategorizationPrompt>,
}

impl CategorizationManager {
    pub fn new(prompt: Box<dyn CategorizationPrompt>) -> Self {
        Self {
            awaiting: HashSet::new(),
            prompt,
        }
    }

    /// Whether `name` has been flagged for categorization with no decision
    /// persisted yet.
    pub fn is_awaiting(&self, name: &str) -> bool {
        self.awaiting.contains(&name.to_lowercase())
    }

    /// Handles a newly detected uncategorized executable. Names already in
    /// the pending set are absorbed silently; otherwise the record is created
    /// in the repository and the prompt collaborator is asked for a decision.
    pub fn on_uncategorized_detected(
        &mut self,
        name: &str,
        repo: &mut ApplicationRepository,
    ) {
        let normalized = name.to_lowercase();
        if !self.awaiting.insert(normalized.clone()) {
            return;
        }

        repo.find_or_create(&normalized);
        self.prompt.request_decision(&normalized);
    }

    /// Applies a user decision: writes the category through the repository,
    /// persists the catalog, and clears the pending entry.
    pub fn on_categorization_decided(
        &mut self,
        name: &str,
        category: Category,
        repo: &mut ApplicationRepository,
    ) {
        let normalized = name.to_lowercase();

        let mut app = repo.find_or_create(&normalized).clone();
        app.set_category(category);
        repo.save(&app);
        if !repo.save_all() {
            // Kept dirty; the shutdown flush retries.
            log::warn!("Could not persist categorization of {normalized} yet");
        }

        self.awaiting.remove(&normalized);
        log::info!("Categorized {normalized} as {}", category.as_str());
    }

    /// Splits the catalog into {Game, Leisure} vs everything else for
    /// display. No mutation.
    pub fn archive_view<'a>(&self, repo: &'a ApplicationRepository) -> ArchiveView<'a> {
        let mut games = Vec::new();
        let mut others = Vec::new();

        for app in repo.find_all() {
            match app.category() {
                Category::Game | Category::Leisure => games.push(app),
                _ => others.push(app),
            }
        }

        ArchiveView { games, others }
    }
}
