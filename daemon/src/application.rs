use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimeLimits;

/// Minimum number of recorded sessions before an application counts as
/// frequently used.
const FREQUENT_USE_THRESHOLD: u32 = 10;

/// User-assigned classification of an executable.
///
/// The string mapping is total in both directions: every category has a
/// stable name, and any unrecognized name parses as `Uncategorized` rather
/// than failing the surrounding load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Uncategorized,
    Game,
    Leisure,
    Work,
    Productivity,
    Social,
    Educational,
    Utility,
    System,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Uncategorized => "Uncategorized",
            Category::Game => "Game",
            Category::Leisure => "Leisure",
            Category::Work => "Work",
            Category::Productivity => "Productivity",
            Category::Social => "Social",
            Category::Educational => "Educational",
            Category::Utility => "Utility",
            Category::System => "System",
        }
    }

    /// Parses a category name, falling back to `Uncategorized` on unknown input.
    pub fn parse(s: &str) -> Self {
        match s {
            "Game" => Category::Game,
            "Leisure" => Category::Leisure,
            "Work" => Category::Work,
            "Productivity" => Category::Productivity,
            "Social" => Category::Social,
            "Educational" => Category::Educational,
            "Utility" => Category::Utility,
            "System" => Category::System,
            _ => Category::Uncategorized,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

/// How aggressively the enforcement layer warns before a session limit.
///
/// Persisted as its integer ordinal; unknown ordinals fall back to `Standard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum WarningStrategy {
    /// 15, 10, 5 minute warnings.
    #[default]
    Standard,
    /// 30, 20, 10, 5 minute warnings.
    Aggressive,
    /// 5 minute warning only.
    Gentle,
    /// No warnings.
    None,
}

impl From<u8> for WarningStrategy {
    fn from(ordinal: u8) -> Self {
        match ordinal {
            1 => WarningStrategy::Aggressive,
            2 => WarningStrategy::Gentle,
            3 => WarningStrategy::None,
            _ => WarningStrategy::Standard,
        }
    }
}

impl From<WarningStrategy> for u8 {
    fn from(s: WarningStrategy) -> Self {
        match s {
            WarningStrategy::Standard => 0,
            WarningStrategy::Aggressive => 1,
            WarningStrategy::Gentle => 2,
            WarningStrategy::None => 3,
        }
    }
}

/// The persisted, categorized identity of an executable, keyed by its
/// normalized (lowercased) process name. The process name is fixed at
/// construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    process_name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    category: Category,
    #[serde(default = "Utc::now")]
    first_seen: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    last_seen: DateTime<Utc>,
    #[serde(default)]
    total_sessions: u32,
    #[serde(default)]
    total_minutes_used: u32,
    /// Longest single session, in minutes.
    #[serde(default)]
    longest_session: u32,
    /// Custom session limit in minutes; -1 means use the category default.
    #[serde(default = "default_custom_time_limit")]
    custom_time_limit: i32,
    #[serde(default)]
    warning_strategy: WarningStrategy,
    #[serde(default = "default_requires_prompt")]
    requires_prompt: bool,
}

fn default_custom_time_limit() -> i32 {
    -1
}

fn default_requires_prompt() -> bool {
    true
}

impl Application {
    /// Creates a new, uncategorized record. The key is the lowercased process
    /// name; the display name keeps the caller's original casing.
    pub fn new(process_name: &str) -> Self {
        let now = Utc::now();
        Self {
            process_name: process_name.to_lowercase(),
            display_name: process_name.to_string(),
            category: Category::Uncategorized,
            first_seen: now,
            last_seen: now,
            total_sessions: 0,
            total_minutes_used: 0,
            longest_session: 0,
            custom_time_limit: -1,
            warning_strategy: WarningStrategy::Standard,
            requires_prompt: true,
        }
    }

    pub fn with_category(process_name: &str, category: Category) -> Self {
        let mut app = Self::new(process_name);
        app.set_category(category);
        app
    }

    // ── Core properties ───────────────────────────────────────────────────────

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// User-facing name, falling back to the process name when unset.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.process_name
        } else {
            &self.display_name
        }
    }

    pub fn set_display_name(&mut self, display_name: &str) {
        self.display_name = display_name.to_string();
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;

        // System and utility processes are never prompted for.
        if category == Category::System || category == Category::Utility {
            self.requires_prompt = false;
        }
    }

    // ── Statistics ────────────────────────────────────────────────────────────

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    pub fn total_sessions(&self) -> u32 {
        self.total_sessions
    }

    pub fn total_minutes_used(&self) -> u32 {
        self.total_minutes_used
    }

    pub fn longest_session(&self) -> u32 {
        self.longest_session
    }

    pub fn average_session_length(&self) -> f32 {
        if self.total_sessions == 0 {
            return 0.0;
        }
        self.total_minutes_used as f32 / self.total_sessions as f32
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    pub fn custom_time_limit(&self) -> i32 {
        self.custom_time_limit
    }

    pub fn set_custom_time_limit(&mut self, minutes: i32) {
        self.custom_time_limit = minutes;
    }

    pub fn warning_strategy(&self) -> WarningStrategy {
        self.warning_strategy
    }

    pub fn set_warning_strategy(&mut self, strategy: WarningStrategy) {
        self.warning_strategy = strategy;
    }

    pub fn requires_prompt(&self) -> bool {
        self.requires_prompt
    }

    // ── Business rules ────────────────────────────────────────────────────────

    pub fn should_prompt_for_time(&self) -> bool {
        if !self.requires_prompt {
            return false;
        }

        // Games and leisure always prompt.
        if self.category == Category::Game || self.category == Category::Leisure {
            return true;
        }

        // Work apps prompt only when a positive custom limit is set.
        if self.category == Category::Work && self.custom_time_limit > 0 {
            return true;
        }

        false
    }

    /// Only game and leisure sessions are ever forcefully terminated.
    pub fn requires_termination(&self) -> bool {
        self.category == Category::Game || self.category == Category::Leisure
    }

    /// Effective session limit in minutes: the custom limit when set and
    /// positive, else the per-category default, else the global default.
    pub fn effective_time_limit(&self, limits: &TimeLimits) -> u32 {
        if self.custom_time_limit > 0 {
            return self.custom_time_limit as u32;
        }
        match self.category {
            Category::Game => limits.game,
            Category::Leisure => limits.leisure,
            _ => limits.fallback,
        }
    }

    pub fn is_frequently_used(&self) -> bool {
        self.total_sessions >= FREQUENT_USE_THRESHOLD
    }

    pub fn is_productivity_app(&self) -> bool {
        matches!(
            self.category,
            Category::Work | Category::Productivity | Category::Educational
        )
    }

    // ── Session tracking ──────────────────────────────────────────────────────

    pub fn record_session_start(&mut self) {
        self.total_sessions += 1;
        self.update_last_seen();
    }

    pub fn record_session_end(&mut self, duration_minutes: u32) {
        self.total_minutes_used += duration_minutes;

        if duration_minutes > self.longest_session {
            self.longest_session = duration_minutes;
        }

        self.update_last_seen();
    }

    pub fn update_last_seen(&mut self) {
        self.last_seen = Utc::now();
    }

    #[cfg(test)]
    pub(crate) fn set_last_seen(&mut self, when: DateTime<Utc>) {
        self.last_seen = when;
    }
}
