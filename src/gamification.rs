use crate::achievements::{AchievementStatus, Catalog};
use crate::config::{Config, RewardTable};
use crate::error::{ProgressError, Result};
use crate::notify::{Notification, Notifier};
use crate::reducer::{self, Effect, Event, Transition};
use crate::state::{level_for_experience, level_name, rank_title, ProgressionState};
use crate::store::{KeyValueStore, DEFAULT_STORAGE_KEY};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;

/// Largest XP amount accepted in a single award.
pub const MAX_AWARD: i64 = 1_000_000;

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct AwardOutcome {
    pub points_earned: u64,
    pub achievement_points: u64,
    pub levels_gained: u32,
    pub level: u32,
    pub new_achievements: Vec<String>,
}

impl AwardOutcome {
    fn from_transition(points_earned: u64, transition: &Transition) -> Self {
        Self {
            points_earned,
            achievement_points: transition.achievement_points(),
            levels_gained: transition.levels_reached().len() as u32,
            level: transition.state.level,
            new_achievements: transition.unlocked(),
        }
    }

    fn merge(mut self, other: AwardOutcome) -> Self {
        self.points_earned += other.points_earned;
        self.achievement_points += other.achievement_points;
        self.levels_gained += other.levels_gained;
        self.level = other.level;
        self.new_achievements.extend(other.new_achievements);
        self
    }

    pub fn level_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Everything a progress widget needs to render.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub level: u32,
    pub level_name: String,
    pub rank: String,
    pub experience: u64,
    pub next_level_at: u64,
    pub level_progress_percent: u8,
    pub total_score: u64,
    pub streak: u32,
    pub subjects: BTreeMap<String, u8>,
    pub achievements_unlocked: usize,
    pub achievements_total: usize,
}

/// Owns one user's [`ProgressionState`] and is the only thing allowed to change it.
///
/// Every mutation goes through the reducer, then the resulting effects are
/// applied in order: persist to the store, then notifications. Store failures are
/// logged and never roll back the in-memory state.
pub struct ProgressionEngine<S: KeyValueStore> {
    state: ProgressionState,
    store: S,
    notifier: Box<dyn Notifier>,
    catalog: Catalog,
    storage_key: String,
    rewards: RewardTable,
    subject_target: u64,
}

impl<S: KeyValueStore> ProgressionEngine<S> {
    pub fn new(store: S, notifier: Box<dyn Notifier>) -> Self {
        let mut engine = Self {
            state: ProgressionState::default(),
            store,
            notifier,
            catalog: Catalog::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            rewards: RewardTable::default(),
            subject_target: 100,
        };
        engine.load();
        engine
    }

    pub fn from_config(store: S, notifier: Box<dyn Notifier>, config: &Config) -> Self {
        let mut engine = Self {
            state: ProgressionState::default(),
            store,
            notifier,
            catalog: Catalog::default(),
            storage_key: config.storage_key.clone(),
            rewards: config.rewards,
            subject_target: config.subject_target,
        };
        engine.load();
        engine
    }

    /// Replaces the in-memory state with what the store holds. Missing or
    /// unreadable data gives a fresh default state.
    pub fn load(&mut self) {
        self.state = match self.store.get(&self.storage_key) {
            Ok(Some(payload)) => match serde_json::from_str::<ProgressionState>(&payload) {
                Ok(state) => self.sanitize(state),
                Err(e) => {
                    tracing::warn!("Discarding unreadable progress data: {}", e);
                    ProgressionState::default()
                }
            },
            Ok(None) => {
                tracing::debug!("No saved progress under '{}'", self.storage_key);
                ProgressionState::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read progress data: {}", e);
                ProgressionState::default()
            }
        };
    }

    pub fn save(&mut self) {
        let payload = match serde_json::to_string(&self.state) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize progress: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, &payload) {
            tracing::warn!("Failed to save progress, keeping in-memory state: {}", e);
        }
    }

    pub fn award_experience(&mut self, amount: i64, subject: Option<&str>) -> Result<AwardOutcome> {
        if amount < 0 {
            return Err(ProgressError::InvalidAmount(format!("{} is negative", amount)));
        }
        if amount > MAX_AWARD {
            return Err(ProgressError::InvalidAmount(format!(
                "{} exceeds the maximum of {}",
                amount, MAX_AWARD
            )));
        }
        Ok(self.award(amount as u64, subject))
    }

    pub fn record_streak_day(&mut self, consecutive_days: u32) -> AwardOutcome {
        let transition = self.apply(Event::RecordStreak {
            days: consecutive_days,
        });
        AwardOutcome::from_transition(0, &transition)
    }

    pub fn reset(&mut self) {
        self.apply(Event::Reset);
    }

    /// A practice task was answered. Correct answers pay the base reward to the
    /// task's subject, plus the fast-answer bonus when answered in time.
    pub fn on_task_answered(&mut self, subject: &str, correct: bool, seconds: Option<u64>) -> AwardOutcome {
        if !correct {
            return self.award(0, None);
        }
        let mut outcome = self.award(self.rewards.correct_answer, Some(subject));
        if seconds.is_some_and(|s| s < self.rewards.fast_answer_seconds) {
            let bonus = self.award(self.rewards.fast_answer_bonus, Some(subject));
            outcome = outcome.merge(bonus);
        }
        outcome
    }

    pub fn on_ai_question(&mut self) -> AwardOutcome {
        self.award(self.rewards.ai_question, None)
    }

    pub fn on_active_day(&mut self, consecutive_days: u32) -> AwardOutcome {
        self.record_streak_day(consecutive_days)
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn level(&self) -> u32 {
        self.state.level
    }

    pub fn experience(&self) -> u64 {
        self.state.experience
    }

    pub fn total_score(&self) -> u64 {
        self.state.total_score
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn subject_target(&self) -> u64 {
        self.subject_target
    }

    /// `min(100, floor(progress / target * 100))`; 0 for unknown subjects or a zero target.
    pub fn subject_progress_percent(&self, subject: &str, target: u64) -> u8 {
        if target == 0 {
            return 0;
        }
        let progress = u128::from(self.state.subject_progress(subject));
        ((progress * 100) / u128::from(target)).min(100) as u8
    }

    pub fn achievement_statuses(&self) -> Vec<AchievementStatus> {
        self.catalog.statuses(&self.state)
    }

    pub fn summary(&self) -> ProgressSummary {
        let subjects = self
            .state
            .subjects
            .keys()
            .map(|name| {
                (
                    name.clone(),
                    self.subject_progress_percent(name, self.subject_target),
                )
            })
            .collect();

        ProgressSummary {
            level: self.state.level,
            level_name: level_name(self.state.level),
            rank: rank_title(self.state.level).to_string(),
            experience: self.state.experience,
            next_level_at: self.state.next_threshold(),
            level_progress_percent: self.state.level_progress_percent(),
            total_score: self.state.total_score,
            streak: self.state.streak,
            subjects,
            achievements_unlocked: self.state.achievements.len(),
            achievements_total: self.catalog.entries().len(),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }

    /// Replaces the current progress with a previously exported payload.
    pub fn import_json(&mut self, payload: &str) -> Result<()> {
        let state: ProgressionState = serde_json::from_str(payload)?;
        self.state = self.sanitize(state);
        self.save();
        tracing::info!(level = self.state.level, "Imported progress");
        self.notifier.notify(&Notification::imported());
        Ok(())
    }

    fn award(&mut self, amount: u64, subject: Option<&str>) -> AwardOutcome {
        let transition = self.apply(Event::AwardXp {
            amount,
            subject: subject.map(str::to_string),
        });
        AwardOutcome::from_transition(amount, &transition)
    }

    fn apply(&mut self, event: Event) -> Transition {
        tracing::debug!(?event, "Applying progression event");
        let mut transition = reducer::reduce(&self.state, &event, &self.catalog);
        if event != Event::Reset {
            transition.state.last_activity = Some(Utc::now());
        }
        self.state = transition.state.clone();

        for effect in &transition.effects {
            self.run_effect(effect);
        }
        transition
    }

    fn run_effect(&mut self, effect: &Effect) {
        match effect {
            Effect::Persist => self.save(),
            Effect::ClearStore => {
                if let Err(e) = self.store.remove(&self.storage_key) {
                    tracing::warn!("Failed to clear saved progress: {}", e);
                }
                tracing::info!("Progress reset");
            }
            Effect::NotifyXp { amount } => {
                self.notifier.notify(&Notification::xp_gained(*amount));
            }
            Effect::NotifyLevelUp { level } => {
                tracing::info!(level, "Level up");
                self.notifier.notify(&Notification::level_up(*level));
            }
            Effect::NotifyAchievement { id, title, reward } => {
                tracing::info!(achievement = %id, reward, "Achievement unlocked");
                self.notifier.notify(&Notification::achievement(title));
            }
            Effect::NotifyReset => self.notifier.notify(&Notification::reset()),
        }
    }

    // Stored data may come from older widget versions: lift the level to what the
    // experience already covers and drop achievement ids the catalog no longer knows.
    fn sanitize(&self, mut state: ProgressionState) -> ProgressionState {
        state.level = state.level.max(level_for_experience(state.experience));
        let mut seen = Vec::with_capacity(state.achievements.len());
        state.achievements.retain(|id| {
            if !self.catalog.contains(id) || seen.contains(id) {
                tracing::debug!(achievement = %id, "Dropping stored achievement");
                return false;
            }
            seen.push(id.clone());
            true
        });
        state
    }
}

/// Reads an XP amount from loosely typed input such as a JSON request body.
pub fn parse_amount(value: &serde_json::Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| ProgressError::InvalidAmount(format!("{} is not an integer", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotificationKind, RecordingNotifier};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn engine() -> (ProgressionEngine<MemoryStore>, RecordingNotifier) {
        let recorder = RecordingNotifier::new();
        let engine = ProgressionEngine::new(MemoryStore::new(), Box::new(recorder.clone()));
        (engine, recorder)
    }

    #[test]
    fn test_on_task_answered_fast_bonus() {
        let (mut engine, _) = engine();
        let outcome = engine.on_task_answered("Математика", true, Some(12));
        assert_eq!(outcome.points_earned, 30);
        assert_eq!(engine.state().subject_progress("Математика"), 30);

        let slow = engine.on_task_answered("Математика", true, Some(45));
        assert_eq!(slow.points_earned, 20);
        assert_eq!(engine.state().subject_progress("Математика"), 50);
    }

    #[test]
    fn test_wrong_answer_awards_nothing() {
        let (mut engine, recorder) = engine();
        let outcome = engine.on_task_answered("Физика", false, Some(5));
        assert_eq!(outcome.points_earned, 0);
        assert_eq!(engine.total_score(), 0);
        assert!(engine.state().subjects.is_empty());
        assert!(recorder.sent().is_empty());
    }

    #[test]
    fn test_ai_question_reward() {
        let (mut engine, recorder) = engine();
        engine.on_ai_question();
        assert_eq!(engine.experience(), 5);
        assert_eq!(recorder.sent()[0].kind, NotificationKind::Xp);
    }

    #[test]
    fn test_outcome_merge_keeps_final_level() {
        let (mut engine, _) = engine();
        engine.award_experience(85, None).unwrap();
        // 85 + first_task's 10 = 95; 20 base reaches 115 -> level 2, bonus adds another 10
        let outcome = engine.on_task_answered("Химия", true, Some(1));
        assert_eq!(outcome.levels_gained, 1);
        assert_eq!(outcome.level, 2);
        assert!(outcome.level_up());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(15)).unwrap(), 15);
        assert_eq!(parse_amount(&json!(-3)).unwrap(), -3);
        assert!(matches!(parse_amount(&json!("ten")), Err(ProgressError::InvalidAmount(_))));
        assert!(matches!(parse_amount(&json!(2.5)), Err(ProgressError::InvalidAmount(_))));
        assert!(matches!(parse_amount(&json!(null)), Err(ProgressError::InvalidAmount(_))));
    }

    #[test]
    fn test_award_above_maximum_rejected() {
        let (mut engine, _) = engine();
        let err = engine.award_experience(MAX_AWARD + 1, None).unwrap_err();
        assert!(matches!(err, ProgressError::InvalidAmount(_)));
        assert_eq!(engine.total_score(), 0);
    }

    #[test]
    fn test_sanitize_drops_unknown_achievements() {
        let mut store = MemoryStore::new();
        store
            .set(
                DEFAULT_STORAGE_KEY,
                r#"{"level":0,"achievements":["first_task","master_100","first_task"]}"#,
            )
            .unwrap();
        let engine = ProgressionEngine::new(store, Box::new(RecordingNotifier::new()));
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.state().achievements, vec!["first_task".to_string()]);
    }

    #[test]
    fn test_loaded_level_is_settled() {
        let mut store = MemoryStore::new();
        store
            .set(DEFAULT_STORAGE_KEY, r#"{"level":1,"experience":420}"#)
            .unwrap();
        let engine = ProgressionEngine::new(store, Box::new(RecordingNotifier::new()));
        assert_eq!(engine.level(), 5);
    }

    #[test]
    fn test_summary() {
        let (mut engine, _) = engine();
        engine.award_experience(200, Some("Математика")).unwrap();
        // 200 + first_task (10) + subject_master (50) = 260
        let summary = engine.summary();
        assert_eq!(summary.experience, 260);
        assert_eq!(summary.level, 3);
        assert_eq!(summary.level_name, "Студент");
        assert_eq!(summary.rank, "Средний");
        assert_eq!(summary.next_level_at, 300);
        assert_eq!(summary.level_progress_percent, 60);
        assert_eq!(summary.subjects.get("Математика"), Some(&100));
        assert_eq!(summary.achievements_unlocked, 2);
        assert_eq!(summary.achievements_total, 5);
    }
}
