//! Achievement catalog.
//!
//! Every achievement is a row of data: an id, display text, an XP reward and a
//! condition over [`ProgressionState`]. The catalog order is the evaluation order,
//! so simultaneous unlocks are always reported in the same sequence.

use crate::state::ProgressionState;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementCondition {
    TotalScore(u64),
    AnySubjectProgress(u64),
    Streak(u32),
    Level(u32),
}

impl AchievementCondition {
    pub fn is_met(&self, state: &ProgressionState) -> bool {
        match *self {
            AchievementCondition::TotalScore(target) => state.total_score >= target,
            AchievementCondition::AnySubjectProgress(target) => {
                state.subjects.values().any(|&progress| progress >= target)
            }
            AchievementCondition::Streak(target) => state.streak >= target,
            AchievementCondition::Level(target) => state.level >= target,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub reward: u64,
    pub condition: AchievementCondition,
}

const CATALOG: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: "first_task",
        title: "Первое задание",
        description: "Решите первое задание",
        reward: 10,
        condition: AchievementCondition::TotalScore(10),
    },
    AchievementDefinition {
        id: "subject_master",
        title: "Мастер предмета",
        description: "Наберите 100 очков по одному предмету",
        reward: 50,
        condition: AchievementCondition::AnySubjectProgress(100),
    },
    AchievementDefinition {
        id: "streak_7",
        title: "Неделя обучения",
        description: "Занимайтесь 7 дней подряд",
        reward: 100,
        condition: AchievementCondition::Streak(7),
    },
    AchievementDefinition {
        id: "level_5",
        title: "Опытный ученик",
        description: "Достигните 5 уровня",
        reward: 200,
        condition: AchievementCondition::Level(5),
    },
    AchievementDefinition {
        id: "expert_level_10",
        title: "Эксперт",
        description: "Достигните 10 уровня",
        reward: 300,
        condition: AchievementCondition::Level(10),
    },
];

/// Fixed set of achievements an engine evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    entries: &'static [AchievementDefinition],
}

impl Default for Catalog {
    fn default() -> Self {
        Self { entries: CATALOG }
    }
}

impl Catalog {
    pub fn entries(&self) -> &'static [AchievementDefinition] {
        self.entries
    }

    pub fn find(&self, id: &str) -> Option<&'static AchievementDefinition> {
        self.entries.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Achievements not yet unlocked whose condition holds for `state`, in catalog order.
    pub fn newly_eligible(&self, state: &ProgressionState) -> Vec<&'static AchievementDefinition> {
        self.entries
            .iter()
            .filter(|a| !state.has_achievement(a.id) && a.condition.is_met(state))
            .collect()
    }

    pub fn statuses(&self, state: &ProgressionState) -> Vec<AchievementStatus> {
        self.entries
            .iter()
            .map(|a| AchievementStatus {
                id: a.id.to_string(),
                title: a.title.to_string(),
                description: a.description.to_string(),
                reward: a.reward,
                unlocked: state.has_achievement(a.id),
            })
            .collect()
    }
}

/// Locked/unlocked view of one catalog entry, for achievement grids.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AchievementStatus {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward: u64,
    pub unlocked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_unique() {
        let catalog = Catalog::default();
        let entries = catalog.entries();
        for (i, a) in entries.iter().enumerate() {
            assert!(entries[i + 1..].iter().all(|b| b.id != a.id), "duplicate id {}", a.id);
        }
    }

    #[test]
    fn test_eligibility_follows_catalog_order() {
        let catalog = Catalog::default();
        let state = ProgressionState {
            level: 5,
            total_score: 50,
            streak: 7,
            ..Default::default()
        };
        let ids: Vec<_> = catalog.newly_eligible(&state).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["first_task", "streak_7", "level_5"]);
    }

    #[test]
    fn test_unlocked_achievements_are_not_eligible_again() {
        let catalog = Catalog::default();
        let state = ProgressionState {
            total_score: 10,
            achievements: vec!["first_task".to_string()],
            ..Default::default()
        };
        assert!(catalog.newly_eligible(&state).is_empty());
    }

    #[test]
    fn test_subject_condition() {
        let mut state = ProgressionState::default();
        state.subjects.insert("Математика".to_string(), 99);
        assert!(!AchievementCondition::AnySubjectProgress(100).is_met(&state));
        state.subjects.insert("Физика".to_string(), 100);
        assert!(AchievementCondition::AnySubjectProgress(100).is_met(&state));
    }

    #[test]
    fn test_statuses_mark_unlocked() {
        let catalog = Catalog::default();
        let state = ProgressionState {
            achievements: vec!["streak_7".to_string()],
            ..Default::default()
        };
        let statuses = catalog.statuses(&state);
        assert_eq!(statuses.len(), catalog.entries().len());
        assert!(statuses.iter().find(|s| s.id == "streak_7").unwrap().unlocked);
        assert!(!statuses.iter().find(|s| s.id == "first_task").unwrap().unlocked);
    }
}
