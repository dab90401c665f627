//! Pure progression step: `(state, event) -> (state', effects)`.
//!
//! Nothing here touches storage or notification sinks. The engine applies the
//! returned effects afterwards, which keeps every rule testable headless.

use crate::achievements::Catalog;
use crate::state::ProgressionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AwardXp { amount: u64, subject: Option<String> },
    RecordStreak { days: u32 },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Persist,
    ClearStore,
    NotifyXp { amount: u64 },
    NotifyLevelUp { level: u32 },
    NotifyAchievement { id: String, title: String, reward: u64 },
    NotifyReset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ProgressionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn levels_reached(&self) -> Vec<u32> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::NotifyLevelUp { level } => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn unlocked(&self) -> Vec<String> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::NotifyAchievement { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn achievement_points(&self) -> u64 {
        self.effects
            .iter()
            .map(|e| match e {
                Effect::NotifyAchievement { reward, .. } => *reward,
                _ => 0,
            })
            .sum()
    }
}

pub fn reduce(state: &ProgressionState, event: &Event, catalog: &Catalog) -> Transition {
    match event {
        Event::AwardXp { amount, subject } => {
            let mut next = state.clone();
            next.experience = next.experience.saturating_add(*amount);
            next.total_score = next.total_score.saturating_add(*amount);
            if let Some(subject) = subject {
                let progress = next.subjects.entry(subject.clone()).or_insert(0);
                *progress = progress.saturating_add(*amount);
            }

            let mut effects = vec![Effect::Persist];
            if *amount > 0 {
                effects.push(Effect::NotifyXp { amount: *amount });
            }
            settle(next, effects, catalog)
        }
        Event::RecordStreak { days } => {
            let mut next = state.clone();
            next.streak = *days;
            settle(next, vec![Effect::Persist], catalog)
        }
        Event::Reset => Transition {
            state: ProgressionState::default(),
            effects: vec![Effect::ClearStore, Effect::NotifyReset],
        },
    }
}

// One settle pass: level check, achievement check, then a single extra level
// check if achievements paid out. Rewards count as XP without a subject;
// achievements they make eligible wait for the next event.
fn settle(mut state: ProgressionState, mut effects: Vec<Effect>, catalog: &Catalog) -> Transition {
    let mut levels = state.settle_level();

    let unlocked = catalog.newly_eligible(&state);
    let mut bonus = 0u64;
    for achievement in &unlocked {
        state.achievements.push(achievement.id.to_string());
        bonus = bonus.saturating_add(achievement.reward);
    }
    if bonus > 0 {
        state.experience = state.experience.saturating_add(bonus);
        state.total_score = state.total_score.saturating_add(bonus);
        levels.extend(state.settle_level());
    }

    effects.extend(levels.into_iter().map(|level| Effect::NotifyLevelUp { level }));
    effects.extend(unlocked.into_iter().map(|a| Effect::NotifyAchievement {
        id: a.id.to_string(),
        title: a.title.to_string(),
        reward: a.reward,
    }));

    Transition { state, effects }
}
