use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// XP needed per level step. Reaching level `n + 1` requires `n * XP_PER_LEVEL` experience.
pub const XP_PER_LEVEL: u64 = 100;

/// Persisted progression of a single user.
///
/// Field names on the wire match what the browser widgets stored in local storage,
/// so payloads written by older clients keep loading: `totalPoints` is read as
/// `totalScore`, and per-subject `{ "experience": N, "topics": [...] }` records are
/// read as plain counters. Missing fields take their default values and unknown
/// ones are ignored.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressionState {
    pub level: u32,
    pub experience: u64,
    #[serde(alias = "totalPoints")]
    pub total_score: u64,
    #[serde(deserialize_with = "deserialize_subjects")]
    pub subjects: HashMap<String, u64>,
    pub achievements: Vec<String>,
    pub streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            total_score: 0,
            subjects: HashMap::new(),
            achievements: Vec::new(),
            streak: 0,
            last_activity: None,
        }
    }
}

impl ProgressionState {
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }

    pub fn subject_progress(&self, subject: &str) -> u64 {
        self.subjects.get(subject).copied().unwrap_or(0)
    }

    /// Experience required to leave the current level.
    pub fn next_threshold(&self) -> u64 {
        level_threshold(self.level)
    }

    /// How far the user is between the previous threshold and the next one, 0..=100.
    pub fn level_progress_percent(&self) -> u8 {
        let floor = level_threshold(self.level.saturating_sub(1));
        let ceiling = self.next_threshold();
        if ceiling <= floor {
            return 0;
        }
        let gained = self.experience.saturating_sub(floor);
        (gained.saturating_mul(100) / (ceiling - floor)).min(100) as u8
    }

    /// Raises `level` while experience covers the current threshold. Returns the levels reached.
    pub(crate) fn settle_level(&mut self) -> Vec<u32> {
        let mut reached = Vec::new();
        while self.level < u32::MAX && self.experience >= self.next_threshold() {
            self.level += 1;
            reached.push(self.level);
        }
        reached
    }
}

fn deserialize_subjects<'de, D>(deserializer: D) -> Result<HashMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SubjectValue {
        Counter(u64),
        Record {
            #[serde(default)]
            experience: u64,
        },
    }

    let raw = HashMap::<String, SubjectValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let progress = match value {
                SubjectValue::Counter(n) => n,
                SubjectValue::Record { experience } => experience,
            };
            (name, progress)
        })
        .collect())
}

pub fn level_threshold(level: u32) -> u64 {
    u64::from(level) * XP_PER_LEVEL
}

/// Level a given amount of experience settles at from level 1.
pub fn level_for_experience(experience: u64) -> u32 {
    u32::try_from(experience / XP_PER_LEVEL + 1).unwrap_or(u32::MAX)
}

pub fn level_name(level: u32) -> String {
    let name = match level {
        1 => "Новичок",
        2 => "Ученик",
        3 => "Студент",
        4 => "Знаток",
        5 => "Опытный ученик",
        6 => "Специалист",
        7 => "Мастер",
        8 => "Эксперт",
        9 => "Гуру",
        10 => "Легенда",
        _ => return format!("Уровень {}", level),
    };
    name.to_string()
}

pub fn rank_title(level: u32) -> &'static str {
    if level >= 8 {
        "Эксперт"
    } else if level >= 5 {
        "Продвинутый"
    } else if level >= 3 {
        "Средний"
    } else {
        "Начинающий"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = ProgressionState::default();
        assert_eq!(state.level, 1);
        assert_eq!(state.experience, 0);
        assert_eq!(state.total_score, 0);
        assert!(state.subjects.is_empty());
        assert!(state.achievements.is_empty());
        assert_eq!(state.streak, 0);
    }

    #[test]
    fn test_settle_level_handles_multi_level_jumps() {
        let mut state = ProgressionState {
            experience: 250,
            ..Default::default()
        };
        assert_eq!(state.settle_level(), vec![2, 3]);
        assert_eq!(state.level, 3);
        assert_eq!(state.experience, 250);
    }

    #[test]
    fn test_level_for_experience() {
        assert_eq!(level_for_experience(0), 1);
        assert_eq!(level_for_experience(99), 1);
        assert_eq!(level_for_experience(100), 2);
        assert_eq!(level_for_experience(250), 3);
    }

    #[test]
    fn test_level_progress_percent() {
        let state = ProgressionState {
            level: 3,
            experience: 250,
            ..Default::default()
        };
        assert_eq!(state.level_progress_percent(), 50);

        let fresh = ProgressionState::default();
        assert_eq!(fresh.level_progress_percent(), 0);
    }

    #[test]
    fn test_partial_payload_uses_defaults() {
        let state: ProgressionState =
            serde_json::from_str(r#"{"level": 4, "totalScore": 900, "dailyChallenges": []}"#).unwrap();
        assert_eq!(state.level, 4);
        assert_eq!(state.total_score, 900);
        assert_eq!(state.experience, 0);
        assert!(state.subjects.is_empty());
        assert_eq!(state.streak, 0);
    }

    #[test]
    fn test_widget_payload_loads() {
        let payload = r#"{
            "level": 3,
            "experience": 250,
            "totalPoints": 260,
            "subjects": {
                "Математика": {"experience": 30, "topics": []},
                "Физика": 12
            },
            "achievements": ["first_task"],
            "dailyChallenges": [],
            "lastLogin": "2024-01-01T00:00:00.000Z",
            "streak": 4
        }"#;
        let state: ProgressionState = serde_json::from_str(payload).unwrap();
        assert_eq!(state.level, 3);
        assert_eq!(state.experience, 250);
        assert_eq!(state.total_score, 260);
        assert_eq!(state.subject_progress("Математика"), 30);
        assert_eq!(state.subject_progress("Физика"), 12);
        assert_eq!(state.achievements, vec!["first_task".to_string()]);
        assert_eq!(state.streak, 4);
    }

    #[test]
    fn test_wire_field_names() {
        let json = serde_json::to_value(ProgressionState::default()).unwrap();
        let obj = json.as_object().unwrap();
        for field in ["level", "experience", "totalScore", "subjects", "achievements", "streak"] {
            assert!(obj.contains_key(field), "missing {}", field);
        }
        assert!(!obj.contains_key("lastActivity"));
    }

    #[test]
    fn test_level_titles() {
        assert_eq!(level_name(1), "Новичок");
        assert_eq!(level_name(10), "Легенда");
        assert_eq!(level_name(12), "Уровень 12");
        assert_eq!(rank_title(1), "Начинающий");
        assert_eq!(rank_title(3), "Средний");
        assert_eq!(rank_title(6), "Продвинутый");
        assert_eq!(rank_title(9), "Эксперт");
    }
}
