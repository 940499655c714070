use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition under which an achievement unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "threshold")]
pub enum Condition {
    LevelReached(u32),
    StreakReached(u32),
}

/// Catalog entry. The catalog ships with the engine; only the join rows
/// live in the backend.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Achievement {
    pub achievement_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub experience_reward: u32,
    pub condition: Condition,
}

/// The built-in catalog.
pub static CATALOG: [Achievement; 4] = [
    Achievement {
        achievement_id: "level_5",
        name: "Rising Star",
        description: "Reach level 5",
        experience_reward: 50,
        condition: Condition::LevelReached(5),
    },
    Achievement {
        achievement_id: "level_10",
        name: "Seasoned Pro",
        description: "Reach level 10",
        experience_reward: 150,
        condition: Condition::LevelReached(10),
    },
    Achievement {
        achievement_id: "first_week",
        name: "First Week",
        description: "Check in 7 days in a row",
        experience_reward: 75,
        condition: Condition::StreakReached(7),
    },
    Achievement {
        achievement_id: "perfectionist",
        name: "Perfectionist",
        description: "Check in 30 days in a row",
        experience_reward: 300,
        condition: Condition::StreakReached(30),
    },
];

/// Look up a catalog entry by id.
pub fn by_id(achievement_id: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.achievement_id == achievement_id)
}

/// Join row persisted per unlock. At most one per (user, achievement);
/// the data layer enforces the uniqueness.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}
