pub mod level;
pub mod service;
pub mod streak;

pub use level::{level_for, levels_crossed, next_level_threshold, progress_percent, XP_PER_LEVEL};
pub use service::{add_experience, ExperienceAward};
pub use streak::{advance, tier, StreakChange, StreakTier, StreakUpdate};
