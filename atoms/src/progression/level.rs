//! Level math. Pure functions over cumulative experience.

/// Experience needed per level.
pub const XP_PER_LEVEL: u32 = 100;

pub fn level_for(experience: u32) -> u32 {
    experience / XP_PER_LEVEL
}

/// Experience total at which the next level is reached.
pub fn next_level_threshold(level: u32) -> u32 {
    (level + 1) * XP_PER_LEVEL
}

/// Percent progress through the current level, clamped to 0..=100.
pub fn progress_percent(experience: u32, level: u32) -> u32 {
    let into_level = experience.saturating_sub(level * XP_PER_LEVEL);
    (into_level * 100 / XP_PER_LEVEL).min(100)
}

/// Levels crossed by moving from `prior_level` to `new_level`, in order.
/// An award jumping two levels yields both, so level-gated achievements
/// fire for every level actually crossed.
pub fn levels_crossed(prior_level: u32, new_level: u32) -> Vec<u32> {
    (prior_level + 1..=new_level).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_floor_of_hundreds() {
        assert_eq!(level_for(0), 0);
        assert_eq!(level_for(99), 0);
        assert_eq!(level_for(100), 1);
        assert_eq!(level_for(250), 2);
    }

    #[test]
    fn next_threshold() {
        assert_eq!(next_level_threshold(0), 100);
        assert_eq!(next_level_threshold(4), 500);
    }

    #[test]
    fn progress_clamps() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(250, 2), 50);
        assert_eq!(progress_percent(80, 0), 80);
        // Stale level input cannot push percent past the bounds
        assert_eq!(progress_percent(350, 1), 100);
        assert_eq!(progress_percent(50, 2), 0);
    }

    #[test]
    fn multi_level_awards_report_every_crossing() {
        assert_eq!(levels_crossed(0, 2), vec![1, 2]);
        assert_eq!(levels_crossed(3, 3), Vec::<u32>::new());
    }
}
