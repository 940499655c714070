//! Consecutive-day streak rules.
//!
//! Day comparison is by calendar date, not a rolling 24-hour window: a
//! check-in at 23:50 followed by one at 00:10 counts as the next day.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub const ON_FIRE_STREAK: u32 = 3;
pub const BLAZING_STREAK: u32 = 7;
pub const LEGENDARY_STREAK: u32 = 30;

/// Streak band shown as a badge. Bands are inclusive and cumulative:
/// legendary implies blazing implies on-fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTier {
    None,
    OnFire,
    Blazing,
    Legendary,
}

pub fn tier(streak: u32) -> StreakTier {
    if streak >= LEGENDARY_STREAK {
        StreakTier::Legendary
    } else if streak >= BLAZING_STREAK {
        StreakTier::Blazing
    } else if streak >= ON_FIRE_STREAK {
        StreakTier::OnFire
    } else {
        StreakTier::None
    }
}

impl StreakTier {
    pub fn on_fire(self) -> bool {
        !matches!(self, StreakTier::None)
    }

    pub fn blazing(self) -> bool {
        matches!(self, StreakTier::Blazing | StreakTier::Legendary)
    }

    pub fn legendary(self) -> bool {
        matches!(self, StreakTier::Legendary)
    }
}

/// How a check-in moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First recorded check-in.
    Started,
    /// Checked in on the day after the previous check-in.
    Extended,
    /// Missed at least one day.
    Reset,
    /// Second check-in on the same calendar day; the streak must not
    /// inflate.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: u32,
    pub change: StreakChange,
}

/// Next streak value for a check-in at `now`.
pub fn advance(
    prev_check_in: Option<DateTime<Utc>>,
    streak: u32,
    now: DateTime<Utc>,
) -> StreakUpdate {
    let Some(prev) = prev_check_in else {
        return StreakUpdate {
            streak: 1,
            change: StreakChange::Started,
        };
    };
    let days = (now.date_naive() - prev.date_naive()).num_days();
    match days {
        0 => StreakUpdate {
            streak,
            change: StreakChange::Unchanged,
        },
        1 => StreakUpdate {
            streak: streak + 1,
            change: StreakChange::Extended,
        },
        // Gap, or a check-in timestamp from the future (clock skew):
        // start over either way
        _ => StreakUpdate {
            streak: 1,
            change: StreakChange::Reset,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn first_check_in_starts_at_one() {
        let update = advance(None, 0, at(1, 9));
        assert_eq!(update.streak, 1);
        assert_eq!(update.change, StreakChange::Started);
    }

    #[test]
    fn next_day_extends_by_exactly_one() {
        let update = advance(Some(at(1, 9)), 4, at(2, 7));
        assert_eq!(update.streak, 5);
        assert_eq!(update.change, StreakChange::Extended);
    }

    #[test]
    fn calendar_day_not_rolling_window() {
        // 23:00 -> 01:00 next day is under 24h but still a new day
        let prev = Utc.with_ymd_and_hms(2024, 5, 1, 23, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 1, 0, 0).unwrap();
        assert_eq!(advance(Some(prev), 2, now).streak, 3);
    }

    #[test]
    fn gap_resets_to_one() {
        let update = advance(Some(at(1, 9)), 12, at(4, 9));
        assert_eq!(update.streak, 1);
        assert_eq!(update.change, StreakChange::Reset);
    }

    #[test]
    fn same_day_double_check_in_leaves_streak_alone() {
        let update = advance(Some(at(1, 7)), 6, at(1, 19));
        assert_eq!(update.streak, 6);
        assert_eq!(update.change, StreakChange::Unchanged);
    }

    #[test]
    fn tiers_are_cumulative() {
        assert_eq!(tier(2), StreakTier::None);
        assert_eq!(tier(3), StreakTier::OnFire);
        assert_eq!(tier(7), StreakTier::Blazing);
        assert_eq!(tier(30), StreakTier::Legendary);
        assert!(tier(30).blazing() && tier(30).on_fire());
        assert!(tier(7).on_fire() && !tier(7).legendary());
    }
}
