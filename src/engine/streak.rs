//! Login-streak evaluation
//!
//! Day boundaries are UTC calendar dates: logging in again on the same
//! date is a no-op, the next date extends the streak, and any longer gap
//! breaks it (which also resets the farming multiplier to its base).
//! Streak rewards follow the configured mode: a milestone every N
//! consecutive days, or flat points per streak day.

use bson::DateTime as BsonDateTime;
use chrono::{DateTime, Utc};

use crate::config::{RewardConfig, StreakRewardMode};
use crate::db::schemas::UserAccountDoc;

/// Result of a login-streak evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoginOutcome {
    /// Streak count after the evaluation (0 right after a milestone)
    pub streak: i32,
    /// Points credited to the balance by this login
    pub points_earned: f64,
    /// Whether a streak milestone fired
    pub milestone_reached: bool,
    /// Farming multiplier after the evaluation
    pub farming_multiplier: f64,
    /// True when this was a same-day repeat login (account unchanged)
    pub already_logged_today: bool,
}

/// Advance the login streak for a login at `now`.
///
/// Same-day repeats leave the account untouched, including
/// `last_login_at`. Every other branch stamps `last_login_at = now`.
pub fn evaluate_login(
    account: &mut UserAccountDoc,
    now: DateTime<Utc>,
    config: &RewardConfig,
) -> LoginOutcome {
    match account.last_login_at {
        None => {
            account.login_streak_count = 1;
        }
        Some(last_login) => {
            let days_diff =
                (now.date_naive() - last_login.to_chrono().date_naive()).num_days();

            if days_diff == 0 {
                return LoginOutcome {
                    streak: account.login_streak_count,
                    points_earned: 0.0,
                    milestone_reached: false,
                    farming_multiplier: account.farming_multiplier,
                    already_logged_today: true,
                };
            } else if days_diff == 1 {
                account.login_streak_count += 1;
            } else {
                // Missed at least one day: streak and multiplier both reset
                account.login_streak_count = 1;
                account.farming_multiplier = config.farming_base_multiplier;
            }
        }
    }

    let mut points_earned = 0.0;
    let mut milestone_reached = false;

    match config.streak_reward_mode {
        StreakRewardMode::Milestone => {
            if account.login_streak_count >= config.streak_milestone_days {
                account.reward_balance += config.streak_milestone_bonus;
                account.farming_multiplier += config.farming_multiplier_step;
                points_earned = config.streak_milestone_bonus;
                milestone_reached = true;
                // Next qualifying login starts a fresh day-1
                account.login_streak_count = 0;
            }
        }
        StreakRewardMode::PointsPerDay => {
            if account.login_streak_count <= config.max_streak_days {
                points_earned =
                    account.login_streak_count as f64 * config.points_per_streak_day;
                account.reward_balance += points_earned;
            }
        }
    }

    account.last_login_at = Some(BsonDateTime::from_chrono(now));

    LoginOutcome {
        streak: account.login_streak_count,
        points_earned,
        milestone_reached,
        farming_multiplier: account.farming_multiplier,
        already_logged_today: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn account() -> UserAccountDoc {
        UserAccountDoc::new(
            "12345".to_string(),
            "Ada".to_string(),
            String::new(),
            None,
            1.0,
        )
    }

    fn config() -> RewardConfig {
        RewardConfig::default()
    }

    fn at_noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_first_login_starts_streak() {
        let mut account = account();
        let outcome = evaluate_login(&mut account, at_noon(2024, 3, 1), &config());

        assert_eq!(outcome.streak, 1);
        assert!(!outcome.already_logged_today);
        assert!(account.last_login_at.is_some());
    }

    #[test]
    fn test_same_day_login_is_noop() {
        let mut account = account();
        let morning = at_noon(2024, 3, 1);
        evaluate_login(&mut account, morning, &config());
        let stamped = account.last_login_at;

        // Later the same calendar day, even close to midnight
        let evening = morning + Duration::hours(11);
        let outcome = evaluate_login(&mut account, evening, &config());

        assert!(outcome.already_logged_today);
        assert_eq!(outcome.streak, 1);
        assert_eq!(account.last_login_at, stamped);
    }

    #[test]
    fn test_next_day_increments_streak() {
        let mut account = account();
        evaluate_login(&mut account, at_noon(2024, 3, 1), &config());
        let outcome = evaluate_login(&mut account, at_noon(2024, 3, 2), &config());

        assert_eq!(outcome.streak, 2);
        assert!(!outcome.milestone_reached);
    }

    #[test]
    fn test_calendar_boundary_counts_as_next_day() {
        let mut account = account();
        // 23:50 on the 1st, then 00:10 on the 2nd: different dates, +1 day
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 50, 0).unwrap();
        evaluate_login(&mut account, late, &config());

        let early = Utc.with_ymd_and_hms(2024, 3, 2, 0, 10, 0).unwrap();
        let outcome = evaluate_login(&mut account, early, &config());
        assert_eq!(outcome.streak, 2);
    }

    #[test]
    fn test_missed_day_resets_streak_and_multiplier() {
        let mut account = account();
        account.farming_multiplier = 2.5;
        evaluate_login(&mut account, at_noon(2024, 3, 1), &config());
        evaluate_login(&mut account, at_noon(2024, 3, 2), &config());

        let outcome = evaluate_login(&mut account, at_noon(2024, 3, 5), &config());
        assert_eq!(outcome.streak, 1);
        assert_eq!(account.farming_multiplier, 1.0);
    }

    #[test]
    fn test_milestone_fires_on_seventh_day() {
        let mut account = account();
        account.login_streak_count = 6;
        account.last_login_at = Some(BsonDateTime::from_chrono(at_noon(2024, 3, 6)));

        let outcome = evaluate_login(&mut account, at_noon(2024, 3, 7), &config());

        assert!(outcome.milestone_reached);
        assert_eq!(outcome.points_earned, 50.0);
        assert_eq!(account.reward_balance, 50.0);
        assert_eq!(account.farming_multiplier, 1.5);
        // Streak resets after the milestone
        assert_eq!(outcome.streak, 0);
        assert_eq!(account.login_streak_count, 0);
    }

    #[test]
    fn test_points_per_day_mode_awards_linear_points() {
        let mut config = config();
        config.streak_reward_mode = StreakRewardMode::PointsPerDay;

        let mut account = account();
        evaluate_login(&mut account, at_noon(2024, 3, 1), &config);
        assert_eq!(account.reward_balance, 10.0); // 1 * 10

        let outcome = evaluate_login(&mut account, at_noon(2024, 3, 2), &config);
        assert_eq!(outcome.points_earned, 20.0); // 2 * 10
        assert_eq!(account.reward_balance, 30.0);
    }

    #[test]
    fn test_points_per_day_mode_caps_at_max_streak() {
        let mut config = config();
        config.streak_reward_mode = StreakRewardMode::PointsPerDay;
        config.max_streak_days = 3;

        let mut account = account();
        account.login_streak_count = 3;
        account.last_login_at = Some(BsonDateTime::from_chrono(at_noon(2024, 3, 3)));

        let outcome = evaluate_login(&mut account, at_noon(2024, 3, 4), &config);
        assert_eq!(outcome.streak, 4);
        assert_eq!(outcome.points_earned, 0.0);
        assert_eq!(account.reward_balance, 0.0);
    }
}
