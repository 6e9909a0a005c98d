//! Configuration for Vineyard
//!
//! CLI arguments and environment variable handling using clap. Every
//! reward constant is an explicit parameter here; deployments differ by
//! configuration, never by code forks.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use uuid::Uuid;

/// Vineyard - tap-to-earn rewards gateway for Telegram mini-apps
///
/// "The last will be first, and the first will be last" - Matthew 20:16
#[derive(Parser, Debug, Clone)]
#[command(name = "vineyard")]
#[command(about = "Tap-to-earn rewards gateway for Telegram mini-apps")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "vineyard")]
    pub mongodb_db: String,

    /// Telegram Bot API token (required in production)
    #[arg(long, env = "TELEGRAM_TOKEN")]
    pub telegram_token: Option<String>,

    /// Bot username, used to build t.me referral links
    #[arg(long, env = "BOT_USERNAME", default_value = "VineyardFarmBot")]
    pub bot_username: String,

    /// Base URL of the web mini-app launched from the bot
    #[arg(long, env = "WEBAPP_URL", default_value = "https://app.vineyard.example")]
    pub webapp_url: String,

    /// Enable development mode (bot token optional, HTTP API only)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Which claim variant this deployment runs
    #[arg(long, env = "CLAIM_MODE", value_enum, default_value_t = ClaimMode::Direct)]
    pub claim_mode: ClaimMode,

    /// How login streaks are rewarded
    #[arg(long, env = "STREAK_REWARD_MODE", value_enum, default_value_t = StreakRewardMode::Milestone)]
    pub streak_reward_mode: StreakRewardMode,

    /// Claim cooldown in seconds (60 for test deployments, 28800 = 8h in production)
    #[arg(long, env = "CLAIM_INTERVAL_SECS", default_value = "28800")]
    pub claim_interval_secs: u64,

    /// Cadence of the passive farming accrual sweep in seconds
    #[arg(long, env = "FARMING_TICK_SECS", default_value = "60")]
    pub farming_tick_secs: u64,

    /// Farming multiplier assigned to new accounts
    #[arg(long, env = "FARMING_BASE_MULTIPLIER", default_value = "1.0")]
    pub farming_base_multiplier: f64,

    /// Multiplier increase applied when a streak milestone is reached
    #[arg(long, env = "FARMING_MULTIPLIER_STEP", default_value = "0.5")]
    pub farming_multiplier_step: f64,

    /// Points granted to the referrer when a referred account is created
    #[arg(long, env = "REFERRAL_BONUS", default_value = "100.0")]
    pub referral_bonus: f64,

    /// Consecutive login days required to hit a streak milestone
    #[arg(long, env = "STREAK_MILESTONE_DAYS", default_value = "7")]
    pub streak_milestone_days: i32,

    /// Points granted when a streak milestone is reached
    #[arg(long, env = "STREAK_MILESTONE_BONUS", default_value = "50.0")]
    pub streak_milestone_bonus: f64,

    /// Points per streak day in points-per-day mode
    #[arg(long, env = "POINTS_PER_STREAK_DAY", default_value = "10.0")]
    pub points_per_streak_day: f64,

    /// Streak length beyond which points-per-day mode awards nothing
    #[arg(long, env = "MAX_STREAK_DAYS", default_value = "30")]
    pub max_streak_days: i32,
}

/// Claim variant active for this deployment.
///
/// Exactly one variant is live per deployment; both are supported.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    /// Caller supplies the points to claim in the request body
    Direct,
    /// Claim moves accrued farming points into the balance
    Farming,
}

impl ClaimMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Farming => "farming",
        }
    }
}

/// How login streaks translate into rewards.
///
/// The two modes are mutually exclusive deployment configurations.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakRewardMode {
    /// Milestone bonus + farming multiplier step every N consecutive days
    Milestone,
    /// Award streak * points-per-day on every qualifying login, capped
    PointsPerDay,
}

impl StreakRewardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Milestone => "milestone",
            Self::PointsPerDay => "points-per-day",
        }
    }
}

/// Consolidated reward parameters, the engine-facing view of [`Args`].
///
/// All claim, streak, referral, and farming behavior is driven from here.
#[derive(Debug, Clone)]
pub struct RewardConfig {
    pub claim_mode: ClaimMode,
    pub claim_interval_secs: u64,
    pub streak_reward_mode: StreakRewardMode,
    pub streak_milestone_days: i32,
    pub streak_milestone_bonus: f64,
    pub points_per_streak_day: f64,
    pub max_streak_days: i32,
    pub farming_base_multiplier: f64,
    pub farming_multiplier_step: f64,
    pub referral_bonus: f64,
}

impl RewardConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            claim_mode: args.claim_mode,
            claim_interval_secs: args.claim_interval_secs,
            streak_reward_mode: args.streak_reward_mode,
            streak_milestone_days: args.streak_milestone_days,
            streak_milestone_bonus: args.streak_milestone_bonus,
            points_per_streak_day: args.points_per_streak_day,
            max_streak_days: args.max_streak_days,
            farming_base_multiplier: args.farming_base_multiplier,
            farming_multiplier_step: args.farming_multiplier_step,
            referral_bonus: args.referral_bonus,
        }
    }
}

impl Default for RewardConfig {
    /// Test-deployment defaults (60s claim interval, matching the
    /// original test configuration).
    fn default() -> Self {
        Self {
            claim_mode: ClaimMode::Direct,
            claim_interval_secs: 60,
            streak_reward_mode: StreakRewardMode::Milestone,
            streak_milestone_days: 7,
            streak_milestone_bonus: 50.0,
            points_per_streak_day: 10.0,
            max_streak_days: 30,
            farming_base_multiplier: 1.0,
            farming_multiplier_step: 0.5,
            referral_bonus: 100.0,
        }
    }
}

impl Args {
    /// Launch URL for the web mini-app, with the user id embedded
    pub fn launch_url(&self, external_id: &str) -> String {
        format!(
            "{}/?userId={}",
            self.webapp_url.trim_end_matches('/'),
            external_id
        )
    }

    /// Shareable referral link for an account
    pub fn referral_link(&self, external_id: &str) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, external_id)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.telegram_token.is_none() {
            return Err("TELEGRAM_TOKEN is required in production mode".to_string());
        }

        if self.claim_interval_secs == 0 {
            return Err("CLAIM_INTERVAL_SECS must be greater than zero".to_string());
        }

        if self.farming_tick_secs == 0 {
            return Err("FARMING_TICK_SECS must be greater than zero".to_string());
        }

        if self.farming_base_multiplier < 0.0 || self.farming_multiplier_step < 0.0 {
            return Err("Farming multiplier parameters must not be negative".to_string());
        }

        if self.referral_bonus < 0.0 {
            return Err("REFERRAL_BONUS must not be negative".to_string());
        }

        if self.streak_milestone_days <= 0 {
            return Err("STREAK_MILESTONE_DAYS must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_args() -> Args {
        let mut args = Args::parse_from(["vineyard"]);
        args.dev_mode = true;
        args.telegram_token = None;
        args
    }

    #[test]
    fn test_launch_url_strips_trailing_slash() {
        let mut args = test_args();
        args.webapp_url = "https://app.example.com/".to_string();
        assert_eq!(
            args.launch_url("12345"),
            "https://app.example.com/?userId=12345"
        );
    }

    #[test]
    fn test_referral_link() {
        let args = test_args();
        assert_eq!(
            args.referral_link("999"),
            "https://t.me/VineyardFarmBot?start=999"
        );
    }

    #[test]
    fn test_validate_rejects_zero_claim_interval() {
        let mut args = test_args();
        args.claim_interval_secs = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_requires_token_in_production() {
        let mut args = test_args();
        args.dev_mode = false;
        args.telegram_token = None;
        assert!(args.validate().is_err());

        args.telegram_token = Some("123:abc".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_reward_config_from_args() {
        let args = test_args();
        let config = RewardConfig::from_args(&args);
        assert_eq!(config.claim_interval_secs, 28800);
        assert_eq!(config.claim_mode, ClaimMode::Direct);
        assert_eq!(config.streak_milestone_days, 7);
    }
}
