//! Bot command handling
//!
//! `/start` resolves the caller's account (with optional referral
//! attribution), advances the login streak, and replies with the
//! mini-app launch button. `/referral` replies with a shareable link.
//! Everything else is ignored.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bot::client::{launch_keyboard, Message, TelegramUser, Update};
use crate::engine;
use crate::server::AppState;
use crate::types::Result;

/// Parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { referrer: Option<String> },
    Referral,
}

/// Parse a message text into a command.
///
/// Accepts `@BotName` suffixes on the command token. Non-commands and
/// unknown commands return `None`.
pub fn parse_command(text: &str) -> Option<Command> {
    let mut tokens = text.split_whitespace();
    let command = tokens.next()?;

    if !command.starts_with('/') {
        return None;
    }

    let command = command.split('@').next().unwrap_or(command);

    match command {
        "/start" => Some(Command::Start {
            referrer: tokens.next().map(|s| s.to_string()),
        }),
        "/referral" => Some(Command::Referral),
        _ => None,
    }
}

/// Dispatch one update from the poller
pub async fn handle_update(state: Arc<AppState>, update: Update) -> Result<()> {
    let Some(message) = update.message else {
        return Ok(());
    };
    let Some(sender) = message.from.clone() else {
        return Ok(());
    };
    let Some(text) = message.text.clone() else {
        return Ok(());
    };

    match parse_command(&text) {
        Some(Command::Start { referrer }) => {
            handle_start(state, &message, &sender, referrer.as_deref()).await
        }
        Some(Command::Referral) => handle_referral(state, &message, &sender).await,
        None => {
            debug!(chat = message.chat.id, "Ignoring non-command message");
            Ok(())
        }
    }
}

/// `/start [referrerId]`
async fn handle_start(
    state: Arc<AppState>,
    message: &Message,
    sender: &TelegramUser,
    referrer: Option<&str>,
) -> Result<()> {
    let external_id = sender.id.to_string();
    let last_name = sender.last_name.clone().unwrap_or_default();

    let (mut account, grant) = state
        .ledger
        .get_or_create(&external_id, &sender.first_name, &last_name, referrer)
        .await?;

    // Bot contact counts as a login for streak purposes
    let outcome = engine::evaluate_login(&mut account, state.now(), &state.reward_config);
    if !outcome.already_logged_today {
        if let Err(e) = state.ledger.save(&account).await {
            warn!(user = %external_id, error = %e, "Failed to persist login streak");
        }
    }

    if let Some(ref bot) = state.bot {
        let text = format!(
            "Welcome, {}! Click the button below to check your stats.",
            account.first_name
        );
        let keyboard = launch_keyboard("Launch", &state.args.launch_url(&account.telegram_id));
        bot.send_message(message.chat.id, &text, Some(keyboard))
            .await?;
    }

    // Best-effort referrer notification; the bonus is already committed
    if let Some(grant) = grant {
        notify_referrer(&state, &grant.referrer_id, &account).await;
    }

    info!(
        user = %external_id,
        streak = outcome.streak,
        "Handled /start"
    );

    Ok(())
}

/// `/referral`
async fn handle_referral(
    state: Arc<AppState>,
    message: &Message,
    sender: &TelegramUser,
) -> Result<()> {
    let external_id = sender.id.to_string();
    let last_name = sender.last_name.clone().unwrap_or_default();

    // Make sure the account exists so the link points at a real record
    state
        .ledger
        .get_or_create(&external_id, &sender.first_name, &last_name, None)
        .await?;

    if let Some(ref bot) = state.bot {
        let text = format!(
            "Share this link to invite friends:\n{}",
            state.args.referral_link(&external_id)
        );
        bot.send_message(message.chat.id, &text, None).await?;
    }

    Ok(())
}

/// Tell a referrer their bonus landed. Failures are logged and swallowed;
/// the grant itself is never rolled back.
async fn notify_referrer(state: &AppState, referrer_id: &str, referred: &crate::db::schemas::UserAccountDoc) {
    let Some(ref bot) = state.bot else {
        return;
    };

    let Ok(chat_id) = referrer_id.parse::<i64>() else {
        warn!(referrer = referrer_id, "Referrer id is not a chat id, skipping notification");
        return;
    };

    let name = format!("{} {}", referred.first_name, referred.last_name);
    let text = format!("You referred {} and earned a reward!", name.trim());

    if let Err(e) = bot.send_message(chat_id, &text, None).await {
        warn!(referrer = referrer_id, error = %e, "Referral notification failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_start() {
        assert_eq!(
            parse_command("/start"),
            Some(Command::Start { referrer: None })
        );
    }

    #[test]
    fn test_parse_start_with_referrer() {
        assert_eq!(
            parse_command("/start 12345"),
            Some(Command::Start {
                referrer: Some("12345".to_string())
            })
        );
    }

    #[test]
    fn test_parse_command_with_bot_suffix() {
        assert_eq!(
            parse_command("/start@VineyardFarmBot 999"),
            Some(Command::Start {
                referrer: Some("999".to_string())
            })
        );
        assert_eq!(parse_command("/referral@VineyardFarmBot"), Some(Command::Referral));
    }

    #[test]
    fn test_parse_ignores_plain_text() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_parse_ignores_unknown_commands() {
        assert_eq!(parse_command("/balance"), None);
    }
}
