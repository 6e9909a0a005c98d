//! Minimal Telegram Bot API client
//!
//! Covers exactly what the bot surface needs: getUpdates long polling
//! and sendMessage with an optional inline keyboard.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Result, VineyardError};

/// Telegram Bot API client
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", token),
        }
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let response = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout_secs.to_string()),
            ])
            // Leave headroom over the server-side long-poll timeout
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()
            .await?;

        let body: ApiResponse<Vec<Update>> = response.json().await?;

        if !body.ok {
            return Err(VineyardError::Telegram(format!(
                "getUpdates failed: {}",
                body.description.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        Ok(body.result.unwrap_or_default())
    }

    /// Send a text message, optionally with an inline keyboard
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<()> {
        let payload = SendMessageRequest {
            chat_id,
            text: text.to_string(),
            reply_markup,
        };

        let response = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let body: ApiResponse<serde_json::Value> = response.json().await?;

        if !body.ok {
            return Err(VineyardError::Telegram(format!(
                "sendMessage failed: {}",
                body.description.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        Ok(())
    }
}

/// Single-button inline keyboard opening a web mini-app
pub fn launch_keyboard(label: &str, url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton {
            text: label.to_string(),
            web_app: Some(WebAppInfo {
                url: url.to_string(),
            }),
        }]],
    }
}

// Bot API wire types (only the fields the bot reads)

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    chat_id: i64,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebAppInfo {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_keyboard_shape() {
        let markup = launch_keyboard("Launch", "https://app.example.com/?userId=1");
        let json = serde_json::to_value(&markup).unwrap();

        assert_eq!(json["inline_keyboard"][0][0]["text"], "Launch");
        assert_eq!(
            json["inline_keyboard"][0][0]["web_app"]["url"],
            "https://app.example.com/?userId=1"
        );
    }

    #[test]
    fn test_update_deserializes() {
        let raw = r#"{
            "update_id": 7,
            "message": {
                "chat": { "id": 42 },
                "from": { "id": 42, "first_name": "Ada", "last_name": "Lovelace" },
                "text": "/start 999"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 7);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.from.unwrap().first_name, "Ada");
        assert_eq!(message.text.as_deref(), Some("/start 999"));
    }
}
