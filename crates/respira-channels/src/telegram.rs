use crate::channel::Channel;
use async_trait::async_trait;
use respira_core::{
    OutboundMessage, ReplyHint, RespiraError, RespiraResult, TurnContact, TurnMessage, TurnUser,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Telegram Bot API channel adapter.
///
/// Uses the Telegram Bot HTTP API for sending messages and long-polling
/// (`getUpdates`) for receiving them. Incoming turns are forwarded
/// through a `tokio::sync::mpsc` channel as [`TurnMessage`]s.
pub struct TelegramChannel {
    bot_token: String,
    base_url: String,
    client: reqwest::Client,
    turn_tx: mpsc::Sender<TurnMessage>,
    turn_rx: Option<mpsc::Receiver<TurnMessage>>,
}

// ── Telegram API response types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessagePayload>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessagePayload {
    #[allow(dead_code)]
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
    contact: Option<TelegramContact>,
}

#[derive(Debug, Deserialize)]
struct TelegramUser {
    id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramContact {
    phone_number: String,
}

// ── Telegram API request types ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    reply_markup: ReplyMarkup,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ReplyMarkup {
    Keyboard(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardMarkup {
    keyboard: Vec<Vec<KeyboardButton>>,
    one_time_keyboard: bool,
}

#[derive(Debug, Serialize)]
struct KeyboardButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_contact: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ReplyKeyboardRemove {
    remove_keyboard: bool,
}

impl ReplyMarkup {
    fn from_hint(hint: &ReplyHint) -> Self {
        match hint {
            ReplyHint::Remove => ReplyMarkup::Remove(ReplyKeyboardRemove {
                remove_keyboard: true,
            }),
            ReplyHint::Choices(rows) => ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
                keyboard: rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|text| KeyboardButton {
                                text: text.clone(),
                                request_contact: None,
                            })
                            .collect()
                    })
                    .collect(),
                one_time_keyboard: true,
            }),
            ReplyHint::RequestContact => ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
                keyboard: vec![vec![KeyboardButton {
                    text: "Enviar Contacto".to_string(),
                    request_contact: Some(true),
                }]],
                one_time_keyboard: true,
            }),
        }
    }
}

// ── Implementation ──────────────────────────────────────────────────────────

impl TelegramChannel {
    /// Creates a new `TelegramChannel`.
    ///
    /// * `bot_token` – The bot token obtained from @BotFather.
    /// * `turn_buffer` – Capacity of the internal mpsc turn buffer.
    pub fn new(bot_token: impl Into<String>, turn_buffer: usize) -> Self {
        let (turn_tx, turn_rx) = mpsc::channel(turn_buffer);
        Self {
            bot_token: bot_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
            turn_tx,
            turn_rx: Some(turn_rx),
        }
    }

    /// Overrides the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Takes the receiving half of the turn channel.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_turn_receiver(&mut self) -> Option<mpsc::Receiver<TurnMessage>> {
        self.turn_rx.take()
    }

    /// Starts long-polling the Telegram `getUpdates` endpoint.
    ///
    /// Runs indefinitely, forwarding every incoming turn that carries
    /// text or a contact payload through the mpsc channel. Should be
    /// spawned onto a Tokio task.
    pub async fn poll_updates(&self) -> RespiraResult<()> {
        let mut offset: Option<i64> = None;

        loop {
            let url = self.api_url("getUpdates");

            let mut params: Vec<(&str, String)> = vec![("timeout", "30".to_string())];
            if let Some(off) = offset {
                params.push(("offset", off.to_string()));
            }

            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .map_err(|e| RespiraError::Channel(format!("Telegram poll error: {e}")))?;

            let body: TelegramResponse<Vec<TelegramUpdate>> = response
                .json()
                .await
                .map_err(|e| RespiraError::Channel(format!("Telegram parse error: {e}")))?;

            if !body.ok {
                return Err(RespiraError::Channel(format!(
                    "Telegram API error: {}",
                    body.description.unwrap_or_default()
                )));
            }

            if let Some(updates) = body.result {
                for update in updates {
                    // Advance the offset so we do not receive this update again.
                    offset = Some(update.update_id + 1);

                    if let Some(turn) = update.message.and_then(turn_from_payload) {
                        tracing::debug!(user_id = turn.user.id, "Turn received");
                        // Best-effort send; if the receiver is dropped we stop.
                        if self.turn_tx.send(turn).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.bot_token, method)
    }
}

/// Maps one raw update payload to a [`TurnMessage`].
///
/// Updates without a sender, or carrying neither text nor a contact,
/// are dropped.
fn turn_from_payload(payload: TelegramMessagePayload) -> Option<TurnMessage> {
    let from = payload.from?;
    if payload.text.is_none() && payload.contact.is_none() {
        return None;
    }
    Some(TurnMessage {
        chat_id: payload.chat.id,
        user: TurnUser {
            id: from.id,
            first_name: from.first_name,
            last_name: from.last_name,
            handle: from.username,
        },
        text: payload.text,
        contact: payload.contact.map(|c| TurnContact {
            phone_number: c.phone_number,
        }),
    })
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: OutboundMessage) -> RespiraResult<()> {
        let url = self.api_url("sendMessage");

        let payload = SendMessageRequest {
            chat_id: message.chat_id,
            text: &message.text,
            reply_markup: ReplyMarkup::from_hint(&message.reply),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RespiraError::Channel(format!("Telegram send error: {e}")))?;

        let body: TelegramResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| RespiraError::Channel(format!("Telegram parse error: {e}")))?;

        if !body.ok {
            return Err(RespiraError::Channel(format!(
                "Telegram sendMessage failed: {}",
                body.description.unwrap_or_default()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_from_payload_with_text() {
        let payload: TelegramMessagePayload = serde_json::from_value(serde_json::json!({
            "message_id": 1,
            "from": { "id": 42, "first_name": "Ane", "last_name": "Egia", "username": "ane_egia" },
            "chat": { "id": 42 },
            "text": "Empezar"
        }))
        .unwrap();

        let turn = turn_from_payload(payload).unwrap();
        assert_eq!(turn.chat_id, 42);
        assert_eq!(turn.user.handle.as_deref(), Some("ane_egia"));
        assert_eq!(turn.text(), "Empezar");
        assert!(turn.contact.is_none());
    }

    #[test]
    fn test_turn_from_payload_with_contact_only() {
        let payload: TelegramMessagePayload = serde_json::from_value(serde_json::json!({
            "message_id": 2,
            "from": { "id": 42, "first_name": "Ane" },
            "chat": { "id": 42 },
            "contact": { "phone_number": "+34679123456" }
        }))
        .unwrap();

        let turn = turn_from_payload(payload).unwrap();
        assert_eq!(
            turn.contact.as_ref().unwrap().phone_number,
            "+34679123456"
        );
        assert_eq!(turn.text(), "");
    }

    #[test]
    fn test_payload_without_text_or_contact_is_dropped() {
        let payload: TelegramMessagePayload = serde_json::from_value(serde_json::json!({
            "message_id": 3,
            "from": { "id": 42, "first_name": "Ane" },
            "chat": { "id": 42 }
        }))
        .unwrap();
        assert!(turn_from_payload(payload).is_none());
    }

    #[test]
    fn test_choice_markup_shape() {
        let markup = ReplyMarkup::from_hint(&ReplyHint::Choices(vec![vec![
            "Sí".to_string(),
            "No".to_string(),
        ]]));
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keyboard": [[{ "text": "Sí" }, { "text": "No" }]],
                "one_time_keyboard": true
            })
        );
    }

    #[test]
    fn test_contact_markup_shape() {
        let markup = ReplyMarkup::from_hint(&ReplyHint::RequestContact);
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "keyboard": [[{ "text": "Enviar Contacto", "request_contact": true }]],
                "one_time_keyboard": true
            })
        );
    }

    #[test]
    fn test_remove_markup_shape() {
        let markup = ReplyMarkup::from_hint(&ReplyHint::Remove);
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json, serde_json::json!({ "remove_keyboard": true }));
    }
}
