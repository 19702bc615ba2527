use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId, ReplyParameters};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::state::SessionKey;

const CHAT_ACTION_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);
const TELEGRAM_TEXT_LIMIT: usize = 4000;

/// Repeats a chat action until dropped.
pub struct ChatActionHeartbeat {
    task_handle: Option<JoinHandle<()>>,
}

impl Drop for ChatActionHeartbeat {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

pub fn start_chat_action_heartbeat(
    bot: Bot,
    chat_id: ChatId,
    action: ChatAction,
) -> ChatActionHeartbeat {
    let task_handle = tokio::spawn(async move {
        loop {
            if let Err(err) = bot.send_chat_action(chat_id, action.clone()).await {
                warn!("send_chat_action failed: {err}");
            }
            tokio::time::sleep(CHAT_ACTION_HEARTBEAT_INTERVAL).await;
        }
    });

    ChatActionHeartbeat {
        task_handle: Some(task_handle),
    }
}

pub fn truncate_for_telegram(text: &str) -> String {
    let mut chars = text.chars();
    let truncated: String = chars.by_ref().take(TELEGRAM_TEXT_LIMIT).collect();
    if chars.next().is_some() {
        format!("{truncated}\n[truncated]")
    } else {
        truncated
    }
}

pub async fn reply_text(bot: &Bot, message: &Message, text: impl Into<String>) -> anyhow::Result<Message> {
    let text = truncate_for_telegram(&text.into());
    let sent = bot
        .send_message(message.chat.id, text)
        .reply_parameters(ReplyParameters::new(message.id))
        .await?;
    Ok(sent)
}

pub fn user_id_of(message: &Message) -> i64 {
    message
        .from
        .as_ref()
        .and_then(|user| i64::try_from(user.id.0).ok())
        .unwrap_or_default()
}

pub fn session_key_for_message(message: &Message) -> SessionKey {
    SessionKey::new(message.chat.id.0, user_id_of(message))
}

/// Chat, message and session a callback button belongs to.
pub fn callback_origin(query: &CallbackQuery) -> Option<(ChatId, MessageId, SessionKey)> {
    let message = query.message.as_ref()?;
    let chat_id = message.chat().id;
    let user_id = i64::try_from(query.from.id.0).ok()?;
    Some((chat_id, message.id(), SessionKey::new(chat_id.0, user_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_truncated_on_char_boundaries() {
        let short = "ok";
        assert_eq!(truncate_for_telegram(short), "ok");

        let long = "ж".repeat(TELEGRAM_TEXT_LIMIT + 5);
        let truncated = truncate_for_telegram(&long);
        assert!(truncated.ends_with("[truncated]"));
        assert_eq!(
            truncated.trim_end_matches("\n[truncated]").chars().count(),
            TELEGRAM_TEXT_LIMIT
        );
    }
}
