use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use teloxide::types::{CallbackQuery, Message, User};
use tracing::info;

const TIMER_TEXT_LIMIT: usize = 300;

fn timer_text(raw: &str) -> String {
    raw.replace('\n', " ").chars().take(TIMER_TEXT_LIMIT).collect()
}

/// Tracks one command or callback from receipt to reply on the
/// `bot.timing` target. A timer dropped without being completed logs
/// itself as `abandoned`.
#[derive(Debug)]
pub struct CommandTimer {
    command: String,
    chat_id: Option<i64>,
    user_id: Option<i64>,
    username: Option<String>,
    message_id: Option<i64>,
    text: Option<String>,
    started_at: DateTime<Utc>,
    started: Instant,
    completed: bool,
}

impl CommandTimer {
    fn new(
        command: &str,
        chat_id: Option<i64>,
        user: Option<&User>,
        message_id: Option<i64>,
        text: Option<String>,
    ) -> Self {
        CommandTimer {
            command: command.to_string(),
            chat_id,
            user_id: user.and_then(|u| i64::try_from(u.id.0).ok()),
            username: user.and_then(|u| u.username.clone()),
            message_id,
            text,
            started_at: Utc::now(),
            started: Instant::now(),
            completed: false,
        }
    }

    pub fn from_message(command: &str, message: &Message) -> Self {
        let text = message.text().or_else(|| message.caption()).map(timer_text);
        CommandTimer::new(
            command,
            Some(message.chat.id.0),
            message.from.as_ref(),
            Some(message.id.0 as i64),
            text,
        )
    }

    pub fn from_callback(command: &str, query: &CallbackQuery) -> Self {
        CommandTimer::new(
            command,
            query.message.as_ref().map(|message| message.chat().id.0),
            Some(&query.from),
            query.message.as_ref().map(|message| message.id().0 as i64),
            query.data.as_deref().map(timer_text),
        )
    }

    fn log_received(&self) {
        info!(
            target: "bot.timing",
            event = "command_received",
            command = %self.command,
            chat_id = ?self.chat_id,
            user_id = ?self.user_id,
            username = ?self.username,
            message_id = ?self.message_id,
            received_at = %self.started_at.to_rfc3339(),
            text = ?self.text,
        );
    }

    /// Logs the completion once; later calls are ignored.
    pub fn finish(&mut self, status: &str, detail: Option<&str>) {
        if self.completed {
            return;
        }
        self.completed = true;
        info!(
            target: "bot.timing",
            event = "command_completed",
            command = %self.command,
            chat_id = ?self.chat_id,
            user_id = ?self.user_id,
            message_id = ?self.message_id,
            started_at = %self.started_at.to_rfc3339(),
            duration_s = format_args!("{:.3}", self.started.elapsed().as_secs_f64()),
            status,
            detail = detail.unwrap_or_default(),
        );
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        self.finish("abandoned", None);
    }
}

pub fn start_command_timer(command: &str, message: &Message) -> CommandTimer {
    let timer = CommandTimer::from_message(command, message);
    timer.log_received();
    timer
}

pub fn start_callback_timer(command: &str, query: &CallbackQuery) -> CommandTimer {
    let timer = CommandTimer::from_callback(command, query);
    timer.log_received();
    timer
}

pub fn complete_command_timer(timer: &mut CommandTimer, status: &str, detail: Option<String>) {
    timer.finish(status, detail.as_deref());
}

/// Runs one model call between a request and a response timing event.
pub async fn log_llm_timing<T, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> anyhow::Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let metadata = metadata.unwrap_or_else(|| JsonValue::Object(Default::default()));
    let started = Instant::now();
    info!(
        target: "bot.timing",
        event = "llm_request",
        provider,
        model,
        operation,
        started_at = %Utc::now().to_rfc3339(),
        metadata = %metadata,
    );

    let result = call().await;

    info!(
        target: "bot.timing",
        event = "llm_response",
        provider,
        model,
        operation,
        completed_at = %Utc::now().to_rfc3339(),
        duration_s = format_args!("{:.3}", started.elapsed().as_secs_f64()),
        status = if result.is_ok() { "success" } else { "error" },
        metadata = %metadata,
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_text_is_single_line_and_bounded() {
        assert_eq!(timer_text("/custom warm\ntones"), "/custom warm tones");
        let long = "é".repeat(TIMER_TEXT_LIMIT + 20);
        assert_eq!(timer_text(&long).chars().count(), TIMER_TEXT_LIMIT);
    }

    #[test]
    fn finish_is_recorded_once() {
        let mut timer = CommandTimer::new("enhance", Some(1), None, Some(2), None);
        assert!(!timer.completed);
        timer.finish("success", None);
        timer.finish("error", Some("late"));
        assert!(timer.completed);
    }

    #[tokio::test]
    async fn llm_timing_passes_the_result_through() {
        let ok = log_llm_timing("gemini", "model", "op", None, || async { Ok(5) }).await;
        assert_eq!(ok.expect("ok"), 5);
        let err: anyhow::Result<()> = log_llm_timing("gemini", "model", "op", None, || async {
            Err(anyhow::anyhow!("boom"))
        })
        .await;
        assert!(err.is_err());
    }
}
