use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::utils::telegram::{reply_text, user_id_of};

static RATE_LIMITS: Lazy<Mutex<HashMap<i64, Instant>>> = Lazy::new(|| Mutex::new(HashMap::new()));
static WHITELIST_CACHE: Lazy<Mutex<Option<Vec<String>>>> = Lazy::new(|| Mutex::new(None));
static WHITELIST_LOADED: AtomicBool = AtomicBool::new(false);

fn check_rate_limit(
    limits: &mut HashMap<i64, Instant>,
    user_id: i64,
    now: Instant,
    window: Duration,
) -> bool {
    if let Some(last) = limits.get(&user_id) {
        if now.duration_since(*last) < window {
            return true;
        }
    }

    limits.insert(user_id, now);
    false
}

/// Records a paid-for call (enhance, refine) and reports whether the user is
/// still inside the cooldown window of a previous one.
pub fn is_rate_limited(user_id: i64) -> bool {
    let window = Duration::from_secs(CONFIG.rate_limit_seconds);
    check_rate_limit(&mut RATE_LIMITS.lock(), user_id, Instant::now(), window)
}

pub fn load_whitelist() {
    if WHITELIST_LOADED.swap(true, Ordering::SeqCst) {
        return;
    }

    let path = &CONFIG.whitelist_file_path;
    let file = std::fs::read_to_string(path);
    let mut cache = WHITELIST_CACHE.lock();

    match file {
        Ok(content) => {
            let ids = content
                .lines()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(|line| line.to_string())
                .collect::<Vec<_>>();
            *cache = Some(ids);
            info!("Loaded whitelist file {}", path);
        }
        Err(err) => {
            warn!("Whitelist file {} not found or failed to read: {}", path, err);
            *cache = None;
        }
    }
}

pub fn is_user_whitelisted(user_id: i64) -> bool {
    if !WHITELIST_LOADED.load(Ordering::SeqCst) {
        load_whitelist();
    }
    let cache = WHITELIST_CACHE.lock();
    match &*cache {
        None => true,
        Some(list) => list.contains(&user_id.to_string()),
    }
}

pub fn is_chat_whitelisted(chat_id: i64) -> bool {
    if !WHITELIST_LOADED.load(Ordering::SeqCst) {
        load_whitelist();
    }
    let cache = WHITELIST_CACHE.lock();
    match &*cache {
        None => true,
        Some(list) => list.contains(&chat_id.to_string()),
    }
}

pub fn is_access_allowed(user_id: i64, chat_id: i64) -> bool {
    is_user_whitelisted(user_id) || is_chat_whitelisted(chat_id)
}

fn command_is_listed(listed: &[String], command: &str) -> bool {
    listed.iter().any(|entry| entry.eq_ignore_ascii_case(command))
}

pub fn requires_access_control(command: &str) -> bool {
    command_is_listed(&CONFIG.access_controlled_commands, command)
}

pub async fn check_access_control(bot: &Bot, message: &Message, command: &str) -> bool {
    if !requires_access_control(command) {
        return true;
    }

    let user_id = user_id_of(message);
    let chat_id = message.chat.id.0;

    if !is_access_allowed(user_id, chat_id) {
        warn!(
            "Denied /{} for user {} in chat {} (not whitelisted)",
            command, user_id, chat_id
        );
        let _ = reply_text(
            bot,
            message,
            "You are not authorized to use this command. Please contact the administrator.",
        )
        .await;
        return false;
    }

    true
}

pub async fn check_admin_access(bot: &Bot, message: &Message, command: &str) -> bool {
    let user_id = user_id_of(message);
    if CONFIG.is_admin(user_id) {
        return true;
    }

    warn!("Denied admin command /{} for user {}", command, user_id);
    let _ = reply_text(bot, message, "This command is only available to bot administrators.").await;
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_window_blocks_repeat_calls() {
        let mut limits = HashMap::new();
        let window = Duration::from_secs(15);
        let start = Instant::now();

        assert!(!check_rate_limit(&mut limits, 1, start, window));
        assert!(check_rate_limit(&mut limits, 1, start + Duration::from_secs(3), window));
        assert!(!check_rate_limit(&mut limits, 2, start, window));
        assert!(!check_rate_limit(&mut limits, 1, start + Duration::from_secs(16), window));
    }

    #[test]
    fn listed_commands_match_case_insensitively() {
        let listed = vec!["enhance".to_string(), "refine".to_string()];
        assert!(command_is_listed(&listed, "Enhance"));
        assert!(!command_is_listed(&listed, "prompt"));
        assert!(!command_is_listed(&[], "enhance"));
    }
}
