use std::env;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub gemini_text_model: String,
    pub gemini_temperature: f32,
    pub gemini_safety_settings: String,
    pub gemini_request_timeout_secs: u64,
    pub catalogs_path: PathBuf,
    pub rate_limit_seconds: u64,
    pub whitelist_file_path: String,
    pub access_controlled_commands: Vec<String>,
    pub admin_user_ids: Vec<i64>,
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::load);

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_user_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| match value.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("Ignoring invalid ADMIN_USER_IDS entry '{}'", value);
                None
            }
        })
        .collect()
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "standard".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to standard.",
                value
            );
            "standard".to_string()
        }
    }
}

fn resolve_catalogs_path() -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(env_value) = env::var("CATALOGS_PATH") {
        let env_path = PathBuf::from(env_value.trim());
        if env_path.is_absolute() {
            candidates.push(env_path);
        } else {
            candidates.push(
                env::current_dir()
                    .unwrap_or_else(|_| PathBuf::from("."))
                    .join(env_path),
            );
        }
    }
    candidates.push(PathBuf::from("catalogs.yaml"));
    candidates.push(PathBuf::from("data").join("catalogs.yaml"));

    for candidate in &candidates {
        if candidate.exists() {
            return candidate.to_path_buf();
        }
    }

    candidates
        .first()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("catalogs.yaml"))
}

impl Config {
    /// Reads the environment. A missing `BOT_TOKEN` is reported by `main`
    /// so the rest of the configuration stays usable without one.
    pub fn load() -> Self {
        let access_controlled_commands = env::var("ACCESS_CONTROLLED_COMMANDS")
            .ok()
            .map(|value| {
                value
                    .split(',')
                    .map(|entry| entry.trim().trim_start_matches('/').to_string())
                    .filter(|entry| !entry.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| vec!["enhance".to_string(), "refine".to_string()]);

        let mut gemini_request_timeout_secs = env_u64("GEMINI_REQUEST_TIMEOUT_SECS", 120);
        if gemini_request_timeout_secs == 0 {
            gemini_request_timeout_secs = 120;
        }

        Config {
            bot_token: env_string("BOT_TOKEN", "").trim().to_string(),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            gemini_api_key: env_string("GEMINI_API_KEY", ""),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            gemini_text_model: env_string("GEMINI_TEXT_MODEL", "gemini-2.5-flash"),
            gemini_temperature: env_f32("GEMINI_TEMPERATURE", 0.7),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "standard",
            )),
            gemini_request_timeout_secs,
            catalogs_path: resolve_catalogs_path(),
            rate_limit_seconds: env_u64("RATE_LIMIT_SECONDS", 15),
            whitelist_file_path: env_string("WHITELIST_FILE_PATH", "allowed_chat.txt"),
            access_controlled_commands,
            admin_user_ids: parse_user_ids(&env_string("ADMIN_USER_IDS", "")),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_user_ids.contains(&user_id)
    }
}

pub const REFINE_SYSTEM_PROMPT: &str = "You refine short photo-editing requests for an AI portrait enhancer.\n\nThe user gives you a brief custom instruction. Rewrite it as one clear, detailed instruction that an image model can follow.\n\nRules:\n1. Elaborate ONLY what the user asked for. Do not add new edits they did not mention.\n2. Do NOT mention identity preservation, facial accuracy, image quality, resolution or enhancement intensity. Those are added separately.\n3. Keep it under 80 words, in plain prose, with no lists, headings, quotes or markdown.\n4. Reply in the same language as the user's request.\n5. Return only the refined instruction text.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_settings_normalize_to_known_profiles() {
        assert_eq!(normalize_gemini_safety_settings("OFF".to_string()), "permissive");
        assert_eq!(normalize_gemini_safety_settings(" ".to_string()), "standard");
        assert_eq!(normalize_gemini_safety_settings("strict".to_string()), "standard");
    }

    #[test]
    fn admin_ids_skip_invalid_entries() {
        assert_eq!(parse_user_ids("12, abc,,-34 "), vec![12, -34]);
        assert!(parse_user_ids("").is_empty());
    }
}
