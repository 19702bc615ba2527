use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{
    ChatAction, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, InputMedia,
    InputMediaPhoto, ReplyParameters,
};
use tracing::{error, info, warn};

use crate::catalog::CatalogState;
use crate::compare::{render_comparison_png, ContainerBounds};
use crate::config::CONFIG;
use crate::handlers::access::{check_access_control, check_admin_access, is_rate_limited};
use crate::handlers::media::{fetch_message_image, message_has_image, replied_document_name};
use crate::handlers::selection::{catalog_unavailable_text, current_label};
use crate::llm::{enhance_image, refine_custom_prompt};
use crate::prompt::compose_prompt;
use crate::selection::record::parse_intensity;
use crate::selection::{SelectionField, SelectionRecord};
use crate::settings::{decode_settings, encode_settings, settings_filename, token_from_filename};
use crate::state::{AppState, SessionKey};
use crate::utils::logging::{read_recent_log_lines, APP_LOG, LOGS_DIR, TIMING_LOG};
use crate::utils::telegram::{
    callback_origin, reply_text, session_key_for_message, start_chat_action_heartbeat,
    truncate_for_telegram, user_id_of,
};
use crate::utils::timing::{complete_command_timer, start_callback_timer, start_command_timer};

pub const COMPARE_CALLBACK_PREFIX: &str = "cmp:";
const COMPARE_NUDGES: [i32; 4] = [-25, -5, 5, 25];
const COMPARE_PRESETS: [i32; 3] = [0, 50, 100];
const STATUS_LOG_TAIL_LINES: usize = 10;
const CAPTION_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareAction {
    Nudge(f32),
    Set(f32),
}

fn bool_label(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn redact_sensitive_text(text: &str) -> String {
    let mut redacted = text.to_string();
    for secret in [CONFIG.bot_token.as_str(), CONFIG.gemini_api_key.as_str()] {
        let secret = secret.trim();
        if !secret.is_empty() {
            redacted = redacted.replace(secret, "[REDACTED]");
        }
    }
    redacted
}

fn has_leading_digit(raw: &str) -> bool {
    raw.trim()
        .trim_start_matches(['+', '-'])
        .starts_with(|ch: char| ch.is_ascii_digit())
}

fn parse_compare_position(raw: &str) -> Option<f32> {
    let value = raw.trim().trim_end_matches('%').trim().parse::<f32>().ok()?;
    value.is_finite().then_some(value)
}

fn parse_compare_callback(data: &str) -> Option<CompareAction> {
    let payload = data.strip_prefix(COMPARE_CALLBACK_PREFIX)?;
    if let Some(position) = payload.strip_prefix('=') {
        return position.parse::<f32>().ok().map(CompareAction::Set);
    }
    payload.parse::<f32>().ok().map(CompareAction::Nudge)
}

fn compare_keyboard() -> InlineKeyboardMarkup {
    let nudges = COMPARE_NUDGES
        .iter()
        .map(|delta| {
            let label = if *delta < 0 {
                format!("◀ {}", delta.abs())
            } else {
                format!("{delta} ▶")
            };
            InlineKeyboardButton::callback(label, format!("{COMPARE_CALLBACK_PREFIX}{delta}"))
        })
        .collect::<Vec<_>>();
    let presets = COMPARE_PRESETS
        .iter()
        .map(|position| {
            InlineKeyboardButton::callback(
                format!("{position}%"),
                format!("{COMPARE_CALLBACK_PREFIX}={position}"),
            )
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(vec![nudges, presets])
}

fn compare_caption(position: f32) -> String {
    format!(
        "Before/after at {:.0}%: enhanced on the left, original on the right.",
        position
    )
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

fn enhanced_caption(record: &SelectionRecord, prompt: &str) -> String {
    let caption = format!(
        "Enhanced with {} at {}% intensity.\n\nPrompt: {}",
        CONFIG.gemini_image_model, record.enhancement_intensity, prompt
    );
    let mut chars = caption.chars();
    let shortened: String = chars.by_ref().take(CAPTION_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}…", shortened.trim_end())
    } else {
        shortened
    }
}

fn selection_summary(state: &CatalogState, record: &SelectionRecord) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Intensity: {}%", record.enhancement_intensity));
    if let Some(catalogs) = state.ready() {
        for field in SelectionField::catalogued() {
            if !record.value(field).is_empty() {
                lines.push(format!(
                    "{}: {}",
                    field.label(),
                    current_label(&catalogs, record, field)
                ));
            }
        }
    }
    let custom = record.custom_prompt.trim();
    if !custom.is_empty() {
        lines.push(format!("{}: {}", SelectionField::CustomPrompt.label(), custom));
    }
    lines.join("\n")
}

fn settings_text(catalog_state: &CatalogState, record: &SelectionRecord) -> String {
    if let Some(text) = catalog_unavailable_text(catalog_state) {
        return text;
    }
    let token = encode_settings(record);
    let summary = selection_summary(catalog_state, record);
    format!("Current options:\n{summary}\n\nSettings token (use with /restore):\n{token}")
}

/// The token inside a replied-to text: its last non-empty line, or that
/// line's last word when the line carries other text.
fn token_from_replied_text(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.split_whitespace().last())
        .map(str::to_string)
}

async fn build_status_report(state: &AppState) -> String {
    let whitelist_ready = Path::new(&CONFIG.whitelist_file_path).exists();
    let logs_ready = Path::new(LOGS_DIR).exists();

    let mut report = String::new();
    report.push_str("Status snapshot\n");
    report.push_str(&format!("time_utc: {}\n", Utc::now().to_rfc3339()));
    report.push_str(&format!("catalogs: {}\n", state.catalog_state().describe()));
    report.push_str(&format!("catalogs_path: {}\n", CONFIG.catalogs_path.display()));
    report.push_str(&format!("sessions: {}\n", state.session_count()));
    report.push_str(&format!("enhancements_in_flight: {}\n", state.in_flight_count()));
    report.push_str(&format!(
        "gemini_configured: {}\n",
        bool_label(!CONFIG.gemini_api_key.trim().is_empty())
    ));
    report.push_str(&format!("image_model: {}\n", CONFIG.gemini_image_model));
    report.push_str(&format!("text_model: {}\n", CONFIG.gemini_text_model));
    report.push_str(&format!("whitelist_file: {}\n", CONFIG.whitelist_file_path));
    report.push_str(&format!(
        "whitelist_present: {}\n",
        bool_label(whitelist_ready)
    ));
    report.push_str(&format!("logs_dir_present: {}\n", bool_label(logs_ready)));

    for (base_name, title) in [
        (APP_LOG, "Recent log lines"),
        (TIMING_LOG, "Recent timing lines"),
    ] {
        report.push_str(&format!("\n{title}\n"));
        match read_recent_log_lines(base_name, STATUS_LOG_TAIL_LINES) {
            Ok(Some(tail)) => {
                let file_name = tail
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                report.push_str(&format!("file: {file_name}\n"));
                if tail.lines.is_empty() {
                    report.push_str("(no lines available)\n");
                }
                for line in tail.lines {
                    report.push_str(&line);
                    report.push('\n');
                }
            }
            Ok(None) => report.push_str("No matching log files found.\n"),
            Err(err) => report.push_str(&format!("Failed to read log tail: {err}\n")),
        }
    }

    truncate_for_telegram(&redact_sensitive_text(&report))
}

pub async fn start_handler(bot: Bot, message: Message) -> Result<()> {
    reply_text(
        &bot,
        &message,
        "Hello! Send me a portrait photo, pick your options with /options, then run /enhance. Use /help to see every command.",
    )
    .await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    let help_text = "Portrait enhancer commands:

Send a photo (or an image file) to set the picture to enhance.
Add /enhance as the caption to enhance it right away.

/options - Pick a preset, subject, lighting, background and more
/intensity [0-100] - Show or set the enhancement intensity
/custom [text] - Set extra instructions (empty clears them)
/refine [text] - Let Gemini expand your extra instructions
/prompt - Show the prompt that will be sent
/enhance - Enhance the current photo (or the photo you reply to)
/compare [0-100] - Before/after view of the last enhancement
/settings - Get a token that stores your current options
/restore [token] - Restore options from a token or by replying to an enhanced_*.png file
/reset - Reset all options to their defaults
/status - Show bot health snapshot (admin-only)
/help - Show this help message";

    reply_text(&bot, &message, help_text).await?;
    Ok(())
}

/// Stores an uploaded photo as the session's source image. A `/enhance`
/// caption enhances it straight away.
pub async fn photo_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let caption_requests_enhance = message
        .caption()
        .map(|caption| caption.trim_start().starts_with("/enhance"))
        .unwrap_or(false);
    if caption_requests_enhance {
        return enhance_handler(bot, state, message).await;
    }

    let image = match fetch_message_image(&bot, &message).await {
        Ok(Some(image)) => image,
        Ok(None) => return Ok(()),
        Err(err) => {
            warn!("Failed to store source image: {err}");
            reply_text(&bot, &message, format!("Couldn't use that image: {err}")).await?;
            return Ok(());
        }
    };

    let key = session_key_for_message(&message);
    let size = image.bytes.len();
    state.with_session(key, |session| {
        session.source_image = Some(image);
        session.enhanced_image = None;
        session.slider = Default::default();
    });
    info!(
        "Stored source image ({} bytes) for chat {} user {}",
        size, key.chat_id, key.user_id
    );
    reply_text(
        &bot,
        &message,
        "Photo saved. Adjust /options if you like, then send /enhance.",
    )
    .await?;
    Ok(())
}

pub async fn intensity_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    let key = session_key_for_message(&message);
    let Some(raw) = arg else {
        let current = state.with_session(key, |session| session.selection.enhancement_intensity);
        reply_text(
            &bot,
            &message,
            format!("Current intensity: {current}%. Usage: /intensity 0-100"),
        )
        .await?;
        return Ok(());
    };

    if !has_leading_digit(&raw) {
        reply_text(
            &bot,
            &message,
            "Please give the intensity as a number from 0 to 100, e.g. /intensity 60",
        )
        .await?;
        return Ok(());
    }

    let intensity = state.with_session(key, |session| {
        session.selection = session.selection.with_intensity(parse_intensity(&raw));
        session.selection.enhancement_intensity
    });
    reply_text(&bot, &message, format!("Intensity set to {intensity}%.")).await?;
    Ok(())
}

pub async fn custom_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    let key = session_key_for_message(&message);
    let text = arg.unwrap_or_default();
    state.with_session(key, |session| {
        session.selection = session
            .selection
            .with_field(SelectionField::CustomPrompt, text.trim());
    });
    let reply = if text.trim().is_empty() {
        "Custom instructions cleared.".to_string()
    } else {
        format!("Custom instructions set: {}", text.trim())
    };
    reply_text(&bot, &message, reply).await?;
    Ok(())
}

pub async fn refine_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    if !check_access_control(&bot, &message, "refine").await {
        return Ok(());
    }

    let key = session_key_for_message(&message);
    let text = arg
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| {
            state.with_session(key, |session| session.selection.custom_prompt.trim().to_string())
        });
    if text.is_empty() {
        reply_text(
            &bot,
            &message,
            "There is nothing to refine. Set instructions with /custom or use /refine <text>.",
        )
        .await?;
        return Ok(());
    }

    if is_rate_limited(user_id_of(&message)) {
        reply_text(&bot, &message, "Rate limit exceeded. Please try again later.").await?;
        return Ok(());
    }

    let mut timer = start_command_timer("refine", &message);
    let _chat_action = start_chat_action_heartbeat(bot.clone(), message.chat.id, ChatAction::Typing);
    match refine_custom_prompt(&text).await {
        Ok(refined) => {
            state.with_session(key, |session| {
                session.selection = session
                    .selection
                    .with_field(SelectionField::CustomPrompt, &refined);
            });
            reply_text(
                &bot,
                &message,
                format!("Custom instructions refined:\n\n{refined}"),
            )
            .await?;
            complete_command_timer(&mut timer, "success", None);
        }
        Err(err) => {
            error!("Prompt refinement failed: {err}");
            reply_text(
                &bot,
                &message,
                format!("Sorry, I couldn't refine your instructions.\n\nError: {err}"),
            )
            .await?;
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
        }
    }
    Ok(())
}

pub async fn prompt_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let key = session_key_for_message(&message);
    let record = state.with_session(key, |session| session.selection.clone());
    let prompt = compose_prompt(&record, record.subject_mode());
    reply_text(&bot, &message, format!("Prompt:\n\n{prompt}")).await?;
    Ok(())
}

pub async fn enhance_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !check_access_control(&bot, &message, "enhance").await {
        return Ok(());
    }

    let catalog_state = state.catalog_state();
    if let Some(text) = catalog_unavailable_text(&catalog_state) {
        reply_text(&bot, &message, text).await?;
        return Ok(());
    }

    let key = session_key_for_message(&message);
    let Some(_in_flight) = state.begin_enhancement(key) else {
        reply_text(
            &bot,
            &message,
            "An enhancement is already running for you. Please wait for it to finish.",
        )
        .await?;
        return Ok(());
    };

    let mut timer = start_command_timer("enhance", &message);
    let carries_image = message_has_image(&message)
        || message
            .reply_to_message()
            .map(message_has_image)
            .unwrap_or(false);
    if carries_image {
        match fetch_message_image(&bot, &message).await {
            Ok(Some(image)) => state.with_session(key, |session| {
                session.source_image = Some(image);
                session.enhanced_image = None;
            }),
            Ok(None) => {}
            Err(err) => {
                reply_text(&bot, &message, format!("Couldn't use that image: {err}")).await?;
                complete_command_timer(&mut timer, "error", Some(err.to_string()));
                return Ok(());
            }
        }
    }

    let (source, record) = state.with_session(key, |session| {
        (session.source_image.clone(), session.selection.clone())
    });
    let Some(source) = source else {
        reply_text(
            &bot,
            &message,
            "Please send a photo first, or reply to a photo with /enhance.",
        )
        .await?;
        complete_command_timer(&mut timer, "error", Some("no source image".to_string()));
        return Ok(());
    };

    if is_rate_limited(key.user_id) {
        reply_text(&bot, &message, "Rate limit exceeded. Please try again later.").await?;
        complete_command_timer(&mut timer, "rate_limited", None);
        return Ok(());
    }

    let prompt = compose_prompt(&record, record.subject_mode());
    let processing_message = reply_text(&bot, &message, "Enhancing your photo...").await?;
    let _chat_action =
        start_chat_action_heartbeat(bot.clone(), message.chat.id, ChatAction::UploadPhoto);

    let enhanced = match enhance_image(&source, &prompt).await {
        Ok(enhanced) => enhanced,
        Err(err) => {
            error!(model = %CONFIG.gemini_image_model, "Image enhancement failed: {}", err.0);
            let _ = bot
                .edit_message_text(
                    message.chat.id,
                    processing_message.id,
                    format!("Sorry, I couldn't enhance the photo.\n\nError: {}", err.0),
                )
                .await;
            complete_command_timer(&mut timer, "error", Some(err.0));
            return Ok(());
        }
    };

    state.with_session(key, |session| {
        session.enhanced_image = Some(enhanced.clone());
        session.slider = Default::default();
    });

    let token = encode_settings(&record);
    let filename = settings_filename(&token, extension_for_mime(&enhanced.mime_type));
    bot.send_photo(message.chat.id, InputFile::memory(enhanced.bytes.clone()))
        .reply_parameters(ReplyParameters::new(message.id))
        .caption(enhanced_caption(&record, &prompt))
        .await?;
    bot.send_document(
        message.chat.id,
        InputFile::memory(enhanced.bytes).file_name(filename),
    )
    .reply_parameters(ReplyParameters::new(message.id))
    .caption("Full-quality file. Reply to it with /restore to reuse these options, or use /compare.")
    .await?;
    let _ = bot
        .delete_message(message.chat.id, processing_message.id)
        .await;

    complete_command_timer(&mut timer, "success", None);
    Ok(())
}

async fn render_for_session(state: &AppState, key: SessionKey) -> Result<Option<(Vec<u8>, f32)>> {
    let images = state.with_session(key, |session| {
        match (&session.source_image, &session.enhanced_image) {
            (Some(before), Some(after)) => Some((
                before.bytes.clone(),
                after.bytes.clone(),
                session.slider.position(),
            )),
            _ => None,
        }
    });
    let Some((before, after, position)) = images else {
        return Ok(None);
    };

    let png = tokio::task::spawn_blocking(move || render_comparison_png(&before, &after, position))
        .await??;
    Ok(Some((png, position)))
}

pub async fn compare_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    let key = session_key_for_message(&message);
    if let Some(raw) = arg {
        let Some(position) = parse_compare_position(&raw) else {
            reply_text(
                &bot,
                &message,
                "Please give the divider position as a number from 0 to 100, e.g. /compare 30",
            )
            .await?;
            return Ok(());
        };
        state.with_session(key, |session| session.slider.set_position(position));
    }

    let mut timer = start_command_timer("compare", &message);
    let rendered = match render_for_session(&state, key).await {
        Ok(rendered) => rendered,
        Err(err) => {
            error!("Comparison render failed: {err}");
            reply_text(&bot, &message, format!("Couldn't build the comparison: {err}")).await?;
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
            return Ok(());
        }
    };
    let Some((png, position)) = rendered else {
        reply_text(
            &bot,
            &message,
            "Nothing to compare yet. Send a photo and run /enhance first.",
        )
        .await?;
        complete_command_timer(&mut timer, "error", Some("no enhanced image".to_string()));
        return Ok(());
    };

    bot.send_photo(
        message.chat.id,
        InputFile::memory(png).file_name("comparison.png"),
    )
    .reply_parameters(ReplyParameters::new(message.id))
    .caption(compare_caption(position))
    .reply_markup(compare_keyboard())
    .await?;
    complete_command_timer(&mut timer, "success", None);
    Ok(())
}

pub async fn compare_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let _ = bot.answer_callback_query(query.id.clone()).await;
    let Some(action) = query.data.as_deref().and_then(parse_compare_callback) else {
        return Ok(());
    };
    let Some((chat_id, message_id, key)) = callback_origin(&query) else {
        return Ok(());
    };

    let mut timer = start_callback_timer("compare_nudge", &query);
    let moved = state.with_session(key, |session| {
        let before = session.slider.position();
        match action {
            CompareAction::Nudge(delta) => session
                .slider
                .nudge(delta, ContainerBounds::new(0.0, 100.0)),
            CompareAction::Set(position) => session.slider.set_position(position),
        }
        session.slider.position() != before
    });
    if !moved {
        complete_command_timer(&mut timer, "unchanged", None);
        return Ok(());
    }

    let Some((png, position)) = render_for_session(&state, key).await? else {
        complete_command_timer(&mut timer, "error", Some("no enhanced image".to_string()));
        return Ok(());
    };
    let media = InputMedia::Photo(
        InputMediaPhoto::new(InputFile::memory(png).file_name("comparison.png"))
            .caption(compare_caption(position)),
    );
    bot.edit_message_media(chat_id, message_id, media)
        .reply_markup(compare_keyboard())
        .await?;
    complete_command_timer(&mut timer, "success", None);
    Ok(())
}

pub async fn settings_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let key = session_key_for_message(&message);
    let record = state.with_session(key, |session| session.selection.clone());
    reply_text(&bot, &message, settings_text(&state.catalog_state(), &record)).await?;
    Ok(())
}

pub async fn restore_handler(
    bot: Bot,
    state: AppState,
    message: Message,
    arg: Option<String>,
) -> Result<()> {
    let token = arg
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(|raw| token_from_filename(&raw).unwrap_or(raw))
        .or_else(|| replied_document_name(&message).and_then(|name| token_from_filename(&name)))
        .or_else(|| {
            message
                .reply_to_message()
                .and_then(|reply| reply.text())
                .and_then(token_from_replied_text)
        });
    let Some(token) = token else {
        reply_text(
            &bot,
            &message,
            "Usage: /restore <token>, or reply to an enhanced_*.png file with /restore.",
        )
        .await?;
        return Ok(());
    };

    let catalog_state = state.catalog_state();
    let Some(catalogs) = catalog_state.ready() else {
        let text = catalog_unavailable_text(&catalog_state).unwrap_or_default();
        reply_text(&bot, &message, text).await?;
        return Ok(());
    };

    let mut timer = start_command_timer("restore", &message);
    match decode_settings(&token, &catalogs) {
        Ok(record) => {
            let key = session_key_for_message(&message);
            state.with_session(key, |session| session.selection = record.clone());
            let summary = selection_summary(&catalog_state, &record);
            reply_text(&bot, &message, format!("Options restored:\n{summary}")).await?;
            complete_command_timer(&mut timer, "success", None);
        }
        Err(err) => {
            warn!("Rejected settings token: {err}");
            reply_text(
                &bot,
                &message,
                format!("Couldn't restore settings: {err}. Your current options are unchanged."),
            )
            .await?;
            complete_command_timer(&mut timer, "error", Some(err.to_string()));
        }
    }
    Ok(())
}

pub async fn reset_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let key = session_key_for_message(&message);
    let defaults = state
        .ready_catalogs()
        .map(|catalogs| SelectionRecord::from_catalog_defaults(&catalogs))
        .unwrap_or_default();
    state.with_session(key, |session| session.selection = defaults);
    reply_text(&bot, &message, "All options reset to their defaults.").await?;
    Ok(())
}

pub async fn status_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if !check_admin_access(&bot, &message, "status").await {
        return Ok(());
    }

    let report = build_status_report(&state).await;
    reply_text(&bot, &message, report).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_argument_needs_a_leading_number() {
        assert!(has_leading_digit(" 60"));
        assert!(has_leading_digit("-5"));
        assert!(has_leading_digit("+150%"));
        assert!(!has_leading_digit("high"));
        assert!(!has_leading_digit(""));
    }

    #[test]
    fn compare_positions_accept_percent_suffix() {
        assert_eq!(parse_compare_position("30"), Some(30.0));
        assert_eq!(parse_compare_position(" 42.5 % "), Some(42.5));
        assert_eq!(parse_compare_position("NaN"), None);
        assert_eq!(parse_compare_position("left"), None);
    }

    #[test]
    fn compare_callbacks_round_trip_through_the_keyboard() {
        let data = compare_keyboard()
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => {
                    Some(data.clone())
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(data.len(), COMPARE_NUDGES.len() + COMPARE_PRESETS.len());
        assert_eq!(parse_compare_callback(&data[0]), Some(CompareAction::Nudge(-25.0)));
        assert_eq!(parse_compare_callback(&data[3]), Some(CompareAction::Nudge(25.0)));
        assert_eq!(parse_compare_callback(&data[5]), Some(CompareAction::Set(50.0)));
        assert_eq!(parse_compare_callback("cmp:left"), None);
        assert_eq!(parse_compare_callback("sel_menu:"), None);
    }

    #[test]
    fn document_extension_follows_mime_type() {
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/heic"), "png");
    }

    #[test]
    fn summary_lists_intensity_and_custom_text() {
        let record = SelectionRecord::default()
            .with_intensity(40)
            .with_field(SelectionField::CustomPrompt, " warmer skin ");
        let summary = selection_summary(&CatalogState::NotLoaded, &record);
        assert_eq!(summary, "Intensity: 40%\nCustom edits: warmer skin");
    }

    #[test]
    fn settings_need_loaded_catalogs() {
        let record = SelectionRecord::default();
        let text = settings_text(&CatalogState::NotLoaded, &record);
        assert!(!text.contains(&encode_settings(&record)));
        assert_eq!(Some(text), catalog_unavailable_text(&CatalogState::NotLoaded));

        let failed = CatalogState::Failed("bad yaml".to_string());
        assert_eq!(
            Some(settings_text(&failed, &record)),
            catalog_unavailable_text(&failed)
        );
    }

    #[test]
    fn restore_picks_the_token_out_of_a_settings_reply() {
        let record = SelectionRecord::default().with_intensity(40);
        let token = encode_settings(&record);
        let reply = format!(
            "Current options:\nIntensity: 40%\n\nSettings token (use with /restore):\n{token}\n"
        );
        assert_eq!(token_from_replied_text(&reply), Some(token.clone()));
        assert_eq!(token_from_replied_text(&format!("  {token}  ")), Some(token));
        assert_eq!(token_from_replied_text("\n  \n"), None);
    }

    #[test]
    fn long_captions_are_shortened() {
        let record = SelectionRecord::default();
        let caption = enhanced_caption(&record, &"x".repeat(2 * CAPTION_LIMIT));
        assert!(caption.chars().count() <= CAPTION_LIMIT + 1);
    }
}
