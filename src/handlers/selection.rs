use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ReplyParameters};
use tracing::{debug, info};

use crate::catalog::filter::is_available;
use crate::catalog::{apply_selection, available_options, CatalogState, Catalogs};
use crate::selection::{SelectionField, SelectionRecord};
use crate::state::AppState;
use crate::utils::telegram::{callback_origin, reply_text, session_key_for_message};
use crate::utils::timing::{complete_command_timer, start_callback_timer, start_command_timer};

pub const SELECTION_CALLBACK_PREFIX: &str = "sel_";
const MENU_CALLBACK: &str = "sel_menu:";
const FIELD_CALLBACK_PREFIX: &str = "sel_field:";
const PICK_CALLBACK_PREFIX: &str = "sel_pick:";
const BUTTON_LABEL_LIMIT: usize = 40;
const MENU_TEXT: &str = "Choose a category to adjust:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionAction {
    Menu,
    Field(SelectionField),
    Pick(SelectionField, usize),
}

fn parse_selection_callback(data: &str) -> Option<SelectionAction> {
    if data == MENU_CALLBACK {
        return Some(SelectionAction::Menu);
    }
    if let Some(key) = data.strip_prefix(FIELD_CALLBACK_PREFIX) {
        return SelectionField::from_key(key)
            .filter(|field| field.is_catalogued())
            .map(SelectionAction::Field);
    }
    let payload = data.strip_prefix(PICK_CALLBACK_PREFIX)?;
    let (key, index) = payload.split_once('|')?;
    let field = SelectionField::from_key(key).filter(|field| field.is_catalogued())?;
    let index = index.parse::<usize>().ok()?;
    Some(SelectionAction::Pick(field, index))
}

fn button_label(text: &str) -> String {
    let mut chars = text.chars();
    let shortened: String = chars.by_ref().take(BUTTON_LABEL_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}…", shortened.trim_end())
    } else {
        shortened
    }
}

/// Label of the current value of `field`, or "—" when unset.
pub fn current_label(catalogs: &Catalogs, record: &SelectionRecord, field: SelectionField) -> String {
    let value = record.value(field);
    match catalogs.label_for(field, &value) {
        Some(label) => label.to_string(),
        None if value.is_empty() => "—".to_string(),
        None => value,
    }
}

fn category_keyboard(catalogs: &Catalogs, record: &SelectionRecord) -> InlineKeyboardMarkup {
    let buttons = SelectionField::catalogued()
        .filter(|field| !catalogs.options(*field).is_empty())
        .map(|field| {
            InlineKeyboardButton::callback(
                button_label(&format!(
                    "{}: {}",
                    field.label(),
                    current_label(catalogs, record, field)
                )),
                format!("{}{}", FIELD_CALLBACK_PREFIX, field.key()),
            )
        })
        .collect::<Vec<_>>();

    let rows = buttons
        .chunks(2)
        .map(|chunk| chunk.to_vec())
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

fn option_keyboard(
    catalogs: &Catalogs,
    record: &SelectionRecord,
    field: SelectionField,
) -> InlineKeyboardMarkup {
    let current = record.value(field);
    let mut rows = available_options(catalogs, record, field)
        .into_iter()
        .map(|(index, entry)| {
            let marker = if entry.value == current { "• " } else { "" };
            vec![InlineKeyboardButton::callback(
                button_label(&format!("{marker}{}", entry.label)),
                format!("{}{}|{}", PICK_CALLBACK_PREFIX, field.key(), index),
            )]
        })
        .collect::<Vec<_>>();
    rows.push(vec![InlineKeyboardButton::callback(
        "« Back",
        MENU_CALLBACK.to_string(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Explains why options cannot be shown yet, or `None` when they can.
pub fn catalog_unavailable_text(state: &CatalogState) -> Option<String> {
    match state {
        CatalogState::Loaded(_) => None,
        CatalogState::NotLoaded => {
            Some("Option catalogs are still loading. Please try again in a moment.".to_string())
        }
        CatalogState::Failed(reason) => Some(format!(
            "Option catalogs could not be loaded, so options are unavailable.\n\nError: {reason}"
        )),
    }
}

pub async fn options_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let mut timer = start_command_timer("options", &message);
    let catalog_state = state.catalog_state();
    let Some(catalogs) = catalog_state.ready() else {
        let text = catalog_unavailable_text(&catalog_state).unwrap_or_default();
        reply_text(&bot, &message, text).await?;
        complete_command_timer(&mut timer, "error", Some("catalogs unavailable".to_string()));
        return Ok(());
    };

    let key = session_key_for_message(&message);
    let record = state.with_session(key, |session| session.selection.clone());
    bot.send_message(message.chat.id, MENU_TEXT)
        .reply_parameters(ReplyParameters::new(message.id))
        .reply_markup(category_keyboard(&catalogs, &record))
        .await?;
    complete_command_timer(&mut timer, "success", None);
    Ok(())
}

pub async fn selection_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };
    let Some(action) = parse_selection_callback(&data) else {
        let _ = bot.answer_callback_query(query.id.clone()).await;
        return Ok(());
    };
    let Some((chat_id, message_id, key)) = callback_origin(&query) else {
        let _ = bot.answer_callback_query(query.id.clone()).await;
        return Ok(());
    };
    let catalog_state = state.catalog_state();
    let Some(catalogs) = catalog_state.ready() else {
        let text = catalog_unavailable_text(&catalog_state).unwrap_or_default();
        bot.answer_callback_query(query.id.clone())
            .text(text)
            .show_alert(true)
            .await?;
        return Ok(());
    };

    let mut timer = start_callback_timer("options_pick", &query);
    match action {
        SelectionAction::Menu => {
            let _ = bot.answer_callback_query(query.id.clone()).await;
            let record = state.with_session(key, |session| session.selection.clone());
            bot.edit_message_text(chat_id, message_id, MENU_TEXT)
                .reply_markup(category_keyboard(&catalogs, &record))
                .await?;
        }
        SelectionAction::Field(field) => {
            let _ = bot.answer_callback_query(query.id.clone()).await;
            let record = state.with_session(key, |session| session.selection.clone());
            bot.edit_message_text(chat_id, message_id, format!("Choose {}:", field.label()))
                .reply_markup(option_keyboard(&catalogs, &record, field))
                .await?;
        }
        SelectionAction::Pick(field, index) => {
            let Some(entry) = catalogs.options(field).get(index) else {
                let _ = bot.answer_callback_query(query.id.clone()).await;
                return Ok(());
            };
            let value = entry.value.clone();
            let label = entry.label.clone();
            let applied = state.with_session(key, |session| {
                if !is_available(&catalogs, &session.selection, field, &value) {
                    return None;
                }
                let before = session.selection.clone();
                session.selection = apply_selection(&catalogs, &before, field, &value);
                Some((before, session.selection.clone()))
            });

            let Some((before, record)) = applied else {
                debug!("Option {} #{} is no longer available", field.key(), index);
                bot.answer_callback_query(query.id.clone())
                    .text("That option is not available with your other choices.")
                    .await?;
                complete_command_timer(&mut timer, "rejected", Some(field.key().to_string()));
                return Ok(());
            };

            info!(
                "Selection {}={:?} for chat {} user {}",
                field.key(),
                value,
                key.chat_id,
                key.user_id
            );
            let mut notice = format!("{}: {}", field.label(), label);
            for dependent in [SelectionField::Clothing, SelectionField::PropObject] {
                if dependent != field && before.value(dependent) != record.value(dependent) {
                    notice.push_str(&format!(
                        "\n{} reset (no longer fits)",
                        dependent.label()
                    ));
                }
            }
            bot.answer_callback_query(query.id.clone()).text(notice).await?;
            bot.edit_message_text(chat_id, message_id, MENU_TEXT)
                .reply_markup(category_keyboard(&catalogs, &record))
                .await?;
        }
    }
    complete_command_timer(&mut timer, "success", None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::loader::parse_catalogs;
    use teloxide::types::InlineKeyboardButtonKind;

    fn catalogs() -> Catalogs {
        parse_catalogs(
            r#"
gender:
  - { value: "", label: "Any" }
  - { value: "male", label: "Male" }
  - { value: "female", label: "Female" }
clothing:
  - { value: "", label: "Keep" }
  - { value: "a suit", label: "Suit", gender: male }
  - { value: "a gown", label: "Gown", gender: female }
"#,
        )
        .expect("catalogs parse")
    }

    fn callback_data(markup: &InlineKeyboardMarkup) -> Vec<String> {
        markup
            .inline_keyboard
            .iter()
            .flatten()
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_callback_payloads() {
        assert_eq!(parse_selection_callback("sel_menu:"), Some(SelectionAction::Menu));
        assert_eq!(
            parse_selection_callback("sel_field:lighting"),
            Some(SelectionAction::Field(SelectionField::Lighting))
        );
        assert_eq!(
            parse_selection_callback("sel_pick:propObject|3"),
            Some(SelectionAction::Pick(SelectionField::PropObject, 3))
        );
        assert_eq!(parse_selection_callback("sel_field:customPrompt"), None);
        assert_eq!(parse_selection_callback("sel_pick:lighting|x"), None);
        assert_eq!(parse_selection_callback("sel_pick:lighting"), None);
    }

    #[test]
    fn category_menu_lists_only_non_empty_catalogs() {
        let markup = category_keyboard(&catalogs(), &SelectionRecord::default());
        assert_eq!(
            callback_data(&markup),
            vec!["sel_field:gender", "sel_field:clothing"]
        );
    }

    #[test]
    fn option_keyboard_uses_filtered_options_with_catalog_indexes() {
        let record = SelectionRecord::default().with_field(SelectionField::Gender, "female");
        let markup = option_keyboard(&catalogs(), &record, SelectionField::Clothing);
        assert_eq!(
            callback_data(&markup),
            vec!["sel_pick:clothing|0", "sel_pick:clothing|2", "sel_menu:"]
        );
        for data in callback_data(&markup) {
            assert!(data.len() <= 64, "callback data too long: {data}");
        }
    }

    #[test]
    fn current_label_prefers_catalog_label() {
        let catalogs = catalogs();
        let record = SelectionRecord::default().with_field(SelectionField::Gender, "male");
        assert_eq!(current_label(&catalogs, &record, SelectionField::Gender), "Male");
        assert_eq!(current_label(&catalogs, &record, SelectionField::Lighting), "—");
    }

    #[test]
    fn long_button_labels_are_shortened() {
        let label = button_label(&"a".repeat(BUTTON_LABEL_LIMIT + 10));
        assert_eq!(label.chars().count(), BUTTON_LABEL_LIMIT + 1);
        assert!(label.ends_with('…'));
    }
}
