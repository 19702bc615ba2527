use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

mod catalog;
mod compare;
mod config;
mod handlers;
mod llm;
mod prompt;
mod selection;
mod settings;
mod state;
mod utils;

use catalog::spawn_catalog_load;
use config::CONFIG;
use handlers::commands::{self, COMPARE_CALLBACK_PREFIX};
use handlers::media::message_has_image;
use handlers::selection::{self as selection_handlers, SELECTION_CALLBACK_PREFIX};
use state::AppState;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Help,
    Options,
    Intensity(String),
    Custom(String),
    Refine(String),
    Prompt,
    Enhance,
    Compare(String),
    Settings,
    Restore(String),
    Reset,
    Status,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging();

    if CONFIG.bot_token.is_empty() {
        error!("BOT_TOKEN is required");
        return Err("BOT_TOKEN is required".into());
    }

    let bot = Bot::new(CONFIG.bot_token.clone());
    info!("Starting portrait enhancer bot");

    let state = AppState::new();
    spawn_catalog_load(state.clone(), &CONFIG.catalogs_path);
    handlers::access::load_whitelist();

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::filter(|msg: Message| message_has_image(&msg)).endpoint(handle_photo))
        .endpoint(ignore_message);

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback_query);

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn optional_arg(arg: String) -> Option<String> {
    if arg.trim().is_empty() {
        None
    } else {
        Some(arg)
    }
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    match command {
        Command::Start => commands::start_handler(bot, message).await?,
        Command::Help => commands::help_handler(bot, message).await?,
        Command::Options => {
            tokio::spawn(async move {
                if let Err(err) = selection_handlers::options_handler(bot, state, message).await {
                    error!("options handler failed: {err}");
                }
            });
        }
        Command::Intensity(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::intensity_handler(bot, state, message, arg).await {
                    error!("intensity handler failed: {err}");
                }
            });
        }
        Command::Custom(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::custom_handler(bot, state, message, arg).await {
                    error!("custom handler failed: {err}");
                }
            });
        }
        Command::Refine(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::refine_handler(bot, state, message, arg).await {
                    error!("refine handler failed: {err}");
                }
            });
        }
        Command::Prompt => {
            tokio::spawn(async move {
                if let Err(err) = commands::prompt_handler(bot, state, message).await {
                    error!("prompt handler failed: {err}");
                }
            });
        }
        Command::Enhance => {
            tokio::spawn(async move {
                if let Err(err) = commands::enhance_handler(bot, state, message).await {
                    error!("enhance handler failed: {err}");
                }
            });
        }
        Command::Compare(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::compare_handler(bot, state, message, arg).await {
                    error!("compare handler failed: {err}");
                }
            });
        }
        Command::Settings => {
            tokio::spawn(async move {
                if let Err(err) = commands::settings_handler(bot, state, message).await {
                    error!("settings handler failed: {err}");
                }
            });
        }
        Command::Restore(arg) => {
            let arg = optional_arg(arg);
            tokio::spawn(async move {
                if let Err(err) = commands::restore_handler(bot, state, message, arg).await {
                    error!("restore handler failed: {err}");
                }
            });
        }
        Command::Reset => commands::reset_handler(bot, state, message).await?,
        Command::Status => {
            tokio::spawn(async move {
                if let Err(err) = commands::status_handler(bot, state, message).await {
                    error!("status handler failed: {err}");
                }
            });
        }
    }
    Ok(())
}

async fn handle_photo(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    tokio::spawn(async move {
        if let Err(err) = commands::photo_handler(bot, state, message).await {
            error!("photo handler failed: {err}");
        }
    });
    Ok(())
}

async fn handle_callback_query(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };
    if data.starts_with(SELECTION_CALLBACK_PREFIX) {
        tokio::spawn(async move {
            if let Err(err) = selection_handlers::selection_callback(bot, state, query).await {
                error!("selection callback failed: {err}");
            }
        });
        return Ok(());
    }
    if data.starts_with(COMPARE_CALLBACK_PREFIX) {
        tokio::spawn(async move {
            if let Err(err) = commands::compare_callback(bot, state, query).await {
                error!("compare callback failed: {err}");
            }
        });
    }
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_optional_arguments() {
        assert!(matches!(
            Command::parse("/options", "enhancer_bot"),
            Ok(Command::Options)
        ));
        match Command::parse("/intensity 60", "enhancer_bot") {
            Ok(Command::Intensity(arg)) => assert_eq!(optional_arg(arg).as_deref(), Some("60")),
            _ => panic!("intensity should parse"),
        }
        match Command::parse("/compare", "enhancer_bot") {
            Ok(Command::Compare(arg)) => assert_eq!(optional_arg(arg), None),
            _ => panic!("compare should parse"),
        }
    }

    #[test]
    fn callback_prefixes_do_not_overlap() {
        assert!(!SELECTION_CALLBACK_PREFIX.starts_with(COMPARE_CALLBACK_PREFIX));
        assert!(!COMPARE_CALLBACK_PREFIX.starts_with(SELECTION_CALLBACK_PREFIX));
    }
}
