use anyhow::{anyhow, Result};
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::debug;

use crate::config::CONFIG;
use crate::llm::media::{download_media, ImagePayload};

const IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".webp", ".heic"];

pub async fn get_file_url(bot: &Bot, file_id: &FileId) -> Result<String> {
    let file = bot.get_file(file_id.clone()).await?;
    Ok(format!(
        "https://api.telegram.org/file/bot{}/{}",
        CONFIG.bot_token, file.path
    ))
}

fn name_looks_like_image(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|extension| lower.ends_with(extension))
}

/// File id and declared MIME type of the image carried by `message`, if any.
/// Photos use their largest size; documents count when their MIME type or
/// file name says image.
fn image_file_of(message: &Message) -> Option<(FileId, Option<String>)> {
    if let Some(photo) = message.photo().and_then(|sizes| sizes.last()) {
        return Some((photo.file.id.clone(), Some("image/jpeg".to_string())));
    }

    let document = message.document()?;
    let mime = document
        .mime_type
        .as_ref()
        .map(|mime| mime.essence_str().to_string());
    let mime_is_image = mime
        .as_deref()
        .map(|mime| mime.starts_with("image/"))
        .unwrap_or(false);
    let name_is_image = document
        .file_name
        .as_deref()
        .map(name_looks_like_image)
        .unwrap_or(false);
    if mime_is_image || name_is_image {
        Some((document.file.id.clone(), mime))
    } else {
        None
    }
}

pub fn message_has_image(message: &Message) -> bool {
    image_file_of(message).is_some()
}

/// Downloads the image attached to `message`, or to the message it replies
/// to. `Ok(None)` means neither carries an image.
pub async fn fetch_message_image(bot: &Bot, message: &Message) -> Result<Option<ImagePayload>> {
    let found = image_file_of(message)
        .or_else(|| message.reply_to_message().and_then(image_file_of));
    let Some((file_id, declared_mime)) = found else {
        return Ok(None);
    };

    let url = get_file_url(bot, &file_id).await?;
    let bytes = download_media(&url).await?;
    debug!("Downloaded source image ({} bytes)", bytes.len());
    ImagePayload::from_bytes(bytes, declared_mime.as_deref())
        .map(Some)
        .ok_or_else(|| anyhow!("That file is not a supported image (PNG, JPEG, WebP or HEIC)."))
}

/// File name of a document in the replied-to message.
pub fn replied_document_name(message: &Message) -> Option<String> {
    message
        .reply_to_message()?
        .document()?
        .file_name
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_names_are_matched_by_extension() {
        assert!(name_looks_like_image("enhanced_abc.PNG"));
        assert!(name_looks_like_image("holiday.jpeg"));
        assert!(!name_looks_like_image("notes.pdf"));
        assert!(!name_looks_like_image("png"));
    }
}
