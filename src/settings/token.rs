//! Versioned settings token.
//!
//! Layout before base64: `v3|~|preset|~|customPrompt|~|...` with every field
//! value percent-encoded so the separator can never appear inside a value.

use base64::{engine::general_purpose, Engine as _};
use tracing::debug;
use url::form_urlencoded;

use crate::catalog::Catalogs;
use crate::selection::{SelectionField, SelectionRecord};

pub const SETTINGS_VERSION: &str = "v3";
pub const FIELD_SEPARATOR: &str = "|~|";
pub const SCHEMA_ARITY: usize = SelectionField::ALL.len() + 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsTokenError {
    #[error("settings token is not valid base64 text")]
    MalformedEncoding,
    #[error("settings token has {found} fields, expected {expected}")]
    WrongArity { expected: usize, found: usize },
    #[error("settings token version '{found}' is not supported (expected '{expected}')")]
    VersionMismatch {
        expected: &'static str,
        found: String,
    },
}

fn percent_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Decodes one field as a single form value. A raw `&` is escaped first so
/// the whole field stays one pair, and the `v=` key keeps any raw `=`.
fn percent_decode(raw: &str) -> String {
    let single_pair = format!("v={}", raw.replace('&', "%26"));
    form_urlencoded::parse(single_pair.as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

fn decode_base64(token: &str) -> Option<Vec<u8>> {
    let engines = [
        &general_purpose::STANDARD,
        &general_purpose::URL_SAFE,
        &general_purpose::STANDARD_NO_PAD,
        &general_purpose::URL_SAFE_NO_PAD,
    ];
    engines
        .into_iter()
        .find_map(|engine| engine.decode(token).ok())
}

pub fn encode_settings(record: &SelectionRecord) -> String {
    let mut parts = Vec::with_capacity(SCHEMA_ARITY);
    parts.push(SETTINGS_VERSION.to_string());
    for field in SelectionField::ALL {
        parts.push(percent_encode(&record.value(field)));
    }
    general_purpose::STANDARD.encode(parts.join(FIELD_SEPARATOR))
}

/// Decodes a token into a complete record.
///
/// Encoding, arity and version problems reject the whole token. Catalogued
/// values that are not in their catalog fall back to the catalog default
/// instead.
pub fn decode_settings(
    token: &str,
    catalogs: &Catalogs,
) -> Result<SelectionRecord, SettingsTokenError> {
    let bytes = decode_base64(token.trim()).ok_or(SettingsTokenError::MalformedEncoding)?;
    let text = String::from_utf8(bytes).map_err(|_| SettingsTokenError::MalformedEncoding)?;
    let parts = text.split(FIELD_SEPARATOR).collect::<Vec<_>>();

    if parts[0] != SETTINGS_VERSION {
        return Err(SettingsTokenError::VersionMismatch {
            expected: SETTINGS_VERSION,
            found: parts[0].chars().take(16).collect(),
        });
    }
    if parts.len() != SCHEMA_ARITY {
        return Err(SettingsTokenError::WrongArity {
            expected: SCHEMA_ARITY,
            found: parts.len(),
        });
    }

    let mut record = SelectionRecord::default();
    for (field, raw) in SelectionField::ALL.into_iter().zip(parts.iter().skip(1)) {
        let decoded = percent_decode(raw);
        let value = if field.is_catalogued() && !catalogs.contains(field, &decoded) {
            debug!(
                "Settings token value for {} not in catalog; using default",
                field.key()
            );
            catalogs.default_value(field).to_string()
        } else {
            decoded
        };
        record = record.with_field(field, &value);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::loader::parse_catalogs;

    fn catalogs() -> Catalogs {
        parse_catalogs(include_str!("../../data/catalogs.yaml")).expect("shipped catalogs parse")
    }

    fn raw_token(parts: &[&str]) -> String {
        general_purpose::STANDARD.encode(parts.join(FIELD_SEPARATOR))
    }

    fn default_parts() -> Vec<String> {
        let mut parts = vec![SETTINGS_VERSION.to_string()];
        for field in SelectionField::ALL {
            parts.push(percent_encode(&SelectionRecord::default().value(field)));
        }
        parts
    }

    #[test]
    fn round_trips_a_catalogued_record() {
        let catalogs = catalogs();
        let record = SelectionRecord::from_catalog_defaults(&catalogs)
            .with_field(SelectionField::PhotoSubject, "group")
            .with_field(SelectionField::Gender, "female")
            .with_field(SelectionField::Lighting, "soft golden-hour sunlight")
            .with_field(SelectionField::Background, "a bustling Tokyo street at night")
            .with_field(
                SelectionField::CustomPrompt,
                "keep the \"|~|\" sign & 100% of the grain = ok",
            )
            .with_intensity(33);

        let token = encode_settings(&record);
        let decoded = decode_settings(&token, &catalogs).expect("token decodes");
        assert_eq!(decoded, record);
        assert_eq!(encode_settings(&decoded), token);
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut parts = default_parts();
        parts.pop();
        let refs = parts.iter().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(
            decode_settings(&raw_token(&refs), &catalogs()),
            Err(SettingsTokenError::WrongArity {
                expected: SCHEMA_ARITY,
                found: SCHEMA_ARITY - 1
            })
        );
    }

    #[test]
    fn rejects_unknown_version() {
        let mut parts = default_parts();
        parts[0] = "v2".to_string();
        let refs = parts.iter().map(String::as_str).collect::<Vec<_>>();
        assert!(matches!(
            decode_settings(&raw_token(&refs), &catalogs()),
            Err(SettingsTokenError::VersionMismatch { found, .. }) if found == "v2"
        ));
    }

    #[test]
    fn rejects_garbage() {
        let catalogs = catalogs();
        assert_eq!(
            decode_settings("***not base64***", &catalogs),
            Err(SettingsTokenError::MalformedEncoding)
        );
        let not_utf8 = general_purpose::STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert_eq!(
            decode_settings(&not_utf8, &catalogs),
            Err(SettingsTokenError::MalformedEncoding)
        );
        assert!(decode_settings("", &catalogs).is_err());
    }

    #[test]
    fn unknown_catalog_values_fall_back_to_defaults() {
        let mut parts = default_parts();
        parts[1 + 3] = "crowd".to_string();
        parts[1 + 14] = percent_encode("laser light show");
        let refs = parts.iter().map(String::as_str).collect::<Vec<_>>();
        let record = decode_settings(&raw_token(&refs), &catalogs()).expect("decodes");
        assert_eq!(record.photo_subject, "single");
        assert_eq!(record.lighting, "");
    }

    #[test]
    fn intensity_is_clamped_on_decode() {
        let catalogs = catalogs();
        for (raw, expected) in [("-5", 0), ("150", 100), ("lots", 75)] {
            let mut parts = default_parts();
            parts[1 + 2] = raw.to_string();
            let refs = parts.iter().map(String::as_str).collect::<Vec<_>>();
            let record = decode_settings(&raw_token(&refs), &catalogs).expect("decodes");
            assert_eq!(record.enhancement_intensity, expected, "input {raw}");
        }
    }

    #[test]
    fn handcrafted_fields_keep_raw_separator_characters() {
        assert_eq!(percent_decode("x="), "x=");
        assert_eq!(percent_decode("a=b&c"), "a=b&c");
        assert_eq!(percent_decode("warm+tones%21"), "warm tones!");
        assert_eq!(percent_decode(""), "");

        let mut parts = default_parts();
        parts[1 + 1] = "x=".to_string();
        let refs = parts.iter().map(String::as_str).collect::<Vec<_>>();
        let record = decode_settings(&raw_token(&refs), &catalogs()).expect("decodes");
        assert_eq!(record.custom_prompt, "x=");
    }

    #[test]
    fn accepts_url_safe_alphabet_and_whitespace() {
        let catalogs = catalogs();
        let record = SelectionRecord::default()
            .with_field(SelectionField::CustomPrompt, "???>>>~~~ subtle glow");
        let token = encode_settings(&record);
        let url_safe = token.replace('+', "-").replace('/', "_");
        let decoded = decode_settings(&format!("  {url_safe}\n"), &catalogs).expect("decodes");
        assert_eq!(decoded.custom_prompt, "???>>>~~~ subtle glow");
    }
}
