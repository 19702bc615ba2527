use once_cell::sync::Lazy;
use regex::Regex;

const FILENAME_PREFIX: &str = "enhanced_";

static SETTINGS_FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^enhanced_([A-Za-z0-9_\-=]+)\.(?:png|jpe?g|webp)$")
        .expect("valid settings filename regex")
});

/// File name for an enhanced image that carries its settings token. The
/// token is rewritten to the URL-safe base64 alphabet so it never contains a
/// path separator.
pub fn settings_filename(token: &str, extension: &str) -> String {
    let safe_token = token.replace('+', "-").replace('/', "_");
    format!("{FILENAME_PREFIX}{safe_token}.{extension}")
}

/// Extracts the token from a name produced by [`settings_filename`].
pub fn token_from_filename(name: &str) -> Option<String> {
    let name = name.trim();
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    SETTINGS_FILENAME_RE
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|token| token.as_str().to_string())
}
