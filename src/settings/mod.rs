pub mod filename;
pub mod token;

pub use filename::{settings_filename, token_from_filename};
pub use token::{decode_settings, encode_settings};
