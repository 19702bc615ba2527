pub mod gemini;
pub mod media;

pub use gemini::{enhance_image, refine_custom_prompt};
