pub mod composer;

pub use composer::compose_prompt;
