pub mod field;
pub mod record;

pub use field::SelectionField;
pub use record::{SelectionRecord, SubjectMode};
