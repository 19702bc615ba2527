pub mod filter;
pub mod loader;
pub mod types;

pub use filter::{apply_selection, available_options};
pub use loader::spawn_catalog_load;
pub use types::{CatalogState, Catalogs};
