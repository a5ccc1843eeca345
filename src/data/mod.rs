//! Source table loading.

pub mod loader;
pub mod record;

pub use loader::load_csv;
pub use record::Record;
