pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{DATA_DIR_ENV, SessionConfig, default_data_dir};
pub use error::{Result, StoreError};
pub use store::{DATABASE_FILE, SessionSummary, Store};
