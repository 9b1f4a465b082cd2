pub mod config;
pub mod debounce;
pub mod error;

pub use config::FeedConfig;
pub use debounce::Debouncer;
pub use error::{AppError, Result};
