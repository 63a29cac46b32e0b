pub mod config;
pub mod types;

pub use config::AppConfig;
pub use types::*;
