pub mod config;
pub mod error;
pub mod types;

pub use config::HushConfig;
pub use error::{HushError, HushResult};
pub use types::{ChatMessage, Role, SchemeGeneration};
