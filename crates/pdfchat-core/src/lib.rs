pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::PdfChatConfig;
pub use error::{PdfChatError, Result};
pub use events::WidgetEvent;
pub use types::*;
