pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod state;

// Re-export main types for convenience
pub use client::{ChatClient, ChatTransport, DEFAULT_BASE_URL, PROTOCOL_VERSION};
pub use config::Config;
pub use controller::{ChatController, DisplayMode, DraftClearPolicy, Outbound, RequestId, Resolution};
pub use error::{ChatError, FALLBACK_ERROR_TEXT};
pub use state::{ChatMessage, ChatRole, Conversation};
