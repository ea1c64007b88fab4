pub mod client;
pub mod config;
pub mod error;
pub mod state;
pub mod widget;

// Re-export main types for convenience
pub use client::{ChatClient, ChatReply};
pub use config::Config;
pub use error::{ChatError, ChatResult};
pub use state::{InputState, Message, Role};
pub use widget::{ChatWidget, InputField, MessageList, CONNECT_FAILURE};
