pub mod content;
mod flow;
mod message;

pub use flow::{ChatFlow, ChatPhase, ChatSettings, SendOutcome};
pub use message::{Chat, ChatMessage, InlineImage};
