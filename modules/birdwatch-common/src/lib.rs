pub mod config;
pub mod types;

pub use config::Config;
pub use types::{
    checkpoint_name, Conversation, ConversationEntry, RetrievalBounds, RetrievalStatus, SearchKind,
};
