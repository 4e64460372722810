pub mod block;
pub mod conversation;
pub mod message;
pub mod presence;

pub use block::{BlockRecord, BlockStatus};
pub use conversation::{Conversation, ConversationSummary};
pub use message::{Message, MessageContent};
pub use presence::PresenceRecord;
