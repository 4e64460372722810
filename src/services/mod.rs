pub mod block_service;
pub mod conversation_service;
pub mod delivery_service;
pub mod message_service;
pub mod presence_service;
pub mod unread_service;
