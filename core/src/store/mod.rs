pub mod message_store;
pub mod session_store;

pub use message_store::{LoadTicket, MessageStore, SEND_FAILURE_TEXT};
pub use session_store::SessionStore;
