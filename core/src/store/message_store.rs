use crate::models::{Message, MessageRole};
use crate::transform::TransformedResponse;

pub const SEND_FAILURE_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Captured target of an in-flight history load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    session_id: String,
}

impl LoadTicket {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Append-only message list for the active session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    session_id: Option<String>,
    messages: Vec<Message>,
    loading: bool,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Switches to `session_id` with an empty list and returns the ticket the
    /// eventual result must present to [`MessageStore::commit_load`].
    pub fn begin_load(&mut self, session_id: &str) -> LoadTicket {
        self.session_id = Some(session_id.to_string());
        self.messages.clear();
        self.loading = true;
        LoadTicket { session_id: session_id.to_string() }
    }

    /// Commits a history result unless the user has moved on to another
    /// session since the load started. Returns whether it was committed.
    ///
    /// Messages appended while the load was in flight are newer than the
    /// history and stay after it.
    pub fn commit_load(&mut self, ticket: &LoadTicket, mut messages: Vec<Message>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        messages.append(&mut self.messages);
        self.messages = messages;
        self.loading = false;
        true
    }

    /// Ends a failed load; stale failures are ignored like stale results.
    pub fn abort_load(&mut self, ticket: &LoadTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.loading = false;
        true
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.session_id.as_deref() == Some(ticket.session_id.as_str())
    }

    /// Binds the store to a freshly created session without loading history.
    pub fn reset(&mut self, session_id: Option<&str>) {
        self.session_id = session_id.map(str::to_string);
        self.messages.clear();
        self.loading = false;
    }

    pub fn append_user_message(&mut self, text: &str) -> &Message {
        self.push(Message::new(MessageRole::User, text))
    }

    pub fn append_assistant_message(&mut self, response: TransformedResponse) -> &Message {
        self.push(response.into_message())
    }

    pub fn append_failure_notice(&mut self) -> &Message {
        self.push(Message::new(MessageRole::Assistant, SEND_FAILURE_TEXT))
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_then_assistant_grows_by_two_in_order() {
        let mut store = MessageStore::new();
        store.reset(Some("s1"));
        store.append_user_message("one");
        let before = store.messages().len();

        store.append_user_message("Hello");
        store.append_assistant_message(TransformedResponse {
            text: "Hi".into(),
            ..Default::default()
        });

        let msgs = store.messages();
        assert_eq!(msgs.len(), before + 2);
        assert_eq!(msgs[before].role, MessageRole::User);
        assert_eq!(msgs[before].text, "Hello");
        assert_eq!(msgs[before + 1].role, MessageRole::Assistant);
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut store = MessageStore::new();
        let ticket_a = store.begin_load("A");
        let ticket_b = store.begin_load("B");

        assert!(store.commit_load(&ticket_b, vec![Message::new(MessageRole::User, "from B")]));
        assert!(!store.commit_load(&ticket_a, vec![Message::new(MessageRole::User, "from A")]));

        assert_eq!(store.session_id(), Some("B"));
        assert_eq!(store.messages()[0].text, "from B");
        assert!(!store.is_loading());
    }

    #[test]
    fn messages_sent_during_load_follow_the_history() {
        let mut store = MessageStore::new();
        let ticket = store.begin_load("A");
        store.append_user_message("Hello");

        assert!(store.commit_load(&ticket, vec![Message::new(MessageRole::User, "old")]));

        let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["old", "Hello"]);
    }

    #[test]
    fn stale_failure_does_not_clear_loading_flag_of_newer_load() {
        let mut store = MessageStore::new();
        let ticket_a = store.begin_load("A");
        let _ticket_b = store.begin_load("B");

        assert!(!store.abort_load(&ticket_a));
        assert!(store.is_loading());
    }

    #[test]
    fn failure_notice_is_an_assistant_message() {
        let mut store = MessageStore::new();
        let msg = store.append_failure_notice();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.text, SEND_FAILURE_TEXT);
    }
}
