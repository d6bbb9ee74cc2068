use crate::models::{Conversation, SessionPatch};

/// Recency-ordered list of a user's conversations plus the active selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStore {
    sessions: Vec<Conversation>,
    active: Option<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> &[Conversation] {
        &self.sessions
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.sessions.iter().find(|c| c.id == id)
    }

    /// Replaces the whole list with a freshly fetched one.
    pub fn replace(&mut self, sessions: Vec<Conversation>) {
        self.sessions = sessions;
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Puts a server-created conversation at the top and makes it active.
    pub fn prepend_active(&mut self, conversation: Conversation) {
        self.sessions.retain(|c| c.id != conversation.id);
        self.active = Some(conversation.id.clone());
        self.sessions.insert(0, conversation);
    }

    pub fn set_active(&mut self, id: Option<String>) {
        self.active = id;
    }

    /// Applies `patch` to `id` and moves it to the front.
    /// Returns false when the id is unknown.
    pub fn touch(&mut self, id: &str, patch: &SessionPatch) -> bool {
        let Some(pos) = self.sessions.iter().position(|c| c.id == id) else {
            return false;
        };
        let mut conversation = self.sessions.remove(pos);
        if let Some(title) = &patch.title {
            conversation.title = title.clone();
        }
        if let Some(updated_at) = patch.updated_at {
            conversation.updated_at = Some(updated_at);
        }
        self.sessions.insert(0, conversation);
        true
    }

    /// Sets a title in place; only called after the server accepted it.
    pub fn set_title(&mut self, id: &str, title: &str) -> bool {
        match self.sessions.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.title = title.to_string();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn conv(id: &str) -> Conversation {
        Conversation { id: id.into(), title: id.to_uppercase(), updated_at: None }
    }

    fn store(ids: &[&str]) -> SessionStore {
        let mut store = SessionStore::new();
        store.replace(ids.iter().map(|id| conv(id)).collect());
        store
    }

    fn ids(store: &SessionStore) -> Vec<&str> {
        store.sessions().iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn touch_moves_entry_to_front_and_applies_patch() {
        let mut store = store(&["a", "b", "c"]);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let patch = SessionPatch { title: Some("Renamed".into()), updated_at: Some(at) };

        assert!(store.touch("c", &patch));
        assert_eq!(ids(&store), ["c", "a", "b"]);
        assert_eq!(store.get("c").unwrap().title, "Renamed");
        assert_eq!(store.get("c").unwrap().updated_at, Some(at));
    }

    #[test]
    fn touch_is_idempotent() {
        let patch = SessionPatch {
            title: Some("T".into()),
            updated_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        };
        let mut once = store(&["a", "b", "c"]);
        once.touch("b", &patch);
        let mut twice = once.clone();
        twice.touch("b", &patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn touch_unknown_id_changes_nothing() {
        let mut store = store(&["a", "b"]);
        let before = store.clone();
        assert!(!store.touch("zz", &SessionPatch::default()));
        assert_eq!(store, before);
    }

    #[test]
    fn prepend_marks_new_conversation_active() {
        let mut store = store(&["a"]);
        store.prepend_active(conv("n"));
        assert_eq!(ids(&store), ["n", "a"]);
        assert_eq!(store.active_id(), Some("n"));
        assert_eq!(store.get("n").map(|c| c.title.as_str()), Some("N"));
    }
}
