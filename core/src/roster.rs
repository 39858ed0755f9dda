/// Conversation roster: the user's active conversations with summary metadata
///
/// Refreshed wholesale on each fetch; the only local patch is the optimistic
/// unread badge suppression applied when a conversation is selected.
use crate::types::{Conversation, ConversationKey};

/// What happened to the selection after a roster replace
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChange {
    /// Selection key unchanged; entry re-pointed at the refreshed data
    Kept,
    /// Previous selection vanished (or none existed); a new conversation
    /// should be opened by the caller
    Switched(Conversation),
    /// Roster is empty, nothing to select
    Cleared,
}

#[derive(Default)]
pub struct RosterState {
    conversations: Vec<Conversation>,
    selected: Option<ConversationKey>,
}

impl RosterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full replace with selection continuity: if the previously selected
    /// `(listing_id, other_user_id)` still exists it stays selected (picking
    /// up refreshed unread counts); otherwise fall back to the first entry.
    pub fn replace(&mut self, conversations: Vec<Conversation>) -> SelectionChange {
        self.conversations = conversations;

        if let Some(key) = self.selected {
            if self.conversations.iter().any(|c| c.key() == key) {
                self.suppress_unread(key);
                return SelectionChange::Kept;
            }
        }

        match self.conversations.first().cloned() {
            Some(first) => SelectionChange::Switched(first),
            None => {
                self.selected = None;
                SelectionChange::Cleared
            }
        }
    }

    /// Mark a conversation as selected and suppress its unread badge until
    /// the next roster fetch.
    pub fn select(&mut self, key: ConversationKey) {
        self.selected = Some(key);
        self.suppress_unread(key);
    }

    fn suppress_unread(&mut self, key: ConversationKey) {
        if let Some(entry) = self.conversations.iter_mut().find(|c| c.key() == key) {
            entry.unread_count = 0;
        }
    }

    pub fn selected(&self) -> Option<&Conversation> {
        let key = self.selected?;
        self.conversations.iter().find(|c| c.key() == key)
    }

    pub fn selected_key(&self) -> Option<ConversationKey> {
        self.selected
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
