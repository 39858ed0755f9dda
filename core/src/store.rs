/// In-memory message log for the active conversation
///
/// The authoritative, de-duplicated, chronologically ordered sequence that
/// history pages, live pushes, and confirmed sends all merge into. Content is
/// discarded on conversation switch; nothing here is persisted.
use crate::types::ChatMessage;
use std::collections::HashSet;

/// Pagination state for the active conversation
#[derive(Debug, Clone, Copy)]
pub struct PageCursor {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

impl PageCursor {
    pub fn new(page_size: u32) -> Self {
        Self {
            current_page: 1,
            page_size,
            total_pages: 0,
            has_more: false,
        }
    }
}

pub struct ConversationStore {
    /// Invariant: sorted by `(created_at, id)`, no duplicate ids
    messages: Vec<ChatMessage>,
    seen_ids: HashSet<i64>,
    cursor: PageCursor,
}

impl ConversationStore {
    pub fn new(page_size: u32) -> Self {
        Self {
            messages: Vec::new(),
            seen_ids: HashSet::new(),
            cursor: PageCursor::new(page_size),
        }
    }

    /// Clear all messages and cursor state. Called on conversation switch only.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.seen_ids.clear();
        self.cursor = PageCursor::new(self.cursor.page_size);
    }

    /// Set content for page 1. `messages` must already be chronological.
    pub fn load_initial(&mut self, messages: Vec<ChatMessage>, total_pages: u32) {
        self.messages.clear();
        self.seen_ids.clear();
        for msg in messages {
            if self.seen_ids.insert(msg.id) {
                self.messages.push(msg);
            }
        }
        self.messages.sort_by_key(|m| m.ordering_key());
        self.cursor.current_page = 1;
        self.cursor.total_pages = total_pages;
        self.cursor.has_more = total_pages > 1;
    }

    /// Merge an older page (chronological) at the head and advance the cursor.
    pub fn prepend_older(&mut self, messages: Vec<ChatMessage>, total_pages: u32) {
        let mut merged: Vec<ChatMessage> = messages
            .into_iter()
            .filter(|m| self.seen_ids.insert(m.id))
            .collect();
        merged.append(&mut self.messages);
        // Stable sort keeps the batch's relative order within equal keys
        merged.sort_by_key(|m| m.ordering_key());
        self.messages = merged;

        self.cursor.total_pages = total_pages;
        if self.cursor.current_page < total_pages {
            self.cursor.current_page += 1;
        }
        self.cursor.has_more = self.cursor.current_page < total_pages;
    }

    /// Append a pushed message at the tail. First write wins for a given id:
    /// a push echoing an already-confirmed send is ignored.
    pub fn append_live(&mut self, message: ChatMessage) -> bool {
        self.insert_tail(message)
    }

    /// Append a server-confirmed sent message at the tail. Same de-dup rule:
    /// if the push for this id raced ahead of the confirmation, nothing changes.
    pub fn append_sent(&mut self, message: ChatMessage) -> bool {
        self.insert_tail(message)
    }

    fn insert_tail(&mut self, message: ChatMessage) -> bool {
        if !self.seen_ids.insert(message.id) {
            return false;
        }
        // Pushes are causal per connection so this is normally a plain push;
        // the partition point covers a confirmation landing behind a newer push.
        let key = message.ordering_key();
        let pos = self.messages.partition_point(|m| m.ordering_key() <= key);
        if pos == self.messages.len() {
            self.messages.push(message);
        } else {
            self.messages.insert(pos, message);
        }
        true
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more
    }

    pub fn current_page(&self) -> u32 {
        self.cursor.current_page
    }
}
