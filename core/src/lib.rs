/// MarketLink Chat Core
///
/// The real-time chat synchronization core of a marketplace frontend:
/// paginated history merged with a live push channel, scroll preservation
/// across backfill, and id-based reconciliation of confirmed sends with
/// pushed echoes. Listings, payments, and auth live behind the backend API.

pub mod api;
pub mod channel;
pub mod config;
pub mod error;
pub mod roster;
pub mod session;
pub mod store;
pub mod types;
pub mod viewport;

pub use config::ChatConfig;
pub use error::{ChatError, Result};
pub use session::{ChatSession, SessionEvent, ViewPhase};
pub use types::{ChatMessage, Conversation, ConversationKey, PushEvent};
