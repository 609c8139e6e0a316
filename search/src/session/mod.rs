//! Session management for the search daemon
//!
//! A session keeps a grounded conversation alive across requests so that
//! follow-up questions continue it instead of starting over. Stores are
//! injected through the `SessionStore` trait; the in-memory adapter bounds
//! the number of live sessions and expires idle ones.

pub mod adapters;
pub mod store;

pub use adapters::InMemorySessionStore;
pub use store::{
    new_session_id, ConversationTurn, Session, SessionHandle, SessionStore, SessionStoreError,
    SessionStoreRef,
};
