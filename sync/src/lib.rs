//! Client-side synchronization core for post comment threads and reactions.
//!
//! - [`ThreadStore`] keeps one post's comment tree in sync with the backend.
//! - [`ReactionEngine`] gives a post or comment an optimistic like toggle
//!   backed by a durable [`ReactionCache`].
//!
//! Both talk to the backend only through the [`CommentRepository`] and
//! [`ReactionRepository`] traits, and never return errors: every operation
//! resolves to an [`Outcome`] and leaves state consistent.

pub mod cache;
pub mod config;
pub mod error;
pub mod outcome;
pub mod pagination;
pub mod reaction;
pub mod repository;
pub mod thread;

pub use cache::{KeyValueStore, MemoryStore, ReactionCache};
pub use config::{ReactionConfig, ThreadConfig};
pub use error::{Error, Result};
pub use outcome::{Outcome, Skip};
pub use pagination::{PageState, Scope};
pub use reaction::{ReactionEngine, ReactionPhase, ReactionRegistry, SettleCallback};
pub use repository::{CommentQuery, CommentRepository, ReactionRepository};
pub use thread::{CommentNode, EditStaging, ThreadSnapshot, ThreadStore};
