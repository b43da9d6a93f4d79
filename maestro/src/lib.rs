//! # Maestro
//!
//! A conversational companion that keeps long-term memory about a user in
//! three categories: a free-form profile, a to-do list, and the user's
//! preferences for how that list should be maintained ("instructions").
//!
//! ## Core Concepts
//!
//! - **Coordinator**: renders the current memory into a system prompt and asks
//!   the model whether (and which) memory needs updating
//! - **Router**: maps the coordinator's reply to the next step
//! - **Updaters**: reconcile the conversation against stored records and write
//!   inserts or patches to the [`store::MemoryStore`]
//! - **TaskMaestro**: the explicit four-state loop tying them together
//!
//! ## Example
//!
//! ```rust,ignore
//! use maestro::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MaestroConfig::from_env()?;
//!     let generator = Arc::new(AnthropicGenerator::from_config(&config)?);
//!     let store = Arc::new(InMemoryStore::new());
//!     let maestro = TaskMaestro::new(generator, store).with_max_steps(config.max_steps);
//!
//!     let mut state = ConversationState::new();
//!     state.push(Message::user("Remind me to buy milk"));
//!     maestro.run_turn(&mut state, &Turn::new(&config.user_id)).await?;
//!     println!("{}", state.last().map(|m| m.text_content()).unwrap_or_default());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod id;
pub mod llm;
pub mod logging;
pub mod message;
pub mod prompts;
pub mod records;
pub mod router;
pub mod store;
pub mod testing;
pub mod tool;
pub mod updater;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::{Step, TaskMaestro, TurnReport};
    pub use crate::config::MaestroConfig;
    pub use crate::coordinator::{Coordinator, MemorySnapshot};
    pub use crate::error::*;
    pub use crate::extract::{EditKind, Extraction, Extractor, PlannedEdit, ResponseMetadata};
    pub use crate::id::{KeyGenerator, RecordKey, SequentialKeys, UuidKeys};
    pub use crate::llm::{AnthropicGenerator, GenerationRequest, GenerationService, Turn};
    pub use crate::message::{ContentBlock, ConversationState, Message, Role, ToolCall};
    pub use crate::records::{MemoryCategory, Profile, Todo, TodoStatus};
    pub use crate::router::{route, Route, UpdateType};
    pub use crate::store::{InMemoryStore, Item, MemoryStore, Namespace};
    pub use crate::updater::{Change, UpdateReport};
    pub use std::sync::Arc;
}
