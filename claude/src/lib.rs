//! Client for the Anthropic Messages API.
//!
//! One request in, one response out; there is no streaming. The public
//! request types serialize straight to the wire format, and tool choice
//! carries the `disable_parallel_tool_use` switch so a caller can ask for at
//! most one tool call per reply.
//!
//! ```rust,ignore
//! use claude::{Claude, Message, Request};
//!
//! let client = Claude::from_env()?;
//! let reply = client.complete(Request::new(vec![Message::user("Hello")])).await?;
//! println!("{}", reply.text());
//! ```

mod client;
mod error;
mod types;

pub use client::{Claude, DEFAULT_MODEL};
pub use error::Error;
pub use types::{
    ContentBlock, Message, Request, Response, Role, StopReason, Tool, ToolChoice, Usage,
};
