//! Serialized execution contexts shared by the playerlink crates.

pub mod context;

pub use context::{CallError, Closed, Context, ContextBuilder, Handler, Mailbox, Message};
