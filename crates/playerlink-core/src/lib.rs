#![deny(clippy::wildcard_imports)]

//! Shared vocabulary between the player facades and the worker host.

pub mod command;
pub mod event;
pub mod invoke;
pub mod query;
pub mod state;

pub use command::{Command, CommandKind, DataSource, OptionCategory, OptionValue};
pub use event::{Event, EventKind};
pub use invoke::{InvokeArgs, InvokeKind};
pub use query::{Query, QueryReply};
pub use state::ConnectionState;
