//! Infrastructure shared by the broker and the worker host.

pub(crate) mod event_hub;
pub mod logging;
pub mod native_init;
