pub(crate) mod attach_worker;
pub(crate) mod barrier;
pub(crate) mod deliver_command;
pub(crate) mod detach_worker;
pub(crate) mod native_invoke;
pub(crate) mod query;
pub(crate) mod shutdown;
