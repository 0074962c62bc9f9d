//! Serialized execution contexts.
//!
//! A context is one named OS thread draining one unbounded mailbox of jobs.
//! Jobs run strictly in enqueue order against state owned by that thread. The
//! broker's dispatcher and its event delivery each run on a context, so
//! command order and event order both come from here.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{debug, error};

pub trait Message: Send + 'static {
    type Reply: Send + 'static;
}

/// State that knows how to run `M` on its context.
pub trait Handler<M: Message>: Send + Sized + 'static {
    fn handle(&mut self, message: M, ctx: &mut Context) -> M::Reply;
}

/// Handed to every handler invocation.
pub struct Context {
    name: Arc<str>,
    stopping: bool,
}

impl Context {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ends the context after the current job. Jobs still queued are dropped,
    /// and pending callers see [`CallError::Stopped`].
    pub fn stop(&mut self) {
        self.stopping = true;
    }
}

type Job<S> = Box<dyn FnOnce(&mut S, &mut Context) + Send>;

type PanicHook = Box<dyn Fn(&str) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("context mailbox closed")]
pub struct Closed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("context mailbox closed")]
    Closed,
    #[error("no reply before the timeout")]
    Timeout,
    #[error("context stopped before replying")]
    Stopped,
}

/// Sending side of a context.
pub struct Mailbox<S> {
    jobs: Sender<Job<S>>,
}

impl<S> Clone for Mailbox<S> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
        }
    }
}

impl<S: Send + 'static> Mailbox<S> {
    /// Queues `message` without waiting for it to run.
    pub fn cast<M>(&self, message: M) -> Result<(), Closed>
    where
        M: Message<Reply = ()>,
        S: Handler<M>,
    {
        let job: Job<S> =
            Box::new(move |state: &mut S, ctx: &mut Context| state.handle(message, ctx));
        self.jobs.send(job).map_err(|_| Closed)
    }

    /// Queues `message` and blocks until its reply or `timeout`.
    ///
    /// From the context's own thread this can only time out.
    pub fn call<M>(&self, message: M, timeout: Duration) -> Result<M::Reply, CallError>
    where
        M: Message,
        S: Handler<M>,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let job: Job<S> = Box::new(move |state: &mut S, ctx: &mut Context| {
            let _ = reply_tx.send(state.handle(message, ctx));
        });
        self.jobs.send(job).map_err(|_| CallError::Closed)?;
        reply_rx.recv_timeout(timeout).map_err(|error| match error {
            RecvTimeoutError::Timeout => CallError::Timeout,
            RecvTimeoutError::Disconnected => CallError::Stopped,
        })
    }
}

/// Names a context and decides what happens when one of its jobs panics.
pub struct ContextBuilder {
    name: String,
    on_panic: Option<PanicHook>,
}

impl ContextBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_panic: None,
        }
    }

    /// Called on the context thread with the panic message. The context has
    /// already stopped taking jobs.
    pub fn on_panic(mut self, hook: impl Fn(&str) + Send + 'static) -> Self {
        self.on_panic = Some(Box::new(hook));
        self
    }

    pub fn spawn<S: Send + 'static>(
        self,
        state: S,
    ) -> std::io::Result<(Mailbox<S>, JoinHandle<()>)> {
        let (jobs, inbox) = crossbeam_channel::unbounded();
        let ctx = Context {
            name: Arc::from(self.name.as_str()),
            stopping: false,
        };
        let on_panic = self.on_panic;
        let join = thread::Builder::new()
            .name(self.name)
            .spawn(move || drain(state, inbox, ctx, on_panic))?;
        Ok((Mailbox { jobs }, join))
    }
}

fn drain<S>(
    mut state: S,
    inbox: Receiver<Job<S>>,
    mut ctx: Context,
    on_panic: Option<PanicHook>,
) {
    while let Ok(job) = inbox.recv() {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job(&mut state, &mut ctx))) {
            let message = panic_message(payload.as_ref());
            error!(context = %ctx.name, %message, "job panicked, context stopped");
            // Queued jobs go away with the inbox, failing their callers.
            drop(inbox);
            if let Some(hook) = &on_panic {
                hook(&message);
            }
            return;
        }
        if ctx.stopping {
            debug!(context = %ctx.name, "context stopped");
            return;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
