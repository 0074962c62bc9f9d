use playerlink_core::{InvokeArgs, InvokeKind};
use playerlink_runtime::{Context, Handler, Message};
use tracing::debug;

use crate::dispatch::DispatchActor;
use crate::listeners::Listeners;

/// Blocking round trip of an HTTP lifecycle hook. The reply carries the
/// listener's verdict and the possibly rewritten args.
pub(crate) struct NativeInvokeMessage {
    pub(crate) kind: InvokeKind,
    pub(crate) args: InvokeArgs,
}

impl Message for NativeInvokeMessage {
    type Reply = (bool, InvokeArgs);
}

impl Handler<NativeInvokeMessage> for DispatchActor {
    fn handle(
        &mut self,
        message: NativeInvokeMessage,
        _ctx: &mut Context,
    ) -> (bool, InvokeArgs) {
        let NativeInvokeMessage { kind, mut args } = message;
        let handled = run_native_invoke(&self.listeners, kind, &mut args);
        (handled, args)
    }
}

pub(crate) fn run_native_invoke(
    listeners: &Listeners,
    kind: InvokeKind,
    args: &mut InvokeArgs,
) -> bool {
    let Some(listener) = listeners.native_invoke.load_full() else {
        debug!(kind = kind.as_str(), "no native invoke listener");
        return false;
    };
    listener.on_native_invoke(kind, args)
}
