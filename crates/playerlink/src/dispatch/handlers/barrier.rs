use playerlink_runtime::{Context, Handler, Message};

use crate::dispatch::DispatchActor;

/// Answered once everything queued ahead of it has run.
pub(crate) struct BarrierMessage;

impl Message for BarrierMessage {
    type Reply = ();
}

impl Handler<BarrierMessage> for DispatchActor {
    fn handle(&mut self, _message: BarrierMessage, _ctx: &mut Context) {}
}
